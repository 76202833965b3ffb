//! Single pass streamline clustering.
//!
//! Streamlines are visited in order; each one joins the cluster whose centroid is the closest
//! in MDF distance when that distance is within the threshold, or starts a new cluster otherwise.
//! Centroids are running means of their (orientation aligned) resampled members.

use std::cmp::Ordering;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{RecoError, Result},
    geometry::{oriented_mdf, resample, update_centroid},
    streamline::Streamline,
};

/// Below this many clusters the nearest centroid is searched sequentially.
const PARALLEL_MIN_CLUSTERS: usize = 256;

/// A group of streamlines sharing a shape, represented by their mean resampled streamline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    centroid: Streamline,
    indices: Vec<usize>,
}

impl Cluster {
    /// Builds a new cluster.
    pub fn new(centroid: Streamline, indices: Vec<usize>) -> Self {
        Self { centroid, indices }
    }

    pub fn centroid(&self) -> &Streamline {
        &self.centroid
    }

    /// Indices of the member streamlines in the clustered collection.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn size(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Adds a resampled member, already aligned with the centroid.
    fn assign(&mut self, index: usize, aligned: &Streamline) {
        self.indices.push(index);
        update_centroid(&mut self.centroid, aligned, self.indices.len());
    }
}

/// The clusters computed for one collection of streamlines at one threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterMap {
    threshold: f64,
    nb_points: usize,
    clusters: Vec<Cluster>,
}

impl ClusterMap {
    /// Builds an empty cluster map.
    pub fn new(threshold: f64, nb_points: usize) -> Self {
        Self {
            threshold,
            nb_points,
            clusters: vec![],
        }
    }

    /// Builds a cluster map from existing clusters.
    pub fn from_clusters(threshold: f64, nb_points: usize, clusters: Vec<Cluster>) -> Self {
        Self {
            threshold,
            nb_points,
            clusters,
        }
    }

    /// Clustering threshold the map was computed with.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of points of every centroid.
    pub fn nb_points(&self) -> usize {
        self.nb_points
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn centroids(&self) -> impl Iterator<Item = &Streamline> {
        self.clusters.iter().map(|c| c.centroid())
    }

    /// Total number of clustered streamlines.
    pub fn nb_streamlines(&self) -> usize {
        self.clusters.iter().map(|c| c.size()).sum()
    }

    /// Checks that the map can be compared against resampled streamlines:
    /// a valid threshold, and every centroid made of `nb_points` finite points.
    pub fn validate(&self) -> Result<()> {
        check_threshold("clustering", self.threshold)
            .map_err(|e| RecoError::InvalidClusterMap(e.to_string()))?;
        if self.nb_points < 2 {
            return Err(RecoError::InvalidClusterMap(format!(
                "{} points per centroid",
                self.nb_points
            )));
        }
        for (i, cluster) in self.clusters.iter().enumerate() {
            let centroid = cluster.centroid();
            if centroid.len() != self.nb_points {
                return Err(RecoError::InvalidClusterMap(format!(
                    "centroid {} has {} points, expected {}",
                    i,
                    centroid.len(),
                    self.nb_points
                )));
            }
            if centroid.points().iter().flatten().any(|x| !x.is_finite()) {
                return Err(RecoError::InvalidClusterMap(format!(
                    "centroid {} has non finite coordinates",
                    i
                )));
            }
        }
        Ok(())
    }
}

/// The nearest centroid of a streamline.
#[derive(PartialEq, Debug, Clone, Copy)]
struct Nearest {
    cluster: usize,
    dist: f64,
    flipped: bool,
}

impl Nearest {
    /// Orders by distance, the lowest cluster index winning ties.
    fn order(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.cluster.cmp(&other.cluster))
    }
}

/// Greedy single pass clustering of streamlines by MDF distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuickBundles {
    threshold: f64,
    nb_points: usize,
}

impl QuickBundles {
    /// Builds a new clustering engine.
    /// The threshold must be finite and non negative, and at least two points are needed.
    pub fn new(threshold: f64, nb_points: usize) -> Result<Self> {
        check_threshold("clustering", threshold)?;
        if nb_points < 2 {
            return Err(RecoError::InvalidResolution { nb_points });
        }
        Ok(Self {
            threshold,
            nb_points,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn nb_points(&self) -> usize {
        self.nb_points
    }

    /// Clusters streamlines in order.
    /// Fails on the first degenerate streamline, without returning any partial map.
    pub fn cluster(&self, streamlines: &[Streamline]) -> Result<ClusterMap> {
        let mut map = ClusterMap::new(self.threshold, self.nb_points);
        for (index, streamline) in streamlines.iter().enumerate() {
            let resampled = resample(streamline, self.nb_points)?;
            self.update(&mut map, index, resampled);
        }
        debug!(
            "{} streamlines clustered into {} clusters at {}mm",
            streamlines.len(),
            map.len(),
            self.threshold
        );
        Ok(map)
    }

    /// Assigns one resampled streamline to the map.
    fn update(&self, map: &mut ClusterMap, index: usize, resampled: Streamline) {
        match nearest_centroid(&map.clusters, &resampled) {
            Some(nearest) if nearest.dist <= self.threshold => {
                let aligned = if nearest.flipped {
                    resampled.reversed()
                } else {
                    resampled
                };
                map.clusters[nearest.cluster].assign(index, &aligned);
            }
            _ => map.clusters.push(Cluster::new(resampled, vec![index])),
        }
    }
}

/// Finds the centroid closest to a resampled streamline.
/// Distances are computed in parallel for large maps, the result does not depend on it.
fn nearest_centroid(clusters: &[Cluster], resampled: &Streamline) -> Option<Nearest> {
    let measure = |(cluster, c): (usize, &Cluster)| {
        let (dist, flipped) = oriented_mdf(c.centroid(), resampled);
        Nearest {
            cluster,
            dist,
            flipped,
        }
    };
    if clusters.len() < PARALLEL_MIN_CLUSTERS {
        clusters
            .iter()
            .enumerate()
            .map(measure)
            .min_by(Nearest::order)
    } else {
        clusters
            .par_iter()
            .enumerate()
            .map(measure)
            .min_by(Nearest::order)
    }
}

/// Thresholds must be finite and non negative.
pub(crate) fn check_threshold(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0. {
        Ok(())
    } else {
        Err(RecoError::ThresholdConfiguration { name, value })
    }
}
