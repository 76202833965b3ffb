//! Bundle recognition: selects the whole-brain streamlines that look like a model bundle.
//!
//! Both the whole-brain tractogram and the model are clustered, then every whole-brain cluster
//! whose centroid lies within the pruning threshold of some model centroid is kept.
//! Matching is done on centroids only, so the cost depends on cluster counts, not streamline counts.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPool};

use crate::{
    clustering::{ClusterMap, QuickBundles},
    config::{install, RecoConfig},
    error::Result,
    geometry::mdf,
    streamline::{Streamline, Tractogram},
    transform::{apply_streamlines, AffineTransform},
};

/// Selected whole-brain streamlines.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognitionResult {
    /// Sorted, duplicate free indices into the whole-brain tractogram.
    pub indices: Vec<usize>,
    /// The whole-brain clustering, when it was computed rather than given.
    pub cluster_map: Option<ClusterMap>,
}

/// A recognizer bound to one whole-brain clustering.
pub struct RecoBundles {
    cluster_map: ClusterMap,
    config: RecoConfig,
    pool: Option<ThreadPool>,
}

impl RecoBundles {
    /// Clusters the whole-brain streamlines at the configured threshold.
    pub fn new(wb_streamlines: &[Streamline], config: RecoConfig) -> Result<Self> {
        config.validate()?;
        let qb = QuickBundles::new(config.wb_clustering_threshold, config.nb_points)?;
        let pool = config.thread_pool()?;
        let cluster_map = install(pool.as_ref(), || qb.cluster(wb_streamlines))?;
        info!(
            "whole-brain: {} streamlines, {} clusters",
            wb_streamlines.len(),
            cluster_map.len()
        );
        Ok(Self {
            cluster_map,
            config,
            pool,
        })
    }

    /// Reuses an existing whole-brain clustering; the configured whole-brain threshold is ignored.
    /// Fails with `InvalidClusterMap` when the centroids cannot be compared to resampled models.
    pub fn with_cluster_map(cluster_map: ClusterMap, config: RecoConfig) -> Result<Self> {
        config.validate()?;
        cluster_map.validate()?;
        if cluster_map.nb_points() != config.nb_points {
            warn!(
                "cluster map centroids have {} points, models will be resampled accordingly",
                cluster_map.nb_points()
            );
        }
        debug!(
            "reusing {} clusters computed at {}mm",
            cluster_map.len(),
            cluster_map.threshold()
        );
        Ok(Self {
            cluster_map,
            pool: config.thread_pool()?,
            config,
        })
    }

    pub fn cluster_map(&self) -> &ClusterMap {
        &self.cluster_map
    }

    pub fn into_cluster_map(self) -> ClusterMap {
        self.cluster_map
    }

    pub fn config(&self) -> &RecoConfig {
        &self.config
    }

    /// Recognizes a model bundle already expressed in the whole-brain space.
    /// Returns sorted, duplicate free whole-brain indices.
    pub fn recognize(&self, model_streamlines: &[Streamline]) -> Result<Vec<usize>> {
        if let Some(seed) = self.config.seed {
            debug!("seed {} reserved, recognition is deterministic", seed);
        }
        let qb = QuickBundles::new(
            self.config.model_clustering_threshold,
            self.cluster_map.nb_points(),
        )?;
        install(self.pool.as_ref(), || {
            let model_map = qb.cluster(model_streamlines)?;
            info!(
                "model: {} streamlines, {} clusters",
                model_streamlines.len(),
                model_map.len()
            );
            let matched = matched_clusters(
                &self.cluster_map,
                &model_map,
                self.config.pruning_threshold,
            );
            let indices = union_indices(&self.cluster_map, &matched);
            info!(
                "{} whole-brain clusters matched, {} streamlines selected",
                matched.len(),
                indices.len()
            );
            Ok(indices)
        })
    }
}

/// Whole-brain clusters within `pruning_threshold` of at least one model centroid.
fn matched_clusters(
    wb_map: &ClusterMap,
    model_map: &ClusterMap,
    pruning_threshold: f64,
) -> Vec<usize> {
    let model_centroids: Vec<&Streamline> = model_map.centroids().collect();
    wb_map
        .clusters()
        .par_iter()
        .enumerate()
        .filter(|(_, cluster)| {
            model_centroids
                .iter()
                .any(|m| mdf(m, cluster.centroid()) <= pruning_threshold)
        })
        .map(|(i, _)| i)
        .collect()
}

fn union_indices(wb_map: &ClusterMap, matched: &[usize]) -> Vec<usize> {
    let selected: BTreeSet<usize> = matched
        .iter()
        .flat_map(|&i| wb_map.clusters()[i].indices().iter().copied())
        .collect();
    selected.into_iter().collect()
}

/// Full recognition of a model bundle in a whole-brain tractogram.
///
/// The model is first brought into the whole-brain space through `affine` (or its inverse).
/// When `cached` is given it is used as the whole-brain clustering, otherwise the
/// clustering is computed and returned with the result so that it can be cached.
pub fn recognize(
    wb: &Tractogram,
    model: &Tractogram,
    affine: &AffineTransform,
    invert: bool,
    cached: Option<ClusterMap>,
    config: &RecoConfig,
) -> Result<RecognitionResult> {
    config.validate()?;
    let model_streamlines = apply_streamlines(model.streamlines(), affine, invert)?;
    if wb.is_empty() {
        warn!("empty whole-brain tractogram");
    }
    if model.is_empty() {
        warn!("empty model bundle");
    }
    let computed = cached.is_none();
    let reco = match cached {
        Some(cluster_map) => RecoBundles::with_cluster_map(cluster_map, config.clone())?,
        None => RecoBundles::new(wb.streamlines(), config.clone())?,
    };
    let indices = reco.recognize(&model_streamlines)?;
    Ok(RecognitionResult {
        indices,
        cluster_map: if computed {
            Some(reco.into_cluster_map())
        } else {
            None
        },
    })
}
