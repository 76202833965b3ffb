//! Streamlines and tractograms.
//!  - a streamline is an ordered polyline of 3D points in millimeter space
//!  - a tractogram is an ordered collection of streamlines with optional attributes aligned on it

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RecoError, Result};

/// A point in millimeter space.
pub type Point3 = [f64; 3];

/// Values attached to each streamline, keyed by attribute name.
pub type StreamlineData = BTreeMap<String, Vec<Vec<f64>>>;

/// Values attached to each point of each streamline, keyed by attribute name.
pub type PointData = BTreeMap<String, Vec<Vec<Vec<f64>>>>;

/// An ordered sequence of 3D points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Streamline(Vec<Point3>);

impl Streamline {
    /// Builds a new streamline.
    pub fn new(points: Vec<Point3>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point3] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The same polyline walked from its last point to its first.
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }

    /// Arc length, i.e. the sum of segment lengths.
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| point_dist(&w[0], &w[1])).sum()
    }

    pub(crate) fn points_mut(&mut self) -> &mut [Point3] {
        &mut self.0
    }
}

impl From<Vec<Point3>> for Streamline {
    fn from(points: Vec<Point3>) -> Self {
        Self(points)
    }
}

/// Euclidean distance between two points.
pub(crate) fn point_dist(p1: &Point3, p2: &Point3) -> f64 {
    p1.iter()
        .zip(p2)
        .map(|(x1, x2)| {
            let d = x1 - x2;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Streamlines plus per-streamline and per-point attributes.
///
/// Attribute maps always stay aligned with the streamlines: one entry per streamline,
/// and for per-point attributes one entry per point of that streamline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tractogram {
    streamlines: Vec<Streamline>,
    #[serde(default)]
    data_per_streamline: StreamlineData,
    #[serde(default)]
    data_per_point: PointData,
}

impl Tractogram {
    /// Builds a tractogram without attributes.
    pub fn new(streamlines: Vec<Streamline>) -> Self {
        Self {
            streamlines,
            data_per_streamline: BTreeMap::new(),
            data_per_point: BTreeMap::new(),
        }
    }

    /// Attaches a per-streamline attribute.
    pub fn with_data_per_streamline(mut self, name: &str, values: Vec<Vec<f64>>) -> Result<Self> {
        check_len(name, self.streamlines.len(), values.len())?;
        self.data_per_streamline.insert(name.into(), values);
        Ok(self)
    }

    /// Attaches a per-point attribute.
    pub fn with_data_per_point(mut self, name: &str, values: Vec<Vec<Vec<f64>>>) -> Result<Self> {
        check_point_data(name, &self.streamlines, &values)?;
        self.data_per_point.insert(name.into(), values);
        Ok(self)
    }

    pub fn streamlines(&self) -> &[Streamline] {
        &self.streamlines
    }

    pub fn data_per_streamline(&self) -> &StreamlineData {
        &self.data_per_streamline
    }

    pub fn data_per_point(&self) -> &PointData {
        &self.data_per_point
    }

    pub fn len(&self) -> usize {
        self.streamlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streamlines.is_empty()
    }

    /// Checks that every attribute is aligned with the streamlines.
    /// Deserialized tractograms must go through this before use.
    pub fn validate(&self) -> Result<()> {
        for (name, values) in &self.data_per_streamline {
            check_len(name, self.streamlines.len(), values.len())?;
        }
        for (name, values) in &self.data_per_point {
            check_point_data(name, &self.streamlines, values)?;
        }
        Ok(())
    }

    /// Builds the sub-tractogram made of the streamlines at `indices`, in that order,
    /// carrying their attributes along.
    /// Attributes too short for a selected index raise `AttributeLength`.
    pub fn select(&self, indices: &[usize]) -> Result<Tractogram> {
        let len = self.streamlines.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(RecoError::IndexOutOfRange { index, len });
        }
        let streamlines = indices.iter().map(|&i| self.streamlines[i].clone()).collect();
        let data_per_streamline: StreamlineData = self
            .data_per_streamline
            .iter()
            .map(|(name, values)| Ok((name.clone(), pick(name, values, indices, len)?)))
            .collect::<Result<_>>()?;
        let data_per_point: PointData = self
            .data_per_point
            .iter()
            .map(|(name, values)| Ok((name.clone(), pick(name, values, indices, len)?)))
            .collect::<Result<_>>()?;
        Ok(Tractogram {
            streamlines,
            data_per_streamline,
            data_per_point,
        })
    }

    /// Replaces the streamline geometry while keeping attributes.
    /// Per-point attributes are dropped when any point count changes.
    pub(crate) fn with_streamlines(&self, streamlines: Vec<Streamline>) -> Tractogram {
        let same_points = self
            .streamlines
            .iter()
            .zip(&streamlines)
            .all(|(s1, s2)| s1.len() == s2.len());
        Tractogram {
            streamlines,
            data_per_streamline: self.data_per_streamline.clone(),
            data_per_point: if same_points {
                self.data_per_point.clone()
            } else {
                BTreeMap::new()
            },
        }
    }
}

fn pick<T: Clone>(name: &str, values: &[T], indices: &[usize], expected: usize) -> Result<Vec<T>> {
    indices
        .iter()
        .map(|&i| {
            values.get(i).cloned().ok_or_else(|| RecoError::AttributeLength {
                name: name.into(),
                expected,
                found: values.len(),
            })
        })
        .collect()
}

fn check_len(name: &str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(RecoError::AttributeLength {
            name: name.into(),
            expected,
            found,
        })
    }
}

fn check_point_data(name: &str, streamlines: &[Streamline], values: &[Vec<Vec<f64>>]) -> Result<()> {
    check_len(name, streamlines.len(), values.len())?;
    for (s, v) in streamlines.iter().zip(values) {
        check_len(name, s.len(), v.len())?;
    }
    Ok(())
}
