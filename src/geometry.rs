//! This module defines the geometry needed to compare streamlines by shape:
//!  - arc-length resampling to a fixed number of points
//!  - the minimum direct-flipped (MDF) distance
//!  - the running mean used to move cluster centroids

use crate::{
    error::{RecoError, Result},
    streamline::{point_dist, Point3, Streamline, Tractogram},
};

/// Number of points every compared streamline is resampled to.
pub const DEFAULT_NB_POINTS: usize = 12;

/// Resamples a streamline to exactly `nb_points` points, equally spaced along its arc length.
///
/// The first and last points are kept as is; intermediate points are linearly
/// interpolated on the segment holding their arc-length position.
/// Streamlines with fewer than two points, a null length or non finite coordinates are degenerate.
pub fn resample(streamline: &Streamline, nb_points: usize) -> Result<Streamline> {
    if nb_points < 2 {
        return Err(RecoError::InvalidResolution { nb_points });
    }
    let points = streamline.points();
    let cumulated = cumulated_lengths(points);
    let total = cumulated.last().copied().unwrap_or(0.);
    if points.len() < 2 || !(total > 0. && total.is_finite()) {
        return Err(RecoError::DegenerateStreamline {
            nb_points: points.len(),
            length: total,
        });
    }
    let last = points.len() - 1;
    let mut resampled = Vec::with_capacity(nb_points);
    let mut segment = 0;
    for k in 0..nb_points {
        if k == nb_points - 1 {
            resampled.push(points[last]);
            break;
        }
        let target = total * k as f64 / (nb_points - 1) as f64;
        while segment < last - 1 && cumulated[segment + 1] < target {
            segment += 1;
        }
        let span = cumulated[segment + 1] - cumulated[segment];
        let t = if span > 0. {
            ((target - cumulated[segment]) / span).clamp(0., 1.)
        } else {
            0.
        };
        resampled.push(lerp(&points[segment], &points[segment + 1], t));
    }
    Ok(Streamline::new(resampled))
}

/// Resamples every streamline of a tractogram.
/// Per-streamline attributes are kept, per-point attributes cannot follow and are dropped.
pub fn resample_tractogram(tractogram: &Tractogram, nb_points: usize) -> Result<Tractogram> {
    let streamlines = tractogram
        .streamlines()
        .iter()
        .map(|s| resample(s, nb_points))
        .collect::<Result<Vec<_>>>()?;
    Ok(tractogram.with_streamlines(streamlines))
}

fn cumulated_lengths(points: &[Point3]) -> Vec<f64> {
    let mut cumulated = Vec::with_capacity(points.len());
    let mut acc = 0.;
    cumulated.extend(points.first().map(|_| 0.));
    for w in points.windows(2) {
        acc += point_dist(&w[0], &w[1]);
        cumulated.push(acc);
    }
    cumulated
}

fn lerp(p1: &Point3, p2: &Point3, t: f64) -> Point3 {
    [
        p1[0] + (p2[0] - p1[0]) * t,
        p1[1] + (p2[1] - p1[1]) * t,
        p1[2] + (p2[2] - p1[2]) * t,
    ]
}

/// Mean Euclidean distance between corresponding points.
/// Both streamlines are expected to share the same number of points.
pub fn distance(s1: &Streamline, s2: &Streamline) -> f64 {
    debug_assert_eq!(s1.len(), s2.len());
    let sum: f64 = s1
        .points()
        .iter()
        .zip(s2.points())
        .map(|(p1, p2)| point_dist(p1, p2))
        .sum();
    sum / s1.len().max(1) as f64
}

/// Mean Euclidean distance between corresponding points, `s2` being walked backwards.
pub fn distance_flipped(s1: &Streamline, s2: &Streamline) -> f64 {
    debug_assert_eq!(s1.len(), s2.len());
    let sum: f64 = s1
        .points()
        .iter()
        .zip(s2.points().iter().rev())
        .map(|(p1, p2)| point_dist(p1, p2))
        .sum();
    sum / s1.len().max(1) as f64
}

/// Minimum direct-flipped distance: the orientation-invariant shape distance.
pub fn mdf(s1: &Streamline, s2: &Streamline) -> f64 {
    oriented_mdf(s1, s2).0
}

/// MDF distance along with whether `s2` had to be flipped to reach it.
pub(crate) fn oriented_mdf(s1: &Streamline, s2: &Streamline) -> (f64, bool) {
    let direct = distance(s1, s2);
    let flipped = distance_flipped(s1, s2);
    if flipped < direct {
        (flipped, true)
    } else {
        (direct, false)
    }
}

/// Moves a centroid towards a new member: with `count` members including the new one,
/// the centroid becomes the point-wise mean of all of them.
pub(crate) fn update_centroid(centroid: &mut Streamline, member: &Streamline, count: usize) {
    let w = count as f64;
    for (c, p) in centroid.points_mut().iter_mut().zip(member.points()) {
        for (x, y) in c.iter_mut().zip(p) {
            *x += (y - *x) / w;
        }
    }
}
