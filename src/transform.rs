//! Affine transforms applied to streamline bundles.

use nalgebra::{Matrix4, Vector4};

use crate::{
    error::{RecoError, Result},
    streamline::{Point3, Streamline, Tractogram},
};

/// A 4x4 affine in homogeneous coordinates, mapping one reference frame to another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix4<f64>,
}

impl AffineTransform {
    /// Builds a transform from its rows.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        let matrix = Matrix4::from_fn(|i, j| rows[i][j]);
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// A pure translation.
    pub fn translation(offset: Point3) -> Self {
        let mut matrix = Matrix4::identity();
        matrix[(0, 3)] = offset[0];
        matrix[(1, 3)] = offset[1];
        matrix[(2, 3)] = offset[2];
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Result<Self> {
        match self.matrix.try_inverse() {
            Some(matrix) if matrix.iter().all(|x| x.is_finite()) => Ok(Self { matrix }),
            _ => Err(RecoError::SingularMatrix),
        }
    }

    /// Maps one point. The bottom row is ignored, as for any affine.
    pub fn apply_point(&self, point: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(point[0], point[1], point[2], 1.);
        [v[0], v[1], v[2]]
    }

    /// Maps every point of a streamline.
    pub fn apply_streamline(&self, streamline: &Streamline) -> Streamline {
        streamline
            .points()
            .iter()
            .map(|p| self.apply_point(p))
            .collect::<Vec<_>>()
            .into()
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Maps every streamline through the affine, or through its inverse when `invert` is set.
/// The inverse is computed once, before any point is touched.
pub fn apply_streamlines(
    streamlines: &[Streamline],
    affine: &AffineTransform,
    invert: bool,
) -> Result<Vec<Streamline>> {
    let affine = if invert { affine.inverse()? } else { *affine };
    Ok(streamlines
        .iter()
        .map(|s| affine.apply_streamline(s))
        .collect())
}

/// Builds a new tractogram with transformed geometry and the same attributes.
pub fn apply(bundle: &Tractogram, affine: &AffineTransform, invert: bool) -> Result<Tractogram> {
    let streamlines = apply_streamlines(bundle.streamlines(), affine, invert)?;
    Ok(bundle.with_streamlines(streamlines))
}
