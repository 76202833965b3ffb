//! File collaborators of the recognition: tractograms, affines and cluster map caches.

use std::{fs, path::Path};

use log::debug;

use crate::{
    cache,
    clustering::ClusterMap,
    error::{RecoError, Result},
    streamline::Tractogram,
    transform::AffineTransform,
};

/// Checks that a tractogram path has a supported extension.
pub fn check_tractogram_format(path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(()),
        _ => Err(RecoError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Loads and validates a JSON tractogram.
pub fn load_tractogram(path: &Path) -> Result<Tractogram> {
    check_tractogram_format(path)?;
    let tractogram: Tractogram = serde_json::from_slice(&fs::read(path)?)?;
    tractogram.validate()?;
    debug!("{} streamlines loaded from {}", tractogram.len(), path.display());
    Ok(tractogram)
}

/// Saves a tractogram as JSON.
pub fn save_tractogram(tractogram: &Tractogram, path: &Path) -> Result<()> {
    check_tractogram_format(path)?;
    fs::write(path, serde_json::to_vec(tractogram)?)?;
    debug!("{} streamlines saved to {}", tractogram.len(), path.display());
    Ok(())
}

/// Parses a 4x4 matrix written as 4 lines of 4 numbers.
/// Numbers are separated by spaces, tabs or commas; `#` starts a comment.
pub fn parse_affine(text: &str) -> Result<AffineTransform> {
    let mut rows = [[0.; 4]; 4];
    let mut nb_rows = 0;
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if nb_rows == 4 {
            return Err(RecoError::AffineFormat("more than 4 rows".into()));
        }
        let values = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| RecoError::AffineFormat(format!("not a number: '{}'", v)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != 4 {
            return Err(RecoError::AffineFormat(format!(
                "row {} has {} values",
                nb_rows + 1,
                values.len()
            )));
        }
        rows[nb_rows].copy_from_slice(&values);
        nb_rows += 1;
    }
    if nb_rows != 4 {
        return Err(RecoError::AffineFormat(format!("{} rows, expected 4", nb_rows)));
    }
    Ok(AffineTransform::from_rows(rows))
}

/// Loads a text encoded 4x4 affine.
pub fn load_affine(path: &Path) -> Result<AffineTransform> {
    parse_affine(&fs::read_to_string(path)?)
}

pub fn read_cluster_map(path: &Path) -> Result<ClusterMap> {
    let map = cache::load(&fs::read(path)?)?;
    debug!("{} clusters read from {}", map.len(), path.display());
    Ok(map)
}

pub fn write_cluster_map(path: &Path, cluster_map: &ClusterMap) -> Result<()> {
    fs::write(path, cache::save(cluster_map)?)?;
    Ok(())
}
