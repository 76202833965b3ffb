//! Recognition parameters.

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    clustering::check_threshold,
    error::{RecoError, Result},
    geometry::DEFAULT_NB_POINTS,
};

/// Thresholds are in millimeters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoConfig {
    /// Clustering threshold for the whole-brain tractogram.
    pub wb_clustering_threshold: f64,
    /// Clustering threshold for the model bundle.
    pub model_clustering_threshold: f64,
    /// Maximum centroid distance for a whole-brain cluster to match a model cluster.
    pub pruning_threshold: f64,
    /// Resampling resolution shared by all compared streamlines.
    pub nb_points: usize,
    /// Reserved for stochastic refinement stages; the recognition itself is deterministic.
    pub seed: Option<u64>,
    /// Worker threads for distance computations, the global pool when unset.
    pub threads: Option<usize>,
}

impl Default for RecoConfig {
    fn default() -> Self {
        Self {
            wb_clustering_threshold: 8.,
            model_clustering_threshold: 4.,
            pruning_threshold: 6.,
            nb_points: DEFAULT_NB_POINTS,
            seed: None,
            threads: None,
        }
    }
}

impl RecoConfig {
    /// Checks thresholds and resolution.
    pub fn validate(&self) -> Result<()> {
        check_threshold("whole-brain clustering", self.wb_clustering_threshold)?;
        check_threshold("model clustering", self.model_clustering_threshold)?;
        check_threshold("pruning", self.pruning_threshold)?;
        if self.nb_points < 2 {
            return Err(RecoError::InvalidResolution {
                nb_points: self.nb_points,
            });
        }
        Ok(())
    }

    /// Builds the dedicated pool when a thread count is configured.
    pub(crate) fn thread_pool(&self) -> Result<Option<ThreadPool>> {
        match self.threads {
            Some(threads) => {
                debug!("running on {} threads", threads);
                Ok(Some(ThreadPoolBuilder::new().num_threads(threads).build()?))
            }
            None => Ok(None),
        }
    }
}

/// Runs `op` on `pool`, or on the global pool when there is none.
pub(crate) fn install<R, Op>(pool: Option<&ThreadPool>, op: Op) -> R
where
    Op: FnOnce() -> R + Send,
    R: Send,
{
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::*;

    #[test]
    fn test_defaults() {
        let config = RecoConfig::default();
        assert_eq!(8., config.wb_clustering_threshold);
        assert_eq!(4., config.model_clustering_threshold);
        assert_eq!(6., config.pruning_threshold);
        assert_eq!(12, config.nb_points);
        assert_eq!(None, config.seed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = RecoConfig {
            pruning_threshold: -1.,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RecoError::ThresholdConfiguration { name: "pruning", value }) if value == -1.
        ));
        let config = RecoConfig {
            wb_clustering_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RecoError::ThresholdConfiguration { name: "whole-brain clustering", .. })
        ));
        let config = RecoConfig {
            nb_points: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RecoError::InvalidResolution { nb_points: 0 })
        ));
    }

    #[test]
    fn test_partial_json() {
        let config: RecoConfig = serde_json::from_str(r#"{"pruning_threshold": 3.5, "threads": 2}"#).unwrap();
        assert_eq!(3.5, config.pruning_threshold);
        assert_eq!(Some(2), config.threads);
        assert_eq!(8., config.wb_clustering_threshold);
    }

    #[test]
    fn test_install() {
        let config = RecoConfig {
            threads: Some(2),
            ..Default::default()
        };
        let pool = config.thread_pool().unwrap();
        assert_eq!(2, install(pool.as_ref(), rayon::current_num_threads));
        let pool = RecoConfig::default().thread_pool().unwrap();
        assert!(pool.is_none());
        assert_eq!(2, install(pool.as_ref(), || 1 + 1));
    }
}
