//! Versioned serialization of cluster maps, so that a whole-brain clustering can be reused.
//!
//! A cached map only makes sense against the tractogram it was computed from:
//! member indices are opaque and nothing here can check them.

use serde::{Deserialize, Serialize};

use crate::{
    clustering::ClusterMap,
    error::{RecoError, Result},
};

const FORMAT: &str = "reco_bundles.cluster_map";
const VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope<Map> {
    format: String,
    version: u32,
    cluster_map: Map,
}

/// Serializes a cluster map.
pub fn save(cluster_map: &ClusterMap) -> Result<Vec<u8>> {
    let envelope = Envelope {
        format: FORMAT.into(),
        version: VERSION,
        cluster_map,
    };
    serde_json::to_vec(&envelope).map_err(|e| RecoError::CacheFormat(e.to_string()))
}

/// Deserializes and checks a cluster map.
pub fn load(bytes: &[u8]) -> Result<ClusterMap> {
    let envelope: Envelope<ClusterMap> =
        serde_json::from_slice(bytes).map_err(|e| RecoError::CacheFormat(e.to_string()))?;
    if envelope.format != FORMAT {
        return Err(RecoError::CacheFormat(format!(
            "unknown format '{}'",
            envelope.format
        )));
    }
    if envelope.version != VERSION {
        return Err(RecoError::CacheFormat(format!(
            "unsupported version {}, expected {}",
            envelope.version, VERSION
        )));
    }
    envelope
        .cluster_map
        .validate()
        .map_err(|e| RecoError::CacheFormat(e.to_string()))?;
    Ok(envelope.cluster_map)
}

#[cfg(test)]
mod tests {
    use crate::cache::*;
    use crate::clustering::Cluster;
    use crate::streamline::Streamline;
    use regex::Regex;

    const OUT_PATTERN: &str = r#"^\{"format":"reco_bundles\.cluster_map","version":1,"cluster_map":\{"threshold":[0-9.]+,"nb_points":[0-9]+,"clusters":\[.*\]\}\}$"#;

    fn build_map() -> ClusterMap {
        let clusters = vec![
            Cluster::new(
                Streamline::new(vec![[0.1, 0.2, 0.3], [1. / 3., 2. / 3., -7.000000000000001]]),
                vec![4, 0, 2],
            ),
            Cluster::new(Streamline::new(vec![[1e-300, 0.5, 5e15], [9., 8., 7.]]), vec![]),
        ];
        ClusterMap::from_clusters(8., 2, clusters)
    }

    #[test]
    fn test_round_trip() {
        let map = build_map();
        let loaded = load(&save(&map).unwrap()).unwrap();
        assert_eq!(map, loaded);
        for (c1, c2) in map.iter().zip(loaded.iter()) {
            for (p1, p2) in c1.centroid().points().iter().zip(c2.centroid().points()) {
                for (x1, x2) in p1.iter().zip(p2) {
                    assert_eq!(x1.to_bits(), x2.to_bits());
                }
            }
        }
    }

    #[test]
    fn test_saved_layout() {
        let bytes = save(&build_map()).unwrap();
        let json = String::from_utf8(bytes).unwrap();
        let re = Regex::new(OUT_PATTERN).unwrap();
        assert!(re.is_match(&json), "{}", json);
    }

    #[test]
    fn test_load_garbage() {
        assert!(matches!(load(b"\x80\x03}q"), Err(RecoError::CacheFormat(_))));
        assert!(matches!(load(b"{}"), Err(RecoError::CacheFormat(_))));
    }

    #[test]
    fn test_load_wrong_version() {
        let json = r#"{"format":"reco_bundles.cluster_map","version":2,"cluster_map":{"threshold":8.0,"nb_points":2,"clusters":[]}}"#;
        let err = load(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("version 2"));
        let json = r#"{"format":"pickle","version":1,"cluster_map":{"threshold":8.0,"nb_points":2,"clusters":[]}}"#;
        assert!(matches!(load(json.as_bytes()), Err(RecoError::CacheFormat(_))));
    }

    #[test]
    fn test_load_inconsistent_centroid() {
        let json = r#"{"format":"reco_bundles.cluster_map","version":1,"cluster_map":{"threshold":8.0,"nb_points":3,"clusters":[{"centroid":[[0,0,0],[1,1,1]],"indices":[0]}]}}"#;
        let err = load(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("centroid 0 has 2 points"));
        let json = r#"{"format":"reco_bundles.cluster_map","version":1,"cluster_map":{"threshold":-8.0,"nb_points":2,"clusters":[]}}"#;
        assert!(matches!(load(json.as_bytes()), Err(RecoError::CacheFormat(_))));
        let json = r#"{"format":"reco_bundles.cluster_map","version":1,"cluster_map":{"threshold":8.0,"nb_points":2,"clusters":[{"centroid":[[0,0],[1,1,1]],"indices":[0]}]}}"#;
        assert!(matches!(load(json.as_bytes()), Err(RecoError::CacheFormat(_))));
    }

    #[test]
    fn test_empty_map() {
        let map = ClusterMap::new(4., 12);
        assert_eq!(map, load(&save(&map).unwrap()).unwrap());
    }
}
