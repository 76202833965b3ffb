use std::fs;

use reco_bundles::{
    cache,
    clustering::QuickBundles,
    config::RecoConfig,
    io::{read_cluster_map, write_cluster_map},
    recognition::recognize,
    streamline::Tractogram,
    transform::AffineTransform,
};

use utilities::{radial_streamlines, radial_tractogram, straight, temp_path, LENGTH};

#[test]
fn test_round_trip_computed_map() {
    let streamlines = radial_streamlines(400, 21);
    let map = QuickBundles::new(1., 12).unwrap().cluster(&streamlines).unwrap();
    assert!(map.len() > 6);
    let loaded = cache::load(&cache::save(&map).unwrap()).unwrap();
    assert_eq!(map, loaded);
    assert_eq!(1., loaded.threshold());
    for (c1, c2) in map.iter().zip(loaded.iter()) {
        assert_eq!(c1.indices(), c2.indices());
        let bits1: Vec<u64> = c1.centroid().points().iter().flatten().map(|x| x.to_bits()).collect();
        let bits2: Vec<u64> = c2.centroid().points().iter().flatten().map(|x| x.to_bits()).collect();
        assert_eq!(bits1, bits2);
    }
}

#[test]
fn test_cached_map_gives_same_recognition() {
    let wb = radial_tractogram(300, 17);
    let model = Tractogram::new(vec![straight([0., 0., 0.], [0., 0., -1.], LENGTH, 25)]);
    let affine = AffineTransform::identity();
    let config = RecoConfig::default();
    let fresh = recognize(&wb, &model, &affine, false, None, &config).unwrap();

    let path = temp_path("cache_roundtrip.json");
    write_cluster_map(&path, fresh.cluster_map.as_ref().unwrap()).unwrap();
    let cached = read_cluster_map(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let config = RecoConfig {
        wb_clustering_threshold: 1000.,
        ..Default::default()
    };
    let reused = recognize(&wb, &model, &affine, false, Some(cached), &config).unwrap();
    assert_eq!(fresh.indices, reused.indices);
    assert!(reused.cluster_map.is_none());
}

#[test]
fn test_read_corrupted_cache() {
    let path = temp_path("cache_corrupted.json");
    fs::write(&path, b"(lp0\nccopy_reg").unwrap();
    let result = read_cluster_map(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(
        result,
        Err(reco_bundles::error::RecoError::CacheFormat(_))
    ));
}
