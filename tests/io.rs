use std::fs;

use regex::Regex;
use reco_bundles::{
    config::RecoConfig,
    error::RecoError,
    geometry::resample_tractogram,
    io::{load_affine, load_tractogram, save_tractogram},
    recognition::recognize,
    streamline::Tractogram,
};

use utilities::{direction_indices, radial_tractogram, straight, temp_path, LENGTH};

const OUT_PATTERN: &str = r#"^\{"streamlines":\[.*\],"data_per_streamline":\{"id":\[(\[[0-9.]+\],?)*\]\},"data_per_point":\{\}\}$"#;

#[test]
fn test_file_pipeline_carries_attributes() {
    let wb_path = temp_path("wb.json");
    let model_path = temp_path("model.json");
    let affine_path = temp_path("affine.txt");
    let out_path = temp_path("out.json");

    save_tractogram(&radial_tractogram(120, 3), &wb_path).unwrap();
    let model = Tractogram::new(vec![straight([5., 0., 0.], [0., 1., 0.], LENGTH, 18)]);
    save_tractogram(&model, &model_path).unwrap();
    fs::write(&affine_path, "# model to subject\n1 0 0 -5\n0 1 0 0\n0 0 1 0\n0 0 0 1\n").unwrap();

    let wb = load_tractogram(&wb_path).unwrap();
    let model = load_tractogram(&model_path).unwrap();
    let affine = load_affine(&affine_path).unwrap();
    let result = recognize(&wb, &model, &affine, false, None, &RecoConfig::default()).unwrap();
    let selected = wb.select(&result.indices).unwrap();
    save_tractogram(&selected, &out_path).unwrap();

    let json = fs::read_to_string(&out_path).unwrap();
    let reloaded = load_tractogram(&out_path).unwrap();
    for path in [&wb_path, &model_path, &affine_path, &out_path] {
        fs::remove_file(path).unwrap();
    }

    let expected = direction_indices(120, 1);
    assert_eq!(expected, result.indices);
    assert!(Regex::new(OUT_PATTERN).unwrap().is_match(&json));
    assert_eq!(selected, reloaded);
    let ids: Vec<usize> = reloaded.data_per_streamline()["id"]
        .iter()
        .map(|v| v[0] as usize)
        .collect();
    assert_eq!(expected, ids);
    for (i, s) in expected.iter().zip(reloaded.streamlines()) {
        assert_eq!(&wb.streamlines()[*i], s);
    }
}

#[test]
fn test_unsupported_format() {
    let path = temp_path("wb.trk");
    assert!(matches!(
        save_tractogram(&Tractogram::default(), &path),
        Err(RecoError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        load_tractogram(&path),
        Err(RecoError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_load_misaligned_tractogram() {
    let path = temp_path("misaligned.json");
    fs::write(
        &path,
        r#"{"streamlines":[[[0,0,0],[1,0,0]]],"data_per_point":{"fa":[[[0.1]]]}}"#,
    )
    .unwrap();
    let result = load_tractogram(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(
        result,
        Err(RecoError::AttributeLength { expected: 2, found: 1, .. })
    ));
}

#[test]
fn test_resample_file() {
    let path = temp_path("resampled.json");
    let resampled = resample_tractogram(&radial_tractogram(12, 8), 7).unwrap();
    save_tractogram(&resampled, &path).unwrap();
    let reloaded = load_tractogram(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert!(reloaded.streamlines().iter().all(|s| s.len() == 7));
    assert_eq!(resampled, reloaded);
}
