mod common;

use assert_matches::assert_matches;

use common::{
    MockReader, MockRegistry, MockTrack, RecordingSink, manifest_for, synthetic_values,
    track_path, utf8_root,
};
use zarr_multivec::app::App;
use zarr_multivec::domain::{LADDER_DEPTH, bin_count};
use zarr_multivec::error::ConvertError;
use zarr_multivec::ingest::SampleStatus;
use zarr_multivec::layout::array_path;
use zarr_multivec::output::JsonOutput;
use zarr_multivec::row_info::CistromeRowInfo;
use zarr_multivec::store::ZarrStore;
use zarr_multivec::track::BinLayout;

fn all_nan(values: &[f32]) -> bool {
    values.iter().all(|value| value.is_nan())
}

#[test]
fn single_track_covering_one_chromosome() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["s0"]);

    let chr1_values = vec![5.0, 3.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
    let mut reader = MockReader::default();
    reader.insert(
        &track_path(&root, "s0"),
        Some(MockTrack::with_chroms(&[("chr1", 1000)]).with_values("chr1", 100, chr1_values.clone())),
    );

    let app = App::new(MockRegistry::small(), reader, CistromeRowInfo);
    let result = app.convert(&manifest, &JsonOutput).unwrap();
    assert_eq!(result.ingested, 1);
    assert_eq!(result.arrays, 2 * LADDER_DEPTH);
    assert_eq!(
        result.samples[0].status,
        SampleStatus::Ingested {
            chromosomes: vec!["chr1".to_string()]
        }
    );

    let store = ZarrStore::open(manifest.output.clone()).unwrap();
    let chr1 = store.array(&array_path("chr1", 100)).unwrap();
    assert_eq!(chr1.read_row(0).unwrap(), chr1_values);

    let chr2 = store.array(&array_path("chr2", 100)).unwrap();
    assert_eq!(chr2.width(), 5);
    let row = chr2.read_row(0).unwrap();
    assert_eq!(row.len(), 5);
    assert!(all_nan(&row));
}

#[test]
fn every_array_has_catalog_shape() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["a", "b", "c"]);
    let mut reader = MockReader::default();
    for name in ["a", "b", "c"] {
        reader.insert(
            &track_path(&root, name),
            Some(MockTrack::with_chroms(&[("chr1", 1000), ("chr2", 500)])),
        );
    }

    App::new(MockRegistry::small(), reader, CistromeRowInfo)
        .convert(&manifest, &JsonOutput)
        .unwrap();

    let store = ZarrStore::open(manifest.output.clone()).unwrap();
    for (chrom, length) in [("chr1", 1000u64), ("chr2", 500u64)] {
        let mut previous_width = u64::MAX;
        for &resolution in manifest.ladder.levels() {
            let array = store.array(&array_path(chrom, resolution)).unwrap();
            assert_eq!(array.rows(), 3);
            assert_eq!(array.width(), bin_count(length, resolution));
            assert!(array.width() <= previous_width);
            previous_width = array.width();
            for row in 0..3 {
                assert_eq!(
                    array.read_row(row).unwrap(),
                    synthetic_values(chrom, BinLayout::whole_chromosome(length, resolution))
                );
            }
        }
    }
}

#[test]
fn invalid_track_leaves_row_empty_and_run_continues() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["good", "broken"]);
    let mut reader = MockReader::default();
    reader.insert(
        &track_path(&root, "good"),
        Some(MockTrack::with_chroms(&[("chr1", 1000), ("chr2", 500)])),
    );
    reader.insert(&track_path(&root, "broken"), None);

    let result = App::new(MockRegistry::small(), reader, CistromeRowInfo)
        .convert(&manifest, &JsonOutput)
        .unwrap();
    assert_eq!(result.ingested, 1);
    assert_eq!(result.skipped, 1);
    assert!(result.samples[1].is_skipped());
    assert_eq!(result.samples[1].id, "broken");

    let store = ZarrStore::open(manifest.output.clone()).unwrap();
    for chrom in ["chr1", "chr2"] {
        for &resolution in manifest.ladder.levels() {
            let array = store.array(&array_path(chrom, resolution)).unwrap();
            assert!(!all_nan(&array.read_row(0).unwrap()));
            assert!(all_nan(&array.read_row(1).unwrap()));
        }
    }

    // Row labels stay aligned even for skipped samples.
    let attrs = store.read_attributes("").unwrap();
    assert_eq!(attrs["row_infos"].as_array().unwrap().len(), 2);
    assert_eq!(attrs["row_infos"][1]["id"], "1001");
}

#[test]
fn chromosome_missing_from_track_stays_empty() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["partial"]);
    let mut reader = MockReader::default();
    reader.insert(
        &track_path(&root, "partial"),
        Some(MockTrack::with_chroms(&[
            ("chr2", 500),
            ("chrUn_KI270302v1", 2274),
            ("chr1_random", 300),
        ])),
    );

    let app = App::new(MockRegistry::small(), reader, CistromeRowInfo);
    let result = app.convert(&manifest, &JsonOutput).unwrap();
    assert_eq!(
        result.samples[0].status,
        SampleStatus::Ingested {
            chromosomes: vec!["chr2".to_string()]
        }
    );

    let store = ZarrStore::open(manifest.output.clone()).unwrap();
    assert!(!store.is_group("chromosomes/chrUn_KI270302v1"));
    for &resolution in manifest.ladder.levels() {
        let chr1 = store.array(&array_path("chr1", resolution)).unwrap();
        assert!(all_nan(&chr1.read_row(0).unwrap()));
        let chr2 = store.array(&array_path("chr2", resolution)).unwrap();
        assert_eq!(
            chr2.read_row(0).unwrap(),
            synthetic_values("chr2", BinLayout::whole_chromosome(500, resolution))
        );
    }
}

#[test]
fn rerun_overwrites_with_identical_store() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["a", "b"]);
    let build_reader = || {
        let mut reader = MockReader::default();
        reader.insert(
            &track_path(&root, "a"),
            Some(MockTrack::with_chroms(&[("chr1", 1000)])),
        );
        reader.insert(
            &track_path(&root, "b"),
            Some(MockTrack::with_chroms(&[("chr1", 1000), ("chr2", 500)])),
        );
        reader
    };

    let snapshot = || {
        let store = ZarrStore::open(manifest.output.clone()).unwrap();
        let mut rows = Vec::new();
        for chrom in ["chr1", "chr2"] {
            for &resolution in manifest.ladder.levels() {
                let array = store.array(&array_path(chrom, resolution)).unwrap();
                for row in 0..2 {
                    let values = array.read_row(row).unwrap();
                    rows.push(values.iter().map(|v| v.to_bits()).collect::<Vec<_>>());
                }
            }
        }
        (rows, store.read_attributes("").unwrap())
    };

    App::new(MockRegistry::small(), build_reader(), CistromeRowInfo)
        .convert(&manifest, &JsonOutput)
        .unwrap();
    let first = snapshot();

    let stray = manifest.output.join("stray.txt");
    std::fs::write(stray.as_std_path(), b"left over").unwrap();

    App::new(MockRegistry::small(), build_reader(), CistromeRowInfo)
        .convert(&manifest, &JsonOutput)
        .unwrap();
    let second = snapshot();

    assert_eq!(first, second);
    assert!(!stray.as_std_path().exists());
}

#[test]
fn parallel_ingestion_matches_sequential() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let names = ["s0", "s1", "s2", "s3", "s4", "s5"];
    let mut manifest = manifest_for(&root, &names);
    let build_reader = || {
        let mut reader = MockReader::default();
        for (i, name) in names.iter().enumerate() {
            let track = match i % 3 {
                0 => Some(MockTrack::with_chroms(&[("chr1", 1000), ("chr2", 500)])),
                1 => Some(MockTrack::with_chroms(&[("chr2", 500)])),
                _ => None,
            };
            reader.insert(&track_path(&root, name), track);
        }
        reader
    };

    let sequential = App::new(MockRegistry::small(), build_reader(), CistromeRowInfo)
        .convert(&manifest, &JsonOutput)
        .unwrap();
    let read_all = |manifest: &zarr_multivec::config::ResolvedManifest| {
        let store = ZarrStore::open(manifest.output.clone()).unwrap();
        let mut rows = Vec::new();
        for chrom in ["chr1", "chr2"] {
            for &resolution in manifest.ladder.levels() {
                let array = store.array(&array_path(chrom, resolution)).unwrap();
                for row in 0..names.len() as u64 {
                    let values = array.read_row(row).unwrap();
                    rows.push(values.iter().map(|v| v.to_bits()).collect::<Vec<_>>());
                }
            }
        }
        rows
    };
    let sequential_rows = read_all(&manifest);

    manifest.output = root.join("out/parallel.zarr");
    manifest.threads = Some(4);
    let parallel = App::new(MockRegistry::small(), build_reader(), CistromeRowInfo)
        .convert(&manifest, &JsonOutput)
        .unwrap();

    assert_eq!(sequential.samples, parallel.samples);
    assert_eq!(sequential_rows, read_all(&manifest));
}

#[test]
fn fetch_failure_aborts_and_keeps_partial_store() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["ok", "bad"]);
    let mut reader = MockReader::default();
    reader.insert(
        &track_path(&root, "ok"),
        Some(MockTrack::with_chroms(&[("chr1", 1000)])),
    );
    reader.insert(
        &track_path(&root, "bad"),
        Some(MockTrack::with_chroms(&[("chr1", 1000), ("chr2", 500)]).failing_on("chr2", 400)),
    );

    let err = App::new(MockRegistry::small(), reader, CistromeRowInfo)
        .convert(&manifest, &JsonOutput)
        .unwrap_err();
    assert_matches!(
        err,
        ConvertError::Fetch { ref sample, ref chrom, resolution: 400, .. }
            if sample.contains("bad") && chrom == "chr2"
    );

    let store = ZarrStore::open(manifest.output.clone()).unwrap();
    let chr1 = store.array(&array_path("chr1", 100)).unwrap();
    assert!(!all_nan(&chr1.read_row(0).unwrap()));
    assert_eq!(
        store.read_attributes("").unwrap(),
        serde_json::Value::Object(Default::default())
    );
}

#[test]
fn malformed_metadata_aborts_before_store_is_created() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["a", "b"]);
    std::fs::write(manifest.samples[1].metadata.as_std_path(), b"{not json").unwrap();
    let mut reader = MockReader::default();
    for name in ["a", "b"] {
        reader.insert(
            &track_path(&root, name),
            Some(MockTrack::with_chroms(&[("chr1", 1000)])),
        );
    }

    let app = App::new(MockRegistry::small(), reader, CistromeRowInfo);
    let err = app.convert(&manifest, &JsonOutput).unwrap_err();
    assert_matches!(err, ConvertError::MetadataMalformed { sample: 1, .. });
    assert!(!manifest.output.as_std_path().exists());

    std::fs::remove_file(manifest.samples[0].metadata.as_std_path()).unwrap();
    let err = app.convert(&manifest, &JsonOutput).unwrap_err();
    assert_matches!(err, ConvertError::MetadataMissing { sample: 0, .. });
}

#[test]
fn attributes_describe_pyramid_for_serverless_access() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let manifest = manifest_for(&root, &["x", "y", "z"]);
    let mut reader = MockReader::default();
    for name in ["x", "y", "z"] {
        reader.insert(
            &track_path(&root, name),
            Some(MockTrack::with_chroms(&[("chr1", 1000)])),
        );
    }

    let sink = RecordingSink::new();
    App::new(MockRegistry::small(), reader, CistromeRowInfo)
        .convert(&manifest, &sink)
        .unwrap();
    let events = sink.events.lock().unwrap();
    let phases = events
        .iter()
        .filter(|message| message.starts_with("phase="))
        .map(|message| message.split(';').next().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        phases,
        vec![
            "phase=Resolve",
            "phase=Metadata",
            "phase=Layout",
            "phase=Ingest",
            "phase=Attributes"
        ]
    );

    let store = ZarrStore::open(manifest.output.clone()).unwrap();
    let attrs = store.read_attributes("").unwrap();
    assert_eq!(attrs["tile_size"], 256);
    assert_eq!(attrs["min_pos"], serde_json::json!([0]));
    assert_eq!(attrs["max_pos"], serde_json::json!([1500]));
    assert_eq!(attrs["shape"], serde_json::json!([256, 3]));
    assert_eq!(attrs["name"], "test__dataset");
    assert_eq!(attrs["coordSystem"], "test");
    assert_eq!(
        attrs["chromSizes"],
        serde_json::json!([["chr1", 1000], ["chr2", 500]])
    );

    let resolutions = attrs["resolutions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_u64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(resolutions.len(), LADDER_DEPTH);
    assert!(resolutions.windows(2).all(|pair| pair[0] > pair[1]));
    assert_eq!(*resolutions.last().unwrap(), 100);

    let multiscales = attrs["multiscales"].as_array().unwrap();
    assert_eq!(multiscales.len(), 2);
    for (entry, (chrom, length)) in multiscales.iter().zip([("chr1", 1000), ("chr2", 500)]) {
        assert_eq!(entry["name"], chrom);
        assert_eq!(entry["type"], "zarr-multivec");
        assert_eq!(entry["metadata"]["chromsize"], length);
        let paths = entry["datasets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|dataset| dataset["path"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        let expected = resolutions
            .iter()
            .map(|&resolution| array_path(chrom, resolution))
            .collect::<Vec<_>>();
        assert_eq!(paths, expected);
    }

    let ids = attrs["row_infos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|info| info["id"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["1000", "1001", "1002"]);
    assert_eq!(attrs["row_infos"][2]["Factor"], "F2");
}
