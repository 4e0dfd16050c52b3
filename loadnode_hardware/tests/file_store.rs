use loadnode_hardware::FileStore;
use loadnode_hardware::error::HwError;
use loadnode_traits::KvStore;
use rstest::rstest;
use tempfile::tempdir;

#[rstest]
fn missing_file_reads_defaults() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path().join("store.toml"), "HX711").unwrap();
    assert_eq!(store.get_float("conversionFactor", 1.0).unwrap(), 1.0);
    assert!(!store.path().exists(), "open must not create the file");
}

#[rstest]
#[case(2.5)]
#[case(-0.125)]
#[case(1.0e-12)]
#[case(123_456.79)]
fn values_survive_reopen(#[case] value: f32) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("store.toml");
    {
        let mut store = FileStore::open(&path, "HX711").unwrap();
        store.put_float("conversionFactor", value).unwrap();
    }
    let reopened = FileStore::open(&path, "HX711").unwrap();
    assert_eq!(reopened.get_float("conversionFactor", 1.0).unwrap(), value);
}

#[rstest]
fn namespaces_are_separate_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.toml");
    let mut a = FileStore::open(&path, "HX711").unwrap();
    a.put_float("calibratedForce", 10.0).unwrap();
    let mut b = FileStore::open(&path, "BENCH").unwrap();
    b.put_float("calibratedForce", 3.0).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[HX711]"), "{text}");
    assert!(text.contains("[BENCH]"), "{text}");

    let a2 = FileStore::open(&path, "HX711").unwrap();
    assert_eq!(a2.get_float("calibratedForce", 0.0).unwrap(), 10.0);
}

#[rstest]
fn corrupt_file_is_a_store_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.toml");
    std::fs::write(&path, "[HX711\nconversionFactor = ").unwrap();
    let err = FileStore::open(&path, "HX711").expect_err("corrupt");
    assert!(matches!(err, HwError::Store(_)), "{err:?}");
}
