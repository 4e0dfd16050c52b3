use std::io::Write;

use loadnode_config::{Config, load_file, load_toml};
use rstest::rstest;

#[test]
fn empty_document_yields_firmware_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.filter.window, 10);
    assert!((cfg.filter.alpha - 0.94).abs() < 1e-6);
    assert!((cfg.filter.deadband - 0.1).abs() < 1e-6);
    assert_eq!(cfg.node.cadence_ms, 12);
    assert_eq!(cfg.node.namespace, "HX711");
    assert_eq!(cfg.timeouts.sensor_ms, 500);
    assert!(cfg.pins.is_none());
    cfg.validate().expect("defaults are valid");
}

#[test]
fn full_document_parses() {
    let toml = r#"
[filter]
window = 5
alpha = 0.5
outlier_threshold = 0.2
deadband = 0.05

[node]
cadence_ms = 20
namespace = "BENCH"

[timeouts]
sample_ms = 250

[calibration]
min_factor = 1e-6

[storage]
path = "/var/lib/loadnode/store.toml"

[pins]
hx711_dt = 5
hx711_sck = 6

[serial]
baud = 57600

[sim]
base_load = 3.0
noise = 0.0

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    assert_eq!(cfg.filter.window, 5);
    assert_eq!(cfg.node.namespace, "BENCH");
    // alias
    assert_eq!(cfg.timeouts.sensor_ms, 250);
    let pins = cfg.pins.as_ref().expect("pins present");
    assert_eq!(pins.gain_pulses, 1);
    assert_eq!(pins.samples_per_read, 2);
    assert_eq!(pins.tare_samples, 10);
    assert_eq!(cfg.serial.baud, 57_600);
    cfg.validate().expect("valid config should pass");
}

#[rstest]
#[case("[filter]\nwindow = 0", "filter.window must be >= 1")]
#[case("[filter]\nalpha = 0.0", "filter.alpha must be in (0.0, 1.0]")]
#[case("[filter]\nalpha = 1.5", "filter.alpha must be in (0.0, 1.0]")]
#[case("[filter]\ndeadband = -0.1", "filter.deadband must be finite and >= 0")]
#[case("[filter]\noutlier_threshold = -1.0", "filter.outlier_threshold")]
#[case("[node]\ncadence_ms = 60001", "node.cadence_ms is unreasonably large")]
#[case("[node]\nnamespace = \"  \"", "node.namespace must not be empty")]
#[case("[timeouts]\nsensor_ms = 0", "timeouts.sensor_ms must be >= 1")]
#[case("[calibration]\nmin_factor = 0.0", "calibration.min_factor")]
#[case("[storage]\npath = \"\"", "storage.path must not be empty")]
#[case("[pins]\nhx711_dt = 5\nhx711_sck = 5", "must differ")]
#[case("[pins]\nhx711_dt = 5\nhx711_sck = 6\ngain_pulses = 4", "gain_pulses")]
#[case("[serial]\nbaud = 0", "serial.baud must be > 0")]
#[case("[sim]\ncounts_per_unit = 0.0", "sim.counts_per_unit")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error '{err}' should mention '{needle}'"
    );
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_file(&dir.path().join("absent.toml")).expect("defaults");
    assert_eq!(cfg, Config::default());
}

#[test]
fn malformed_file_is_an_error() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "[filter\nwindow = ").unwrap();
    let err = load_file(f.path()).expect_err("should fail to parse");
    assert!(format!("{err}").contains("parse config"));
}
