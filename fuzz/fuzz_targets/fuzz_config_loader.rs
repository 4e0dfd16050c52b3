#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    if let Ok(cfg) = toml::from_str::<loadnode_config::Config>(data) {
        if cfg.validate().is_ok() {
            let _ = loadnode_core::FilterCfg::from(&cfg.filter).validate();
        }
    }
});
