#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = miscale_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A config that validates must also build a session.
        let built = miscale_core::build_session(&cfg, None);
        assert!(built.is_ok(), "validated config rejected by builder: {built:?}");
    }
});
