use miscale_core::error::BuildError;
use miscale_core::{DecoderCfg, EstimatorCfg, ScaleSession, StabilizationCfg, build_session};
use rstest::rstest;

fn expect_invalid(r: miscale_core::error::Result<ScaleSession>, needle: &str) {
    let err = r.expect_err("should be rejected");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "got: {msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn defaults_build() {
    let s = ScaleSession::builder().build().unwrap();
    assert_eq!(s.state(), miscale_core::SessionState::Idle);
    assert!(s.previous_weight_kg().is_none());
}

#[rstest]
#[case(StabilizationCfg { min_readings: 1, ..StabilizationCfg::default() }, "min_readings")]
#[case(StabilizationCfg { min_span_ms: 4_000, ..StabilizationCfg::default() }, "min_span_ms")]
#[case(StabilizationCfg { tolerance_kg: f32::NAN, ..StabilizationCfg::default() }, "tolerance_kg")]
#[case(StabilizationCfg { dedup_window_ms: 3_000, ..StabilizationCfg::default() }, "dedup_window_ms")]
fn invalid_stabilization_is_typed(#[case] cfg: StabilizationCfg, #[case] needle: &str) {
    expect_invalid(ScaleSession::builder().with_stabilization(cfg).build(), needle);
}

#[rstest]
fn invalid_limits_and_estimator_are_typed() {
    expect_invalid(
        ScaleSession::builder()
            .with_decoder(DecoderCfg {
                min_weight_kg: 50.0,
                max_weight_kg: 40.0,
                ..DecoderCfg::default()
            })
            .build(),
        "max_weight_kg",
    );
    expect_invalid(
        ScaleSession::builder()
            .with_estimator(EstimatorCfg {
                bmr_muscle_coeff: 40.0,
                ..EstimatorCfg::default()
            })
            .build(),
        "bmr_muscle_coeff",
    );
}

#[rstest]
fn previous_weight_seeds_trend() {
    let s = ScaleSession::builder()
        .with_previous_weight(68.4)
        .build()
        .unwrap();
    assert_eq!(s.previous_weight_kg(), Some(68.4));
}

#[rstest]
fn builds_from_toml_config() {
    let cfg = miscale_config::load_toml("[decoder]\nprofile = \"centigram\"\n").unwrap();
    cfg.validate().unwrap();
    let s = build_session(&cfg, None).unwrap();
    assert_eq!(s.profile(), Some(miscale_core::FirmwareProfile::Centigram));
}
