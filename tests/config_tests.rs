use round_forecast::config::Config;
use round_forecast::error::AppError;

#[test]
fn parse_default_toml() {
    let toml_str = r#"
[engine]
min_history = 52
uncertainty_threshold = 95.0
defensive_uncertainty_threshold = 65.0
min_quality = 0.25

[learning]
performance_window = 30
regime_window = 35
probation_weight_cap = 0.10
reflexive_cycles = 4

[session]
prime_start_hour = 13
prime_end_hour = 21
off_prime_multiplier = 0.9

[logging]
level = "debug"
json = true
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.engine.min_history, 52);
    assert!((config.engine.min_quality - 0.25).abs() < f64::EPSILON);
    assert_eq!(config.learning.reflexive_cycles, 4);
    assert!((config.learning.probation_exit_above - 0.55).abs() < f64::EPSILON);
    assert_eq!(config.session.prime_start_hour, 13);
    assert!((config.session.off_prime_multiplier - 0.9).abs() < f64::EPSILON);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(config.validate().is_ok());
}

#[test]
fn shipped_default_file_matches_built_in_defaults() {
    let raw = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"))
        .unwrap();
    let from_file: Config = toml::from_str(&raw).unwrap();
    let built_in = Config::default();
    assert_eq!(from_file.engine.min_history, built_in.engine.min_history);
    assert_eq!(
        from_file.learning.performance_window,
        built_in.learning.performance_window
    );
    assert_eq!(from_file.session.prime_end_hour, built_in.session.prime_end_hour);
    assert!(from_file.validate().is_ok());
}

#[test]
fn invalid_values_surface_as_config_errors() {
    let mut config = Config::default();
    config.engine.forced_jitter = 0.9;
    match config.validate() {
        Err(AppError::Config(msg)) => assert!(msg.contains("forced_jitter")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn load_from_missing_explicit_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(Config::load(Some(&missing)).is_err());
}
