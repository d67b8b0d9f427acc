use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use movement_scorer::config::ScorerConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "MOVEMENT_SCORER_CONFIG",
        "MOVEMENT_SCORER_BACKEND",
        "MOVEMENT_SCORER_MODEL",
        "MOVEMENT_SCORER_SEEK_TIMEOUT_MS",
        "MOVEMENT_SCORER_OVERLAY_THRESHOLD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ScorerConfig::load().expect("load defaults");
    assert_eq!(cfg.backend.name, "stub");
    assert!(cfg.backend.model_path.is_none());
    assert_eq!(cfg.video.seek_timeout, Duration::from_millis(2_000));
    assert_eq!(cfg.overlay.target_fps, 24);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let model_path = file.path().with_extension("onnx");
    let json = format!(
        r#"{{
            "backend": {{
                "name": "tract",
                "model_path": "{}",
                "input_size": 256
            }},
            "video": {{ "seek_timeout_ms": 500 }},
            "overlay": {{ "confidence_threshold": 0.5, "target_fps": 15 }}
        }}"#,
        model_path.display()
    );
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("MOVEMENT_SCORER_CONFIG", file.path());
    std::env::set_var("MOVEMENT_SCORER_SEEK_TIMEOUT_MS", "750");
    std::env::set_var("MOVEMENT_SCORER_OVERLAY_THRESHOLD", "0.4");

    let cfg = ScorerConfig::load().expect("load config");

    assert_eq!(cfg.backend.name, "tract");
    assert_eq!(cfg.backend.model_path.as_deref(), Some(model_path.as_path()));
    assert_eq!(cfg.backend.input_size, 256);
    assert_eq!(cfg.video.seek_timeout, Duration::from_millis(750));
    assert!((cfg.overlay.confidence_threshold - 0.4).abs() < f32::EPSILON);
    assert_eq!(cfg.overlay.target_fps, 15);

    clear_env();
}

#[test]
fn env_backend_override_is_validated() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOVEMENT_SCORER_BACKEND", "mediapipe");
    let err = ScorerConfig::load().unwrap_err();
    assert!(err.to_string().contains("unknown pose backend"));

    clear_env();
}

#[test]
fn malformed_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOVEMENT_SCORER_SEEK_TIMEOUT_MS", "soon");
    assert!(ScorerConfig::load().is_err());
    clear_env();

    std::env::set_var("MOVEMENT_SCORER_SEEK_TIMEOUT_MS", "0");
    assert!(ScorerConfig::load().is_err());

    clear_env();
}

#[test]
fn invalid_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ not json").expect("write config");
    std::env::set_var("MOVEMENT_SCORER_CONFIG", file.path());

    let err = ScorerConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}
