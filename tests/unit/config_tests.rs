use std::time::Duration;

use agent_relay::config::GlobalConfig;
use agent_relay::mode::ExecutionMode;
use agent_relay::stream::codec::MAX_LINE_BYTES;
use agent_relay::AppError;

fn sample_toml(workspace: &str) -> String {
    format!(
        r#"
workspace_root = '{workspace}'
default_mode = "team"

[upstream]
url = "http://127.0.0.1:8080/api/chat"
model = "sonnet"
connect_timeout_seconds = 3

[stream]
max_line_bytes = 4096
"#
    )
}

fn minimal_toml(workspace: &str) -> String {
    format!(
        r#"
workspace_root = '{workspace}'

[upstream]
url = "https://agent.example.com/stream"
"#
    )
}

#[test]
fn parses_full_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = GlobalConfig::from_toml_str(&sample_toml(&temp.path().to_string_lossy()))
        .expect("config should parse");

    assert_eq!(config.default_mode, ExecutionMode::Team);
    assert_eq!(config.upstream.model, "sonnet");
    assert_eq!(config.connect_timeout(), Duration::from_secs(3));
    assert_eq!(config.stream.max_line_bytes, 4096);
}

#[test]
fn minimal_config_uses_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = GlobalConfig::from_toml_str(&minimal_toml(&temp.path().to_string_lossy()))
        .expect("config should parse");

    assert_eq!(config.default_mode, ExecutionMode::Quick);
    assert_eq!(config.upstream.model, "default");
    assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    assert_eq!(config.stream.max_line_bytes, MAX_LINE_BYTES);
}

#[test]
fn workspace_root_is_canonicalized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = GlobalConfig::from_toml_str(&minimal_toml(&temp.path().to_string_lossy()))
        .expect("config should parse");

    let expected = temp.path().canonicalize().expect("canonical path");
    assert_eq!(config.workspace_root, expected);
}

#[test]
fn missing_workspace_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("does-not-exist");
    let result = GlobalConfig::from_toml_str(&minimal_toml(&missing.to_string_lossy()));

    match result {
        Err(AppError::Config(msg)) => assert!(msg.contains("workspace_root"), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn non_http_url_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = minimal_toml(&temp.path().to_string_lossy())
        .replace("https://agent.example.com/stream", "ftp://agent.example.com");

    assert!(matches!(
        GlobalConfig::from_toml_str(&toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn empty_model_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = sample_toml(&temp.path().to_string_lossy()).replace("\"sonnet\"", "\"  \"");

    assert!(matches!(
        GlobalConfig::from_toml_str(&toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn zero_line_limit_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = sample_toml(&temp.path().to_string_lossy())
        .replace("max_line_bytes = 4096", "max_line_bytes = 0");

    assert!(matches!(
        GlobalConfig::from_toml_str(&toml),
        Err(AppError::Config(_))
    ));
}

#[test]
fn unknown_mode_is_a_parse_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = sample_toml(&temp.path().to_string_lossy()).replace("\"team\"", "\"swarm\"");

    match GlobalConfig::from_toml_str(&toml) {
        Err(AppError::Config(msg)) => assert!(msg.starts_with("invalid config"), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, minimal_toml(&temp.path().to_string_lossy())).expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("config should load");
    assert_eq!(config.upstream.url, "https://agent.example.com/stream");
}

#[test]
fn load_from_missing_path_is_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        GlobalConfig::load_from_path(temp.path().join("absent.toml")),
        Err(AppError::Config(_))
    ));
}

#[test]
fn workspace_override_must_exist() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = GlobalConfig::from_toml_str(&minimal_toml(&temp.path().to_string_lossy()))
        .expect("config should parse");

    assert!(config.set_workspace_root(temp.path().join("nope")).is_err());

    let nested = temp.path().join("nested");
    std::fs::create_dir(&nested).expect("mkdir");
    config.set_workspace_root(&nested).expect("override applies");
    assert_eq!(config.workspace_root, nested.canonicalize().expect("canonical"));
}
