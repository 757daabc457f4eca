//! Integration tests for configuration loading

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use vc_console::infra::Config;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[server]
url = "http://vc.example:8443/jsonrpc"
timeout_ms = 5000

[session]
storage_file = "/tmp/vc/session.json"

[charts]
default_refresh_interval_ms = 30000
default_data_length = 60

[console]
max_exchanges = 10
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.server_url(), "http://vc.example:8443/jsonrpc");
    assert_eq!(config.request_timeout_ms(), 5000);
    assert_eq!(config.session_file(), Path::new("/tmp/vc/session.json"));
    assert_eq!(config.default_refresh_interval_ms(), 30_000);
    assert_eq!(config.default_data_length(), 60);
    assert_eq!(config.max_exchanges(), 10);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server\nurl = ").unwrap();
    temp_file.flush().unwrap();

    let error = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{error:#}").contains("Failed to parse config file"));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.server_url(), "http://localhost:8080/jsonrpc");
    assert_eq!(config.default_data_length(), 20);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_bundled_dev_config_parses() {
    let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml")).unwrap();
    assert_eq!(config.default_refresh_interval_ms(), 15_000);
    assert_eq!(config.max_exchanges(), 100);
}
