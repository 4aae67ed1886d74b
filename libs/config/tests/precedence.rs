//! Configuration layering with on-disk TOML files

use iofog_config::{ClientConfig, ConfigSources, InitParams};
use std::io::Write;
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_file_overrides_caller_parameters() {
    let file = toml_file("host = \"file-host\"\nport = 7000\n");
    let params = InitParams::new()
        .host("caller-host")
        .port(1000)
        .publisher_id("caller-id")
        .config_file(file.path());

    let config = ClientConfig::load(&params, &ConfigSources::default()).unwrap();
    assert_eq!(config.host, "file-host");
    assert_eq!(config.port, 7000);
    // Not in the file, so the caller value stands
    assert_eq!(config.publisher_id, "caller-id");
    assert!(!config.ssl);
}

#[test]
fn test_arguments_override_file() {
    let file = toml_file("publisher_id = \"file-id\"\nssl = true\n");
    let params = InitParams::new().config_file(file.path());
    let sources = ConfigSources::default().with_args(["--id=arg-id", "--ssl=false"]);

    let config = ClientConfig::load(&params, &sources).unwrap();
    assert_eq!(config.publisher_id, "arg-id");
    assert!(!config.ssl);
}

#[test]
fn test_environment_overrides_arguments_and_file() {
    let file = toml_file("host = \"file-host\"\npublisher_id = \"file-id\"\n");
    let params = InitParams::new().config_file(file.path());
    let sources = ConfigSources::default()
        .with_args(["--host=arg-host", "--id=arg-id"])
        .with_env("IOFOG_HOST", "env-host")
        .with_env("IOFOG_PUBLISHER_ID", "iofog-id")
        .with_env("SELFNAME", "selfname-id");

    let config = ClientConfig::load(&params, &sources).unwrap();
    assert_eq!(config.host, "env-host");
    // SELFNAME is applied after IOFOG_PUBLISHER_ID
    assert_eq!(config.publisher_id, "selfname-id");
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let params = InitParams::new().config_file(dir.path().join("absent.toml"));
    let err = ClientConfig::load(&params, &ConfigSources::default()).unwrap_err();
    assert!(err.to_string().contains("client configuration"));
}

#[test]
fn test_invalid_port_is_an_error() {
    let sources = ConfigSources::default().with_env("IOFOG_PORT", "not-a-port");
    assert!(ClientConfig::load(&InitParams::new(), &sources).is_err());
}
