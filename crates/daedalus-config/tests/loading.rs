//! File-based loading tests.

use std::fs;

use daedalus_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::TempDir;

const PETSTORE: &str = r#"
[router]
default_produces = ["json"]

[logging]
level = "daedalus_router=debug,info"
format = "pretty"

[[routes]]
pattern = "/pets/{id:[0-9]+}"
handler = "getPet"
name = "pet"
produces = ["json", "html"]

[[routes]]
method = "POST"
pattern = "/pets"
handler = "createPet"
consumes = ["json"]
excludes = ["/pets/internal"]

[routes.attributes]
role = "admin"
scopes = ["pets:write", "pets:read"]
level = { type = "Priority", variant = "High" }
"#;

#[test]
fn loads_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("daedalus.toml");
    fs::write(&path, PETSTORE).unwrap();

    let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();

    assert_eq!(config.router.default_produces, vec!["json"]);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.routes.len(), 2);
    assert_eq!(config.routes[0].method, "GET");
    assert_eq!(config.routes[0].name.as_deref(), Some("pet"));
    assert_eq!(config.routes[1].consumes, vec!["json"]);

    let attributes = config.routes[1].attribute_values().unwrap();
    let keys: Vec<_> = attributes.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["role", "scopes", "level"]);
}

#[test]
fn loads_json_file_over_preset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("daedalus.json");
    fs::write(
        &path,
        r#"{"routes": [{"method": "*", "pattern": "/**", "handler": "fallback"}]}"#,
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_development()
        .with_file(&path)
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.routes[0].method, "*");
}

#[test]
fn later_files_override_earlier_ones() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.toml");
    let local = dir.path().join("local.toml");
    fs::write(&base, PETSTORE).unwrap();
    fs::write(&local, "[logging]\nformat = \"json\"\n").unwrap();

    let config = ConfigLoader::new()
        .with_file(&base)
        .unwrap()
        .with_optional_file(&local)
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "daedalus_router=debug,info");
    assert_eq!(config.routes.len(), 2);
}

#[test]
fn rejects_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("daedalus.ini");
    fs::write(&path, "[router]").unwrap();

    assert!(matches!(
        ConfigLoader::new().with_file(&path),
        Err(ConfigError::UnsupportedFormat(_))
    ));
}

#[test]
fn rejects_malformed_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("daedalus.toml");
    fs::write(&path, "[router\nignore_case = true").unwrap();

    assert!(matches!(
        ConfigLoader::new().with_file(&path),
        Err(ConfigError::TomlError(_))
    ));
}

#[test]
fn rejects_invalid_route_media_type() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("daedalus.toml");
    fs::write(
        &path,
        "[[routes]]\npattern = \"/pets\"\nhandler = \"listPets\"\nproduces = [\"*/json\"]\n",
    )
    .unwrap();

    let err = ConfigLoader::new().with_file(&path).unwrap().load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRoute { index: 0, .. }), "{err}");
}
