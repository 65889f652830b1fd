//! Configuration files, module discovery and path policy.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use dynbridge::{BridgeConfig, BridgeError, ConfigError, ImportController, LoadPolicy, SystemLoader};

fn module_file_name(stem: &str) -> String {
    libloading::library_filename(stem)
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dynbridge.toml");
    std::fs::write(
        &path,
        r#"
search_paths = ["/opt/app/modules", "/usr/lib/app"]

[policy]
allowed_paths = ["/opt/app"]
require_platform_extension = true
"#,
    )
    .unwrap();

    let config = BridgeConfig::load_from_file(&path).unwrap();
    assert_eq!(config.search_paths.len(), 2);
    assert_eq!(config.policy.allowed_paths, vec![PathBuf::from("/opt/app")]);
    assert!(config.policy.require_platform_extension);
    assert_eq!(config.policy.max_file_size, 100 * 1024 * 1024);
}

#[test]
fn test_load_missing_file() {
    let err = BridgeConfig::load_from_file("/nonexistent/dynbridge.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_discover_and_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let widgets = dir.path().join(module_file_name("widgets"));
    std::fs::write(&widgets, b"not really a module").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

    let config = BridgeConfig::new()
        .with_search_path("/nonexistent/modules")
        .with_search_path(dir.path());

    assert_eq!(config.discover(), vec![widgets.clone()]);
    assert_eq!(config.resolve_module_path("widgets"), widgets);
    assert_eq!(
        config.resolve_module_path("gadgets"),
        PathBuf::from("gadgets")
    );
    assert_eq!(
        config.resolve_module_path("/abs/libgadgets.so"),
        PathBuf::from("/abs/libgadgets.so")
    );
}

#[test]
fn test_policy_rejection_is_open_failure() {
    common::init_tracing();
    let allowed = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let module = elsewhere.path().join(module_file_name("widgets"));
    std::fs::write(&module, b"x").unwrap();

    let mut policy = LoadPolicy::new();
    policy.add_allowed_path(allowed.path());
    let config = BridgeConfig::new().with_policy(policy);

    match ImportController::create_with(Arc::new(SystemLoader::new()), &config, &module) {
        Err(BridgeError::OpenFailed { path, reason }) => {
            assert_eq!(path, module);
            assert!(reason.contains("outside allowed directories"));
        }
        other => panic!("expected OpenFailed, got {:?}", other),
    }
}

#[test]
fn test_invalid_module_file() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join(module_file_name("garbage"));
    std::fs::write(&module, b"definitely not an object file").unwrap();

    let result = ImportController::create_with(
        Arc::new(SystemLoader::new()),
        &BridgeConfig::default(),
        &module,
    );
    assert!(matches!(result, Err(BridgeError::OpenFailed { .. })));
}
