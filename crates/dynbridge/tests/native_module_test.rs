//! Integration tests against the demo module built as a real shared library.
//!
//! The module must come from the same build as this test binary, otherwise
//! its types have different identities and every import is a type mismatch.
//! Run with `cargo test --workspace -- --ignored`, or build first with
//! `cargo build --workspace --all-targets`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dynbridge::{BridgeError, ImportController};
use dynbridge_demo_module::{Gadget, Widget};

fn is_demo_module(path: &Path) -> bool {
    let prefix = format!("{}dynbridge_demo_module", std::env::consts::DLL_PREFIX);
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(&prefix) && n.ends_with(std::env::consts::DLL_SUFFIX))
        .unwrap_or(false)
}

/// Helper to find the demo module built alongside this test binary
fn demo_module_path() -> PathBuf {
    // target/<profile>/deps/<test binary>
    let exe = std::env::current_exe().expect("test binary path");
    let deps = exe.parent().expect("deps dir").to_path_buf();
    let profile = deps.parent().expect("profile dir").to_path_buf();

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for dir in [&deps, &profile] {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_demo_module(&path) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                newest = Some((modified, path));
            }
        }
    }

    newest
        .map(|(_, path)| path)
        .unwrap_or_else(|| profile.join(libloading::library_filename("dynbridge_demo_module")))
}

fn open_demo() -> ImportController {
    let path = demo_module_path();
    match ImportController::create(&path) {
        Ok(controller) => controller,
        Err(e) => panic!("cannot load {}: {}", path.display(), e),
    }
}

#[test]
#[ignore = "requires demo module to be built"]
fn test_native_make_widget() {
    let controller = open_demo();

    let widget = match controller.call_safe::<Widget>("MakeWidget") {
        Ok(widget) => widget,
        Err(e) if e.is_build_mismatch() => panic!("{} ({})", e, controller.path().display()),
        Err(e) => panic!("{}", e),
    };
    assert_eq!(widget.name, "gear");

    let live = unsafe { controller.get_function::<extern "C" fn() -> usize>("dynbridge_demo_live_widgets") }
        .unwrap();
    assert_eq!(live.call(()), 1);

    drop(controller);
    drop(widget);
    assert_eq!(live.call(()), 0);
}

#[test]
#[ignore = "requires demo module to be built"]
fn test_native_scenarios() {
    let controller = open_demo();

    let gadget = controller.call_safe::<Gadget>("MakeGadget").unwrap();
    assert_eq!(gadget.serial, 0xD00D);

    assert!(matches!(
        controller.call_safe::<Gadget>("MakeWidget"),
        Err(BridgeError::TypeMismatch { .. })
    ));
    assert!(matches!(
        controller.call_safe::<Widget>("NoSuchFactory"),
        Err(BridgeError::SymbolNotFound { .. })
    ));

    for name in ["MakeBrokenWidget", "MakeMissingWidget", "MakeExplodingWidget"] {
        assert!(matches!(
            controller.call_safe::<Widget>(name),
            Err(BridgeError::ExporterFailure { .. })
        ));
    }

    let add = unsafe { controller.get_function::<extern "C" fn(i32, i32) -> i32>("dynbridge_demo_add") }
        .unwrap();
    assert_eq!(add.call((20, 22)), 42);
}
