//! Shared fixtures: an in-process "widgets" module served by `StaticLoader`.

#![allow(dead_code)]

use std::ffi::c_void;
use std::sync::Arc;

use dynbridge::{BridgeConfig, ImportController, ModuleTable, StaticLoader};
use dynbridge_sdk::run_factory;

pub const WIDGETS: &str = "builtin/widgets";

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gadget {
    pub serial: u64,
}

#[derive(Debug)]
pub struct PressJammed;

impl std::fmt::Display for PressJammed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "press jammed")
    }
}

fn make_widget() -> Box<Widget> {
    Box::new(Widget {
        id: 7,
        name: "gear".to_string(),
    })
}

extern "C" fn make_widget_adapter() -> *mut c_void {
    run_factory(make_widget)
}

extern "C" fn failing_widget_adapter() -> *mut c_void {
    run_factory(|| Err::<Box<Widget>, _>(PressJammed))
}

extern "C" fn missing_widget_adapter() -> *mut c_void {
    run_factory(|| None::<Box<Widget>>)
}

extern "C" fn exploding_widget_adapter() -> *mut c_void {
    run_factory(|| -> Box<Widget> { panic!("spring loose") })
}

extern "C" fn untyped_adapter() -> *mut c_void {
    run_factory(|| Box::into_raw(Box::new(0u8)) as *mut c_void)
}

/// Adapter that breaks the protocol by returning nothing at all.
extern "C" fn null_adapter() -> *mut c_void {
    std::ptr::null_mut()
}

/// Envelope from an SDK with a newer layout.
#[repr(C)]
struct FutureEnvelope {
    protocol_version: u32,
    flags: u64,
}

extern "C" fn future_protocol_adapter() -> *mut c_void {
    Box::into_raw(Box::new(FutureEnvelope {
        protocol_version: 99,
        flags: 0,
    })) as *mut c_void
}

pub extern "C" fn add(a: i32, b: i32) -> i32 {
    a + b
}

pub fn widget_table() -> ModuleTable {
    ModuleTable::new()
        .with_safe_export("MakeWidget", make_widget_adapter)
        .with_safe_export("MakeBrokenWidget", failing_widget_adapter)
        .with_safe_export("MakeMissingWidget", missing_widget_adapter)
        .with_safe_export("MakeExplodingWidget", exploding_widget_adapter)
        .with_safe_export("MakeUntyped", untyped_adapter)
        .with_safe_export("NullAdapter", null_adapter)
        .with_safe_export("FutureProtocol", future_protocol_adapter)
        .with_function("add", add as *const ())
}

pub fn loader() -> Arc<StaticLoader> {
    let loader = Arc::new(StaticLoader::new());
    loader.register(WIDGETS, widget_table());
    loader
}

pub fn open(loader: &Arc<StaticLoader>, path: &str) -> dynbridge::Result<ImportController> {
    ImportController::create_with(loader.clone(), &BridgeConfig::default(), path)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
