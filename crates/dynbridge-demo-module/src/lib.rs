//! Demo module for dynbridge.
//!
//! Built as a `cdylib` it is loaded by the native integration tests; built
//! as an `rlib` it gives hosts the shared `Widget` and `Gadget` types.
//!
//! Exports:
//! - `MakeWidget`, `MakeGadget`: safe factories
//! - `MakeBrokenWidget`: factory that returns an error
//! - `MakeMissingWidget`: factory that returns nothing
//! - `MakeExplodingWidget`: factory that panics
//! - `dynbridge_demo_add`, `dynbridge_demo_live_widgets`: plain C functions

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use dynbridge_sdk::export_safe;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);
static LIVE_WIDGETS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
pub struct Widget {
    pub id: u32,
    pub name: String,
}

impl Widget {
    pub fn new(name: impl Into<String>) -> Self {
        LIVE_WIDGETS.fetch_add(1, Ordering::SeqCst);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            name: name.into(),
        }
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        LIVE_WIDGETS.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gadget {
    pub serial: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("widget config missing")]
    ConfigMissing,
}

pub fn make_widget() -> Box<Widget> {
    tracing::debug!("Creating widget");
    Box::new(Widget::new("gear"))
}

pub fn make_gadget() -> Box<Gadget> {
    Box::new(Gadget { serial: 0xD00D })
}

pub fn make_broken_widget() -> Result<Box<Widget>, DemoError> {
    Err(DemoError::ConfigMissing)
}

pub fn make_missing_widget() -> Option<Box<Widget>> {
    None
}

pub fn make_exploding_widget() -> Box<Widget> {
    panic!("widget press jammed")
}

export_safe!(make_widget as "MakeWidget");
export_safe!(make_gadget as "MakeGadget");
export_safe!(make_broken_widget as "MakeBrokenWidget");
export_safe!(make_missing_widget as "MakeMissingWidget");
export_safe!(make_exploding_widget as "MakeExplodingWidget");

#[no_mangle]
pub extern "C" fn dynbridge_demo_add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

/// Widgets created by this module and not yet destroyed.
#[no_mangle]
pub extern "C" fn dynbridge_demo_live_widgets() -> usize {
    LIVE_WIDGETS.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories() {
        let widget = make_widget();
        assert_eq!(widget.name, "gear");
        assert!(widget.id > 0);

        assert_eq!(make_gadget().serial, 0xD00D);
        assert!(make_missing_widget().is_none());
        assert_eq!(
            make_broken_widget().unwrap_err().to_string(),
            "widget config missing"
        );
    }

    #[test]
    fn test_add() {
        assert_eq!(dynbridge_demo_add(2, 3), 5);
        assert_eq!(dynbridge_demo_add(i32::MAX, 1), i32::MIN);
    }
}
