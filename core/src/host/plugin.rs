//! Plugin boundary
//!
//! A plugin contributes native functions once, when the host is initialized,
//! and gets a look at every input event afterwards.

use serde::{Deserialize, Serialize};

use crate::script::NativeRegistry;

/// Input event forwarded from the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Key { code: u32, pressed: bool },
    Pointer { x: f64, y: f64, button: u8, pressed: bool },
    Gui { element: String, kind: String },
}

pub trait ScriptPlugin {
    fn name(&self) -> &str;

    /// Register this plugin's natives; called from `ScriptHost::init`
    fn register_functions(&mut self, natives: &mut NativeRegistry);

    /// Returns true if the plugin consumed the event
    fn on_event(&mut self, _event: &HostEvent) -> bool {
        false
    }
}
