//! `Device:` blocks - enable lines only for matching endpoints.

use tracing::debug;

use resona_filters::Filter;

use crate::compiler::CompileContext;
use crate::factories::FilterFactory;

/// Gates everything after a `Device:` line on the endpoint match. While the
/// block is inactive this factory claims every line, so suppressed blocks
/// never reach the other factories (including `If`/`Eval`).
pub struct DeviceFactory {
    active: bool,
}

impl DeviceFactory {
    pub fn new() -> Self {
        DeviceFactory { active: true }
    }
}

impl FilterFactory for DeviceFactory {
    fn create(
        &mut self,
        ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key == "Device" {
            self.active = ctx.device.matches(value.trim());
            debug!(pattern = value.trim(), active = self.active, "device block");
            return Some(Vec::new());
        }

        if !self.active {
            // Swallow the suppressed block
            return Some(Vec::new());
        }

        None
    }
}
