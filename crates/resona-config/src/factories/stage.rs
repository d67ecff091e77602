//! `Stage:` - gate lines on the engine's processing phase.

use tracing::debug;

use resona_filters::Filter;

use crate::compiler::CompileContext;
use crate::factories::FilterFactory;

/// `Stage: pre-mix post-mix capture` enables the following lines when the
/// engine's phase is listed (`all` matches every phase). Before the first
/// `Stage:` line every phase is active. While inactive, this factory claims
/// all lines that reach it; note that it sits after `Eval`/`Include` in
/// registration order, so those still execute inside an inactive stage
/// block.
pub struct StageFactory {
    active: bool,
}

impl StageFactory {
    pub fn new() -> Self {
        StageFactory { active: true }
    }
}

impl FilterFactory for StageFactory {
    fn create(
        &mut self,
        ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key == "Stage" {
            let phase = ctx.phase.label();
            self.active = value
                .split_whitespace()
                .any(|token| token.eq_ignore_ascii_case("all") || token.eq_ignore_ascii_case(phase));
            debug!(stages = value.trim(), phase, active = self.active, "stage block");
            return Some(Vec::new());
        }

        if !self.active {
            return Some(Vec::new());
        }

        None
    }
}
