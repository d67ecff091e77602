//! Directive factories.
//!
//! One factory per directive family, driven by the compiler in a fixed
//! registration order. A factory *claims* a line by returning
//! `Some(filters)` (possibly empty); `None` passes the line to the next
//! factory, and a line no factory claims is ignored. Registration order
//! matters: the structural factories (`Device`, `If`) come first so they can
//! swallow suppressed blocks before any other factory sees them.
//!
//! Factories are recreated for every compilation, so all the state they
//! carry (device match flags, `If` stacks, stage gates) is scoped to one
//! compile pass.

use std::path::Path;

use resona_filters::Filter;

use crate::compiler::CompileContext;

mod biquad;
mod channel;
mod condition;
mod copy;
mod delay;
mod device;
mod eval;
mod include;
mod iir;
mod parametric;
mod preamp;
mod stage;

/// A directive parser that converts `key: value` lines (or structural
/// events) into filter instances plus compiler-state updates.
pub trait FilterFactory {
    /// Called once before any file is read.
    fn start_of_configuration(&mut self, _ctx: &mut CompileContext) -> Vec<Box<dyn Filter>> {
        Vec::new()
    }

    /// Called when a file (root or include) starts.
    fn start_of_file(&mut self, _ctx: &mut CompileContext, _path: &Path) -> Vec<Box<dyn Filter>> {
        Vec::new()
    }

    /// Offered every `key: value` line. `None` = not claimed.
    fn create(
        &mut self,
        ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>>;

    /// Called when a file (root or include) ends.
    fn end_of_file(&mut self, _ctx: &mut CompileContext, _path: &Path) -> Vec<Box<dyn Filter>> {
        Vec::new()
    }

    /// Called once after every file has been read.
    fn end_of_configuration(&mut self, _ctx: &mut CompileContext) -> Vec<Box<dyn Filter>> {
        Vec::new()
    }
}

/// The factory set in registration order.
pub fn default_factories() -> Vec<Box<dyn FilterFactory>> {
    vec![
        Box::new(device::DeviceFactory::new()),
        Box::new(condition::ConditionFactory::new()),
        Box::new(eval::EvalFactory),
        Box::new(include::IncludeFactory),
        Box::new(stage::StageFactory::new()),
        Box::new(channel::ChannelFactory),
        Box::new(iir::IirFactory),
        Box::new(biquad::BiquadFactory),
        Box::new(parametric::ParametricFactory),
        Box::new(preamp::PreampFactory),
        Box::new(delay::DelayFactory),
        Box::new(copy::CopyFactory),
    ]
}

/// Parses a number, tolerating a decimal comma (configs written under
/// locales that use one).
pub(crate) fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    match token.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) if token.contains(',') => token.replace(',', ".").parse().ok(),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_parsing_accepts_decimal_comma() {
        assert_eq!(parse_number("1.5"), Some(1.5));
        assert_eq!(parse_number("1,5"), Some(1.5));
        assert_eq!(parse_number(" -6 "), Some(-6.0));
        assert_eq!(parse_number("x"), None);
    }

    #[test]
    fn registration_order_is_fixed() {
        // Twelve factories; Device must pre-empt everything else.
        assert_eq!(default_factories().len(), 12);
    }
}
