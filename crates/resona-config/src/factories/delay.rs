//! `Delay:` - whole-sample or millisecond delay.
//!
//! `Delay: 480 samples` or `Delay: 10 ms`.

use tracing::warn;

use resona_filters::{DelayFilter, DelaySpec, Filter};

use crate::compiler::CompileContext;
use crate::factories::{FilterFactory, parse_number};

pub struct DelayFactory;

impl FilterFactory for DelayFactory {
    fn create(
        &mut self,
        _ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "Delay" {
            return None;
        }

        let tokens: Vec<&str> = value.split_whitespace().collect();
        let spec = match tokens.as_slice() {
            [number, unit] => parse_number(number).and_then(|v| {
                if v < 0.0 {
                    None
                } else if unit.eq_ignore_ascii_case("ms") {
                    Some(DelaySpec::Millis(v))
                } else if unit.eq_ignore_ascii_case("samples") || unit.eq_ignore_ascii_case("sample")
                {
                    Some(DelaySpec::Samples((v + 0.5) as usize))
                } else {
                    None
                }
            }),
            _ => None,
        };

        match spec {
            Some(spec) => Some(vec![Box::new(DelayFilter::new(spec))]),
            None => {
                warn!(value = value.trim(), "delay needs '<n> samples' or '<t> ms', skipped");
                Some(Vec::new())
            }
        }
    }
}
