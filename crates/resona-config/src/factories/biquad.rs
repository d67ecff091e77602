//! `BiQuad:` - raw normalized biquad coefficients.
//!
//! Syntax: `BiQuad: <b0> <b1> <b2> <a1> <a2>` (already normalized by a0).

use tracing::warn;

use resona_core::BiquadCoeffs;
use resona_filters::{BiquadFilter, BiquadSpec, Filter};

use crate::compiler::CompileContext;
use crate::factories::{FilterFactory, parse_number};

pub struct BiquadFactory;

impl FilterFactory for BiquadFactory {
    fn create(
        &mut self,
        _ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "BiQuad" {
            return None;
        }

        let values: Option<Vec<f64>> = value.split_whitespace().map(parse_number).collect();
        let coefficients = match values {
            Some(ref v) if v.len() == 5 => BiquadCoeffs {
                b0: v[0],
                b1: v[1],
                b2: v[2],
                a1: v[3],
                a2: v[4],
            },
            _ => {
                warn!(
                    value = value.trim(),
                    "BiQuad needs five coefficients 'b0 b1 b2 a1 a2', skipped"
                );
                return Some(Vec::new());
            }
        };

        Some(vec![Box::new(BiquadFilter::new(BiquadSpec::Raw(
            coefficients,
        )))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_context;
    use crate::store::NullStore;

    #[test]
    fn parses_five_coefficients() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let filters = BiquadFactory
            .create(&mut ctx, "BiQuad", "0.5 0.1 0.0 -0.2 0.0")
            .unwrap();
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn wrong_arity_is_skipped() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        assert!(BiquadFactory.create(&mut ctx, "BiQuad", "1 2 3").unwrap().is_empty());
        assert!(BiquadFactory.create(&mut ctx, "BiQuad", "1 2 3 4 5 6").unwrap().is_empty());
        assert!(BiquadFactory.create(&mut ctx, "BiQuad", "").unwrap().is_empty());
    }
}
