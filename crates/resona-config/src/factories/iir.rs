//! `IIR:` - arbitrary-order filter from raw coefficients.
//!
//! Syntax: `IIR: <b0> <b1> ... / <a0> <a1> ...` with whitespace-separated
//! coefficients, numerator before the slash.

use tracing::warn;

use resona_filters::{Filter, IirFilter};

use crate::compiler::CompileContext;
use crate::factories::{FilterFactory, parse_number};

pub struct IirFactory;

fn parse_coefficients(list: &str) -> Option<Vec<f64>> {
    let values: Vec<f64> = list
        .split_whitespace()
        .map(parse_number)
        .collect::<Option<_>>()?;
    if values.is_empty() { None } else { Some(values) }
}

impl FilterFactory for IirFactory {
    fn create(
        &mut self,
        _ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "IIR" {
            return None;
        }

        let Some((numerator, denominator)) = value.split_once('/') else {
            warn!(value = value.trim(), "IIR needs 'b... / a...' coefficient lists, skipped");
            return Some(Vec::new());
        };

        let (Some(b), Some(a)) = (parse_coefficients(numerator), parse_coefficients(denominator))
        else {
            warn!(value = value.trim(), "unparseable IIR coefficients, skipped");
            return Some(Vec::new());
        };

        if a[0] == 0.0 {
            warn!("IIR a0 coefficient must be non-zero, skipped");
            return Some(Vec::new());
        }

        Some(vec![Box::new(IirFilter::new(b, a))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_context;
    use crate::store::NullStore;

    #[test]
    fn parses_coefficient_lists() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = IirFactory;

        let filters = factory
            .create(&mut ctx, "IIR", " 0.5 0.5 / 1.0 -0.2 ")
            .unwrap();
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn rejects_malformed_input() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = IirFactory;

        assert!(factory.create(&mut ctx, "IIR", "0.5 0.5").unwrap().is_empty());
        assert!(factory.create(&mut ctx, "IIR", "x / 1").unwrap().is_empty());
        assert!(factory.create(&mut ctx, "IIR", "1 / 0 1").unwrap().is_empty());
        assert!(factory.create(&mut ctx, "IIR", " / 1").unwrap().is_empty());
    }

    #[test]
    fn other_keys_pass_through() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        assert!(IirFactory.create(&mut ctx, "BiQuad", "1 0 0 0 0").is_none());
    }
}
