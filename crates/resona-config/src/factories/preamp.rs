//! `Preamp:` - constant gain, in dB or as a linear factor.
//!
//! `Preamp: -6 dB` or `Preamp: -6dB` applies decibels; a bare number
//! (`Preamp: 0.5`) is a linear factor.

use tracing::warn;

use resona_filters::{Filter, PreampFilter};

use crate::compiler::CompileContext;
use crate::factories::{FilterFactory, parse_number};

pub struct PreampFactory;

impl FilterFactory for PreampFactory {
    fn create(
        &mut self,
        _ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "Preamp" {
            return None;
        }

        let tokens: Vec<&str> = value.split_whitespace().collect();
        let filter = match tokens.as_slice() {
            [number] => {
                if let Some(db_part) = strip_db_suffix(number) {
                    parse_number(db_part).map(PreampFilter::from_db)
                } else {
                    parse_number(number).map(|v| PreampFilter::from_linear(v as f32))
                }
            }
            [number, unit] if unit.eq_ignore_ascii_case("db") => {
                parse_number(number).map(PreampFilter::from_db)
            }
            _ => None,
        };

        match filter {
            Some(filter) => Some(vec![Box::new(filter)]),
            None => {
                warn!(value = value.trim(), "unparseable preamp value, skipped");
                Some(Vec::new())
            }
        }
    }
}

fn strip_db_suffix(token: &str) -> Option<&str> {
    if token.len() <= 2 {
        return None;
    }
    let split = token.len() - 2;
    match (token.get(..split), token.get(split..)) {
        (Some(prefix), Some(suffix)) if suffix.eq_ignore_ascii_case("db") => Some(prefix),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_context;
    use crate::store::NullStore;

    fn emit(value: &str) -> Vec<Box<dyn Filter>> {
        let store = NullStore;
        let mut ctx = test_context(&store);
        PreampFactory.create(&mut ctx, "Preamp", value).unwrap()
    }

    #[test]
    fn db_forms() {
        assert_eq!(emit(" -6 dB").len(), 1);
        assert_eq!(emit("-6dB").len(), 1);
        assert_eq!(emit("3.5 DB").len(), 1);
    }

    #[test]
    fn linear_form() {
        assert_eq!(emit("0.5").len(), 1);
    }

    #[test]
    fn garbage_is_skipped() {
        assert!(emit("loud").is_empty());
        assert!(emit("-6 dB extra").is_empty());
        assert!(emit("").is_empty());
    }

    #[test]
    fn other_keys_pass() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        assert!(PreampFactory.create(&mut ctx, "Delay", "1 ms").is_none());
    }
}
