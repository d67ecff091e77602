//! `Filter n:` - parametric EQ directives.
//!
//! Syntax (the usual parametric-EQ interchange form):
//!
//! ```text
//! Filter 1: ON PK Fc 1000 Hz Gain 6 dB Q 1.0
//! Filter 2: ON LS Fc 120 Hz Gain 4 dB
//! Filter 3: ON HPQ Fc 60 Hz Q 0.5
//! Filter 4: ON NO Fc 50 Hz
//! Filter 5: ON PK Fc 300 Hz Gain -3 dB BW Oct 0.5
//! ```
//!
//! `OFF` (or type `None`) emits nothing. `LP`/`HP`/`LS`/`HS` use their
//! fixed default widths; the `*Q`/`*C` variants take an explicit `Q`.

use resona_core::FilterShape;
use resona_filters::{BiquadFilter, BiquadSpec, Filter};
use tracing::warn;

use crate::compiler::CompileContext;
use crate::factories::{FilterFactory, parse_number};

pub struct ParametricFactory;

/// `Filter`, `Filter 1`, `Filter12`, ... (digits and spaces after the word).
fn is_filter_key(key: &str) -> bool {
    key.strip_prefix("Filter").is_some_and(|rest| {
        rest.chars().all(|c| c.is_ascii_digit() || c == ' ')
    })
}

/// (shape, takes an explicit Q)
fn shape_for(token: &str) -> Option<(FilterShape, bool)> {
    Some(match token {
        "PK" | "PEQ" | "Modal" => (FilterShape::Peaking, true),
        "LP" => (FilterShape::Lowpass, false),
        "HP" => (FilterShape::Highpass, false),
        "LPQ" => (FilterShape::Lowpass, true),
        "HPQ" => (FilterShape::Highpass, true),
        "BP" => (FilterShape::Bandpass, true),
        "NO" => (FilterShape::Notch, true),
        "AP" => (FilterShape::Allpass, true),
        "LS" => (FilterShape::LowShelf, false),
        "HS" => (FilterShape::HighShelf, false),
        "LSC" => (FilterShape::LowShelf, true),
        "HSC" => (FilterShape::HighShelf, true),
        _ => return None,
    })
}

impl FilterFactory for ParametricFactory {
    fn create(
        &mut self,
        _ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if !is_filter_key(key) {
            return None;
        }

        let tokens: Vec<&str> = value.split_whitespace().collect();
        let mut index = 0;

        match tokens.first() {
            Some(&"ON") => index = 1,
            Some(&"OFF") | Some(&"None") | None => return Some(Vec::new()),
            Some(_) => {} // tolerate a missing ON
        }

        let Some((shape, explicit_q)) = tokens.get(index).and_then(|t| shape_for(t)) else {
            warn!(key, value = value.trim(), "unknown parametric filter type, skipped");
            return Some(Vec::new());
        };
        index += 1;

        let mut freq = None;
        let mut gain_db = 0.0;
        let mut q = None;
        let mut bandwidth = None;

        while index < tokens.len() {
            match tokens[index] {
                "Fc" => {
                    let Some(v) = tokens.get(index + 1).and_then(|t| parse_number(t)) else {
                        warn!(key, "Fc needs a frequency, directive skipped");
                        return Some(Vec::new());
                    };
                    freq = Some(v);
                    index += 2;
                    if tokens.get(index).is_some_and(|t| t.eq_ignore_ascii_case("hz")) {
                        index += 1;
                    }
                }
                "Gain" => {
                    let Some(v) = tokens.get(index + 1).and_then(|t| parse_number(t)) else {
                        warn!(key, "Gain needs a value, directive skipped");
                        return Some(Vec::new());
                    };
                    gain_db = v;
                    index += 2;
                    if tokens.get(index).is_some_and(|t| t.eq_ignore_ascii_case("db")) {
                        index += 1;
                    }
                }
                "Q" => {
                    let Some(v) = tokens.get(index + 1).and_then(|t| parse_number(t)) else {
                        warn!(key, "Q needs a value, directive skipped");
                        return Some(Vec::new());
                    };
                    q = Some(v);
                    index += 2;
                }
                "BW" => {
                    // "BW Oct <v>"
                    let mut next = index + 1;
                    if tokens.get(next).is_some_and(|t| t.eq_ignore_ascii_case("oct")) {
                        next += 1;
                    }
                    let Some(v) = tokens.get(next).and_then(|t| parse_number(t)) else {
                        warn!(key, "BW needs a value, directive skipped");
                        return Some(Vec::new());
                    };
                    bandwidth = Some(v);
                    index = next + 1;
                }
                other => {
                    warn!(key, token = other, "unrecognized token in filter directive, ignored");
                    index += 1;
                }
            }
        }

        let Some(freq) = freq else {
            warn!(key, "filter directive without Fc, skipped");
            return Some(Vec::new());
        };

        let spec = BiquadSpec::Parametric {
            shape,
            freq,
            q: if explicit_q { q } else { None },
            bandwidth: if explicit_q { bandwidth } else { None },
            gain_db,
        };
        Some(vec![Box::new(BiquadFilter::new(spec))])
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
        ParametricFactory.create(&mut ctx, "Filter 1", value).unwrap()
    }

    #[test]
    fn filter_key_matching() {
        assert!(is_filter_key("Filter"));
        assert!(is_filter_key("Filter 1"));
        assert!(is_filter_key("Filter12"));
        assert!(!is_filter_key("FilterBank"));
        assert!(!is_filter_key("Preamp"));
    }

    #[test]
    fn peaking_directive() {
        assert_eq!(emit("ON PK Fc 1000 Hz Gain 6 dB Q 1.0").len(), 1);
    }

    #[test]
    fn off_and_none_emit_nothing() {
        assert!(emit("OFF PK Fc 1000 Hz").is_empty());
        assert!(emit("ON None").is_empty());
        assert!(emit("").is_empty());
    }

    #[test]
    fn missing_fc_is_skipped() {
        assert!(emit("ON PK Gain 6 dB").is_empty());
    }

    #[test]
    fn unknown_type_is_skipped() {
        assert!(emit("ON XYZ Fc 100 Hz").is_empty());
    }

    #[test]
    fn shelf_without_q() {
        assert_eq!(emit("ON LS Fc 120 Hz Gain 4 dB").len(), 1);
        assert_eq!(emit("ON HSC Fc 8000 Hz Gain -3 dB Q 0.9").len(), 1);
    }

    #[test]
    fn bandwidth_form() {
        assert_eq!(emit("ON PK Fc 300 Hz Gain -3 dB BW Oct 0.5").len(), 1);
    }

    #[test]
    fn tolerates_missing_on() {
        assert_eq!(emit("PK Fc 1000 Hz Gain 6 dB Q 1.0").len(), 1);
    }
}
