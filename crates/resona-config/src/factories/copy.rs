//! `Copy:` - channel mixdown and routing.
//!
//! Each whitespace-separated token is one assignment
//! `target=w1*src1+w2*src2+...`; weights default to 1, may be negative, and
//! accept a `dB` suffix (`-6dB*L`). Bare numeric terms are constants.
//! Targets naming unknown lanes create them.
//!
//! ```text
//! Copy: L=R R=L
//! Copy: SUB=0.7*L+0.7*R
//! Copy: C=-6dB*L+-6dB*R
//! ```

use tracing::warn;

use resona_core::db_to_linear;
use resona_filters::{Assignment, CopyFilter, Filter, Term};

use crate::compiler::CompileContext;
use crate::factories::{FilterFactory, parse_number};

pub struct CopyFactory;

/// Splits an assignment right-hand side into signed terms. `+` and `-`
/// separate terms except after `*`, `e`/`E` (exponents) or another sign.
fn split_terms(rhs: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();

    for c in rhs.chars() {
        let boundary = (c == '+' || c == '-')
            && !current.is_empty()
            && !matches!(current.chars().last(), Some('*' | 'e' | 'E' | '+' | '-'));
        if boundary {
            terms.push(std::mem::take(&mut current));
            if c == '-' {
                current.push('-');
            }
        } else if c == '+' && current.is_empty() {
            // leading plus carries no information
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }
    terms
}

/// Parses a weight, with an optional `dB` suffix.
fn parse_weight(token: &str) -> Option<f32> {
    let token = token.trim();
    let db_prefix = token
        .len()
        .checked_sub(2)
        .and_then(|split| match (token.get(..split), token.get(split..)) {
            (Some(prefix), Some(suffix)) if suffix.eq_ignore_ascii_case("db") => Some(prefix),
            _ => None,
        });
    match db_prefix {
        Some(prefix) if !prefix.is_empty() => {
            parse_number(prefix).map(|db| db_to_linear(db) as f32)
        }
        _ => parse_number(token).map(|v| v as f32),
    }
}

fn parse_assignment(token: &str) -> Option<Assignment> {
    let (target, rhs) = token.split_once('=')?;
    let target = target.trim();
    if target.is_empty() || rhs.trim().is_empty() {
        return None;
    }

    let mut terms = Vec::new();
    let mut offset = 0.0f32;
    let mut saw_constant = false;

    for piece in split_terms(rhs.trim()) {
        if let Some((weight, source)) = piece.split_once('*') {
            let Some(weight) = parse_weight(weight) else {
                warn!(term = piece.as_str(), "unparseable copy weight, term dropped");
                continue;
            };
            if source.is_empty() {
                warn!(term = piece.as_str(), "copy term without source, dropped");
                continue;
            }
            terms.push(Term {
                weight,
                source: source.to_string(),
            });
        } else if let Some(constant) = parse_weight(&piece) {
            offset += constant;
            saw_constant = true;
        } else if let Some(source) = piece.strip_prefix('-') {
            terms.push(Term {
                weight: -1.0,
                source: source.to_string(),
            });
        } else {
            terms.push(Term {
                weight: 1.0,
                source: piece,
            });
        }
    }

    if terms.is_empty() && !saw_constant {
        return None;
    }

    Some(Assignment {
        target: target.to_string(),
        terms,
        offset,
    })
}

impl FilterFactory for CopyFactory {
    fn create(
        &mut self,
        _ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "Copy" {
            return None;
        }

        let mut assignments = Vec::new();
        for token in value.split_whitespace() {
            match parse_assignment(token) {
                Some(assignment) => assignments.push(assignment),
                None => warn!(token, "unparseable copy assignment, skipped"),
            }
        }

        if assignments.is_empty() {
            warn!(value = value.trim(), "copy directive without assignments, skipped");
            return Some(Vec::new());
        }

        Some(vec![Box::new(CopyFilter::new(assignments))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_signed_terms() {
        assert_eq!(split_terms("L+R"), vec!["L", "R"]);
        assert_eq!(split_terms("0.5*L+0.5*R"), vec!["0.5*L", "0.5*R"]);
        assert_eq!(split_terms("L-R"), vec!["L", "-R"]);
        assert_eq!(split_terms("-0.5*L"), vec!["-0.5*L"]);
        assert_eq!(split_terms("1e-3*L+R"), vec!["1e-3*L", "R"]);
        assert_eq!(split_terms("0.5*L+-0.5*R"), vec!["0.5*L", "-0.5*R"]);
    }

    #[test]
    fn parses_plain_routing() {
        let a = parse_assignment("R=L").unwrap();
        assert_eq!(a.target, "R");
        assert_eq!(a.terms, vec![Term { weight: 1.0, source: "L".into() }]);
        assert_eq!(a.offset, 0.0);
    }

    #[test]
    fn parses_weighted_sum() {
        let a = parse_assignment("SUB=0.7*L+0.7*R").unwrap();
        assert_eq!(a.terms.len(), 2);
        assert!((a.terms[0].weight - 0.7).abs() < 1e-6);
        assert_eq!(a.terms[1].source, "R");
    }

    #[test]
    fn parses_db_weight() {
        let a = parse_assignment("C=-6dB*L").unwrap();
        assert!((a.terms[0].weight - 0.501187).abs() < 1e-4);
    }

    #[test]
    fn parses_negated_source() {
        let a = parse_assignment("DIFF=L-R").unwrap();
        assert_eq!(a.terms[1].weight, -1.0);
        assert_eq!(a.terms[1].source, "R");
    }

    #[test]
    fn parses_constant_offset() {
        let a = parse_assignment("L=0.25").unwrap();
        assert!(a.terms.is_empty());
        assert_eq!(a.offset, 0.25);
    }

    #[test]
    fn zeroing_a_channel_is_valid() {
        let a = parse_assignment("L=0").unwrap();
        assert!(a.terms.is_empty());
        assert_eq!(a.offset, 0.0);
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_assignment("noequals").is_none());
        assert!(parse_assignment("=R").is_none());
        assert!(parse_assignment("L=").is_none());
    }
}
