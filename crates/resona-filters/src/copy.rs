//! Copy kernel: channel mixdown and routing.
//!
//! Each assignment computes a weighted sum of source lanes (plus an optional
//! constant) into a target lane. Targets may name lanes that do not exist
//! yet; `initialize` reports them as new output channels and the compiler
//! extends the buffer pool.
//!
//! Aliasing contract: within one frame, every source read completes before
//! any target write. `Copy: L=R R=L` therefore swaps bit-exactly, and a
//! target that appears among its own sources reads its pre-assignment value.

use tracing::warn;

use crate::filter::{ChannelBuffer, Filter};

/// One weighted source term.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub weight: f32,
    pub source: String,
}

/// `target = w1*src1 + w2*src2 + ... + offset`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: String,
    pub terms: Vec<Term>,
    /// Sum of the bare numeric terms.
    pub offset: f32,
}

struct Row {
    /// Index of the target in the output binding.
    target: usize,
    /// (weight, index in the input binding)
    terms: Vec<(f32, usize)>,
    offset: f32,
}

/// Mixdown over the full lane set.
pub struct CopyFilter {
    assignments: Vec<Assignment>,
    rows: Vec<Row>,
    /// Per-frame staging for the computed targets, sized `rows.len()`.
    scratch: Vec<f32>,
}

impl CopyFilter {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        CopyFilter {
            assignments,
            rows: Vec::new(),
            scratch: Vec::new(),
        }
    }
}

impl Filter for CopyFilter {
    fn initialize(
        &mut self,
        _sample_rate: f64,
        _max_frames: usize,
        channels: &[String],
    ) -> Vec<String> {
        let mut outputs: Vec<String> = channels.to_vec();
        self.rows.clear();

        for assignment in &self.assignments {
            let target = match outputs.iter().position(|n| n == &assignment.target) {
                Some(idx) => idx,
                None => {
                    outputs.push(assignment.target.clone());
                    outputs.len() - 1
                }
            };

            let mut terms = Vec::with_capacity(assignment.terms.len());
            for term in &assignment.terms {
                match channels.iter().position(|n| n == &term.source) {
                    Some(idx) => terms.push((term.weight, idx)),
                    None => warn!(
                        source = %term.source,
                        target = %assignment.target,
                        "copy source channel does not exist, term dropped"
                    ),
                }
            }

            self.rows.push(Row {
                target,
                terms,
                offset: assignment.offset,
            });
        }

        self.scratch = vec![0.0; self.rows.len()];
        outputs
    }

    fn all_channels(&self) -> bool {
        true
    }

    fn process(
        &mut self,
        pool: &mut [ChannelBuffer],
        inputs: &[usize],
        outputs: &[usize],
        frames: usize,
    ) {
        for f in 0..frames {
            // All reads for this frame, then all writes
            for (row, value) in self.rows.iter().zip(self.scratch.iter_mut()) {
                let mut sum = row.offset;
                for &(weight, slot) in &row.terms {
                    sum += weight * pool[inputs[slot]][f];
                }
                *value = sum;
            }
            for (row, &value) in self.rows.iter().zip(self.scratch.iter()) {
                pool[outputs[row.target]][f] = value;
            }
        }
    }
}
