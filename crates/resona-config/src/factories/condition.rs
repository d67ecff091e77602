//! `If:` / `ElseIf:` / `Else:` / `EndIf:` blocks.
//!
//! Branch conditions run through the expression evaluator; a false (or
//! errored) condition suppresses every line until the next branch change at
//! the same depth. Blocks nest. An `If` opened inside an already-suppressed
//! region stays suppressed regardless of its condition.

use tracing::warn;

use resona_filters::Filter;

use crate::compiler::CompileContext;
use crate::factories::FilterFactory;

struct Branch {
    /// Lines in the current arm are being emitted.
    active: bool,
    /// Some arm of this block has already been taken.
    taken: bool,
}

pub struct ConditionFactory {
    stack: Vec<Branch>,
}

impl ConditionFactory {
    pub fn new() -> Self {
        ConditionFactory { stack: Vec::new() }
    }

    fn suppressed(&self) -> bool {
        self.stack.iter().any(|branch| !branch.active)
    }

    fn evaluate(ctx: &mut CompileContext, condition: &str) -> bool {
        match ctx.eval(condition) {
            Ok(value) => value.truthy(),
            Err(error) => {
                warn!(condition, %error, "If condition failed to evaluate, treated as false");
                false
            }
        }
    }
}

impl FilterFactory for ConditionFactory {
    fn create(
        &mut self,
        ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        match key {
            "If" => {
                if self.suppressed() {
                    // Parent is dead: never activate any arm of this block
                    self.stack.push(Branch {
                        active: false,
                        taken: true,
                    });
                } else {
                    let condition = Self::evaluate(ctx, value);
                    self.stack.push(Branch {
                        active: condition,
                        taken: condition,
                    });
                }
                Some(Vec::new())
            }
            "ElseIf" => {
                let parent_suppressed = self
                    .stack
                    .split_last()
                    .map(|(_, rest)| rest.iter().any(|b| !b.active))
                    .unwrap_or(false);
                match self.stack.last_mut() {
                    Some(branch) => {
                        if branch.taken || parent_suppressed {
                            branch.active = false;
                        } else {
                            branch.active = Self::evaluate(ctx, value);
                            branch.taken = branch.active;
                        }
                    }
                    None => warn!("ElseIf without matching If"),
                }
                Some(Vec::new())
            }
            "Else" => {
                match self.stack.last_mut() {
                    Some(branch) => {
                        branch.active = !branch.taken;
                        branch.taken = true;
                    }
                    None => warn!("Else without matching If"),
                }
                Some(Vec::new())
            }
            "EndIf" => {
                if self.stack.pop().is_none() {
                    warn!("EndIf without matching If");
                }
                Some(Vec::new())
            }
            _ if self.suppressed() => Some(Vec::new()),
            _ => None,
        }
    }

    fn end_of_configuration(&mut self, _ctx: &mut CompileContext) -> Vec<Box<dyn Filter>> {
        if !self.stack.is_empty() {
            warn!(depth = self.stack.len(), "If block not closed at end of configuration");
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_context;
    use crate::store::NullStore;

    fn passes(factory: &mut ConditionFactory, ctx: &mut CompileContext, key: &str) -> bool {
        factory.create(ctx, key, "").is_none()
    }

    #[test]
    fn false_branch_suppresses_until_endif() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ConditionFactory::new();

        factory.create(&mut ctx, "If", "0");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "EndIf", "");
        assert!(passes(&mut factory, &mut ctx, "Preamp"));
    }

    #[test]
    fn else_takes_untaken_branch() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ConditionFactory::new();

        factory.create(&mut ctx, "If", "1 > 2");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "Else", "");
        assert!(passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "EndIf", "");
    }

    #[test]
    fn elseif_chain_takes_first_true_arm_only() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ConditionFactory::new();

        factory.create(&mut ctx, "If", "0");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "ElseIf", "1");
        assert!(passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "ElseIf", "1");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "Else", "");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "EndIf", "");
    }

    #[test]
    fn nested_if_inside_suppressed_region_stays_dead() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ConditionFactory::new();

        factory.create(&mut ctx, "If", "0");
        factory.create(&mut ctx, "If", "1");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        // Even its Else must not resurrect the block
        factory.create(&mut ctx, "Else", "");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "EndIf", "");
        factory.create(&mut ctx, "EndIf", "");
        assert!(passes(&mut factory, &mut ctx, "Preamp"));
    }

    #[test]
    fn eval_variables_drive_conditions() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        ctx.eval_statements("bass_boost = 1").unwrap();
        let mut factory = ConditionFactory::new();

        factory.create(&mut ctx, "If", "bass_boost");
        assert!(passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "EndIf", "");
    }

    #[test]
    fn error_condition_is_false() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ConditionFactory::new();

        factory.create(&mut ctx, "If", "1 +");
        assert!(!passes(&mut factory, &mut ctx, "Preamp"));
        factory.create(&mut ctx, "EndIf", "");
    }
}
