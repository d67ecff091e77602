//! `Eval:` - variable assignments for later directives.

use tracing::warn;

use resona_filters::Filter;

use crate::compiler::CompileContext;
use crate::factories::FilterFactory;

/// `Eval: name=expr; other=expr` binds parser variables. Emits no filters.
pub struct EvalFactory;

impl FilterFactory for EvalFactory {
    fn create(
        &mut self,
        ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "Eval" {
            return None;
        }
        if let Err(error) = ctx.eval_statements(value) {
            warn!(statements = value.trim(), %error, "Eval failed, directive skipped");
        }
        Some(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_context;
    use crate::expr::Value;
    use crate::store::{MemoryStore, NullStore};

    #[test]
    fn assignments_are_visible_to_later_lines() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = EvalFactory;

        assert!(factory.create(&mut ctx, "Eval", " gain = -3 * 2 ").is_some());
        assert_eq!(ctx.eval("gain").unwrap(), Value::Number(-6.0));
    }

    #[test]
    fn failed_statement_leaves_variable_unbound() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = EvalFactory;

        factory.create(&mut ctx, "Eval", "gain = 1 +");
        assert_eq!(ctx.eval("gain").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn store_reads_work_through_eval() {
        let store = MemoryStore::new();
        store.set("app", "boost", "4");
        let mut ctx = test_context(&store);
        let mut factory = EvalFactory;

        factory.create(&mut ctx, "Eval", "boost = RegistryValue(\"app\", \"boost\")");
        assert_eq!(ctx.eval("boost").unwrap(), Value::Str("4".into()));
    }
}
