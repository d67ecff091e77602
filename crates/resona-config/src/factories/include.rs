//! `Include:` - splice another configuration file.

use tracing::warn;

use resona_filters::Filter;

use crate::compiler::CompileContext;
use crate::factories::FilterFactory;

/// Queues the include for the compiler, which recurses after the current
/// line and restores the channel selection when the file ends.
pub struct IncludeFactory;

impl FilterFactory for IncludeFactory {
    fn create(
        &mut self,
        ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "Include" {
            return None;
        }
        let path = value.trim();
        if path.is_empty() {
            warn!("Include without a path, skipped");
        } else {
            ctx.request_include(path);
        }
        Some(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::test_context;
    use crate::store::NullStore;

    #[test]
    fn queues_trimmed_path() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = IncludeFactory;

        assert!(factory.create(&mut ctx, "Include", "  sub/extra.txt  ").is_some());
        assert_eq!(ctx.take_pending_include().as_deref(), Some("sub/extra.txt"));
    }

    #[test]
    fn empty_path_is_dropped() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = IncludeFactory;

        factory.create(&mut ctx, "Include", "   ");
        assert_eq!(ctx.take_pending_include(), None);
    }
}
