//! `Channel:` - set the selection for subsequent filter directives.

use tracing::warn;

use resona_filters::Filter;

use crate::compiler::CompileContext;
use crate::factories::FilterFactory;

/// `Channel: L R` selects lanes by name; `Channel: all` resets to every
/// lane. Unknown names are logged and skipped; if nothing valid remains the
/// previous selection stays in effect.
pub struct ChannelFactory;

impl FilterFactory for ChannelFactory {
    fn create(
        &mut self,
        ctx: &mut CompileContext,
        key: &str,
        value: &str,
    ) -> Option<Vec<Box<dyn Filter>>> {
        if key != "Channel" {
            return None;
        }

        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            ctx.select_all();
            return Some(Vec::new());
        }

        let mut names = Vec::new();
        for token in value.split_whitespace() {
            if ctx.all_channel_names.iter().any(|n| n == token) {
                names.push(token.to_string());
            } else {
                warn!(channel = token, "unknown channel name in selection, skipped");
            }
        }

        if names.is_empty() {
            warn!(selection = value, "no valid channels in selection, keeping previous");
        } else {
            ctx.selection = names;
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
    fn selects_named_lanes() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ChannelFactory;

        factory.create(&mut ctx, "Channel", " L ");
        assert_eq!(ctx.selection, vec!["L"]);

        factory.create(&mut ctx, "Channel", "all");
        assert_eq!(ctx.selection, vec!["L", "R"]);
    }

    #[test]
    fn unknown_names_are_skipped() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ChannelFactory;

        factory.create(&mut ctx, "Channel", "R SUB");
        assert_eq!(ctx.selection, vec!["R"]);
    }

    #[test]
    fn fully_invalid_selection_is_kept_previous() {
        let store = NullStore;
        let mut ctx = test_context(&store);
        let mut factory = ChannelFactory;

        factory.create(&mut ctx, "Channel", "L");
        factory.create(&mut ctx, "Channel", "SUB C");
        assert_eq!(ctx.selection, vec!["L"]);
    }
}
