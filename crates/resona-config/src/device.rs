//! Device identity and `Device:` pattern matching.
//!
//! The host supplies the endpoint's name, connection and GUID before
//! `initialize`. A `Device:` directive carries a whitespace-separated
//! alternation of glob patterns; the block is enabled when any pattern
//! matches any of the device fields (or the direction word). Matching is
//! case-insensitive; `all` always matches.

/// Endpoint identity as reported by the host, plus the direction flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub is_capture: bool,
    pub device_name: String,
    pub connection_name: String,
    pub device_guid: String,
}

impl DeviceInfo {
    /// Whether a `Device:` pattern list enables the following block.
    pub fn matches(&self, patterns: &str) -> bool {
        let direction = if self.is_capture { "capture" } else { "playback" };
        let fields = [
            self.device_name.as_str(),
            self.connection_name.as_str(),
            self.device_guid.as_str(),
            direction,
        ];

        patterns.split_whitespace().any(|pattern| {
            pattern.eq_ignore_ascii_case("all")
                || fields.iter().any(|field| glob_match(pattern, field))
        })
    }
}

/// Case-insensitive glob with `*` (any run) and `?` (any one char).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().flat_map(|c| c.to_lowercase()).collect();
    let text: Vec<char> = text.chars().flat_map(|c| c.to_lowercase()).collect();
    glob_match_at(&pattern, &text)
}

fn glob_match_at(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => {
            // '*' consumes zero or more characters
            (0..=text.len()).any(|skip| glob_match_at(&pattern[1..], &text[skip..]))
        }
        Some('?') => !text.is_empty() && glob_match_at(&pattern[1..], &text[1..]),
        Some(&c) => text.first() == Some(&c) && glob_match_at(&pattern[1..], &text[1..]),
    }
}

/// Which processing stage the engine instance runs in. Derived from the
/// host's `set_lfx` / `set_device_info` calls; consumed by `Stage:` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StagePhase {
    /// Per-stream processing before the system mix (LFX).
    PreMix,
    /// Device-wide processing after the system mix (GFX).
    #[default]
    PostMix,
    /// Recording endpoints.
    Capture,
}

impl StagePhase {
    /// The token used by `Stage:` directives.
    pub fn label(self) -> &'static str {
        match self {
            StagePhase::PreMix => "pre-mix",
            StagePhase::PostMix => "post-mix",
            StagePhase::Capture => "capture",
        }
    }

    /// Phase for an engine given the host flags.
    pub fn from_flags(is_capture: bool, lfx: bool) -> Self {
        if is_capture {
            StagePhase::Capture
        } else if lfx {
            StagePhase::PreMix
        } else {
            StagePhase::PostMix
        }
    }
}
