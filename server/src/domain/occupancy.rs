//! Parsing the game server's `list` reply into a participant count.

use std::sync::LazyLock;

use regex::Regex;

/// Command that asks the game server who is connected.
pub const LIST_COMMAND: &str = "list";

/// Command that makes the game server save and exit.
pub const STOP_COMMAND: &str = "stop";

/// Matches both `There are 3 of a max of 20 players online` and the older
/// `There are 3/20 players online`.
static PLAYER_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)there (?:are|is) (\d+)\s*(?:/\s*\d+|of a max(?: of)? \d+)?\s*players? online")
        .expect("valid regex")
});

static ZERO_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)\bno players\b").expect("valid regex")
});

/// Formatting codes (`§6`) some servers embed in command output.
static FORMAT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"§.").expect("valid regex")
});

/// Result of one occupancy probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Players(u32),
    /// The reply carried neither a count nor a zero marker.
    Unrecognized,
}

impl Occupancy {
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let plain = FORMAT_CODE_RE.replace_all(output, "");
        if let Some(count) = PLAYER_COUNT_RE
            .captures(&plain)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            return Self::Players(count);
        }
        if ZERO_MARKER_RE.is_match(&plain) {
            return Self::Players(0);
        }
        Self::Unrecognized
    }

    /// Only an explicit zero counts as idle; an unreadable reply does not.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Players(0))
    }

    #[must_use]
    pub fn count(self) -> Option<u32> {
        match self {
            Self::Players(n) => Some(n),
            Self::Unrecognized => None,
        }
    }
}
