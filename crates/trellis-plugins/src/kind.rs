//! Closed enumeration of plugin kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Registered plugin categories, one per calling convention.
///
/// `init` is deliberately absent: it is a request kind that bypasses the
/// registry and returns the manifest, not a category a plugin can register
/// under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// Named function invoked with positional or keyword arguments.
    Op,
    /// Zero-argument request handler.
    Handler,
    /// Record lifecycle hook invoked inside a transaction scope.
    Hook,
    /// Zero-argument scheduled task.
    Timer,
    /// Action provider with a single action-handling entry point.
    Provider,
}

impl PluginKind {
    /// Parses a wire kind tag. Tags are exact and lowercase.
    ///
    /// Returns `None` for unrecognised tags so callers can surface their
    /// own structured error naming the offending value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "op" => Some(Self::Op),
            "handler" => Some(Self::Handler),
            "hook" => Some(Self::Hook),
            "timer" => Some(Self::Timer),
            "provider" => Some(Self::Provider),
            _ => None,
        }
    }

    /// Returns the canonical wire tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Op => "op",
            Self::Handler => "handler",
            Self::Hook => "hook",
            Self::Timer => "timer",
            Self::Provider => "provider",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("op", PluginKind::Op)]
    #[case("handler", PluginKind::Handler)]
    #[case("hook", PluginKind::Hook)]
    #[case("timer", PluginKind::Timer)]
    #[case("provider", PluginKind::Provider)]
    fn parses_every_wire_tag(#[case] tag: &str, #[case] expected: PluginKind) {
        assert_eq!(PluginKind::parse(tag), Some(expected));
        assert_eq!(expected.as_str(), tag);
    }

    #[rstest]
    #[case("init")]
    #[case("Op")]
    #[case("bogus")]
    fn rejects_unknown_and_mixed_case_tags(#[case] tag: &str) {
        assert_eq!(PluginKind::parse(tag), None);
    }

    #[test]
    fn display_matches_wire_tag() {
        assert_eq!(PluginKind::Hook.to_string(), "hook");
    }

    #[test]
    fn serializes_as_snake_case_tag() {
        let encoded = serde_json::to_string(&PluginKind::Provider).expect("serialize kind");
        assert_eq!(encoded, r#""provider""#);
    }
}
