//! Compile-time configuration, deserializable from the caller's own config.

use serde::Deserialize;

/// What to do with a tag the schema has never heard of and that doesn't
/// parse as a numeric literal either.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum UnknownTagPolicy {
    /// Fail compilation with `FilterError::Name` (the default).
    #[default]
    Error,
    /// Log a warning and treat the tag as always-missing, so the
    /// expression still compiles and simply never contributes a pass.
    WarnAndMissing,
}

/// Compile-time knobs for [`crate::parse`].
///
/// Deliberately small: the component is a library collaborator, not a
/// standalone binary, so there's no ambient global configuration to load.
/// Callers embedding this crate can still deserialize one of these out of
/// their own TOML/JSON configuration alongside the expression text.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct CompileOptions {
    #[serde(default)]
    pub unknown_tag: UnknownTagPolicy,
}
