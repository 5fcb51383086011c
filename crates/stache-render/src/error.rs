//! Error types for template compilation and rendering.
//!
//! This module provides [`RenderError`], the primary error type for all rendering
//! operations, and [`CompileError`], which describes malformed template source.
//!
//! Missing variables and missing partials are never errors: they resolve to
//! empty output. Everything that *is* an error propagates to the caller of the
//! top-level render call without local recovery.

use thiserror::Error;

use crate::template::registry::RegistryError;

/// What went wrong while compiling template source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    /// A tag was opened but its closing delimiter never appeared.
    #[error("unclosed tag, expected `{expected}`")]
    UnclosedTag { expected: String },

    /// A section, inverted section, parent or block was never closed.
    #[error("unclosed section `{name}`")]
    UnclosedSection { name: String },

    /// A closing tag names a different section than the one that is open.
    #[error("closing tag `{found}` does not match open section `{expected}`")]
    MismatchedClose { expected: String, found: String },

    /// A closing tag appeared with no section open.
    #[error("unexpected closing tag `{name}`")]
    UnexpectedClose { name: String },

    /// A tag that requires a name was empty.
    #[error("empty tag name")]
    EmptyTag,

    /// A `{{=... ...=}}` tag could not be parsed.
    #[error("invalid set-delimiter tag `{content}`")]
    InvalidDelimiters { content: String },
}

/// A malformed template, reported with the 1-based line where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub line: usize,
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind, line: usize) -> Self {
        Self { kind, line }
    }
}

/// Error type for template rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template syntax error, surfaced before any rendering happens.
    #[error("template error in `{name}`: {source}")]
    Compile {
        name: String,
        #[source]
        source: CompileError,
    },

    /// A template requested by name (not as a partial) does not exist.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A lambda returned an error while being invoked.
    #[error("lambda failed: {0}")]
    Lambda(String),

    /// Partial or parent nesting went deeper than the configured limit.
    #[error("recursion limit of {limit} exceeded while including `{name}`")]
    RecursionLimit { name: String, limit: usize },

    /// Misuse of the context stack, such as popping more frames than were pushed.
    #[error("context error: {0}")]
    Context(String),

    /// Data could not be converted into template values.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Template registry failure (collisions, unreadable files).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// I/O error (e.g., reading a partial from disk).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Convenience constructor for errors raised inside lambdas.
    pub fn lambda(message: impl Into<String>) -> Self {
        RenderError::Lambda(message.into())
    }

    pub(crate) fn compile(name: impl Into<String>, source: CompileError) -> Self {
        RenderError::Compile {
            name: name.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}
