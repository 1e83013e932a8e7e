//! Error types for objql.

use sqlparser::parser::ParserError;
use sqlparser::tokenizer::TokenizerError;
use thiserror::Error;

/// Broad category of a compilation failure.
///
/// Every category is fatal and non-retryable: the caller has to change the
/// query text before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The text does not parse as the shared grammar.
    Syntax,
    /// A recognized construct has no object-query meaning.
    Unsupported,
    /// Valid syntax that violates object-model rules.
    Semantic,
    /// A reference resolves to more than one registered alias.
    Ambiguity,
    /// Caller-supplied hints or settings are invalid.
    Configuration,
}

/// The main error type for query compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParserError),

    #[error("Tokenizer error: {0}")]
    Tokenize(#[from] TokenizerError),

    #[error("Empty query")]
    EmptyStatement,

    #[error("Expected a single statement, found {0}")]
    MultipleStatements(usize),

    /// A grammar node with no object-query equivalent.
    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    #[error("INSERT is not supported by the object query language")]
    InsertNotSupported,

    #[error("Missing alias for entity '{entity}'")]
    MissingAlias { entity: String },

    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("Unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("Alias '{0}' is already defined")]
    DuplicateAlias(String),

    #[error("Join through '{entity}.{field}' requires single-column keys; composite keys are not supported")]
    CompositeKeyJoin { entity: String, field: String },

    #[error("Embedded field '{0}' cannot be the target of an assignment")]
    EmbeddedAssignment(String),

    #[error("Named and positional parameters cannot be mixed (found '{0}')")]
    MixedParameters(String),

    #[error("Collection-valued path '{0}' cannot be used here")]
    CollectionPath(String),

    #[error("Path '{0}' requires a join, which is not allowed in {1}")]
    JoinNotAllowed(String, &'static str),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Ambiguous reference '{expr}': {candidates} candidates")]
    Ambiguous { expr: String, candidates: usize },

    #[error("Invalid value '{value}' for hint '{key}'")]
    InvalidHint { key: String, value: String },
}

impl CompileError {
    /// Create an unsupported-construct error.
    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::Unsupported(construct.into())
    }

    /// Create an invalid-path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown-field error.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::Syntax(_) | Self::Tokenize(_) | Self::EmptyStatement | Self::MultipleStatements(_) => {
                RejectionKind::Syntax
            }
            Self::Unsupported(_) | Self::InsertNotSupported => RejectionKind::Unsupported,
            Self::MissingAlias { .. }
            | Self::UnknownEntity(_)
            | Self::UnknownField { .. }
            | Self::UnknownIdentifier(_)
            | Self::DuplicateAlias(_)
            | Self::CompositeKeyJoin { .. }
            | Self::EmbeddedAssignment(_)
            | Self::MixedParameters(_)
            | Self::CollectionPath(_)
            | Self::JoinNotAllowed(..)
            | Self::InvalidPath { .. } => RejectionKind::Semantic,
            Self::Ambiguous { .. } => RejectionKind::Ambiguity,
            Self::InvalidHint { .. } => RejectionKind::Configuration,
        }
    }
}

/// Result type alias for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors raised while loading or validating an entity catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid entity '{entity}': {message}")]
    Invalid { entity: String, message: String },
}

impl CatalogError {
    pub fn invalid(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while loading compiler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
