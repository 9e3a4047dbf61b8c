//! Error types for cislink
//!
//! Defines all error types used throughout the library. Every error is
//! fatal: nothing here is retried, and a map is either fully built or not
//! returned at all.

use thiserror::Error;

use crate::formats::bed::BedParseError;

/// Main error type for cislink operations
#[derive(Debug, Error)]
pub enum LinkMapError {
    /// Invalid filter configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Malformed link file record
    #[error("Parse error: {0}")]
    Parse(#[from] LinkParseError),

    /// Regulatory graph invariant violation
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Lazily evaluated link property failed
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// BED parsing errors
    #[error("BED error: {0}")]
    Bed(#[from] BedParseError),

    /// A finalized filter run cannot accept further links
    #[error("Link filter run is already finalized")]
    Finalized,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors detected while building a link filter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Signed and absolute correlation floors are mutually exclusive
    #[error("Cannot use both a correlation and an absolute correlation threshold")]
    ConflictingCorrelationThresholds,

    /// Link type name not recognized
    #[error("Unknown link type: {0}")]
    UnknownLinkType(String),

    /// A distance threshold was negative
    #[error("Invalid {name}: {value} (must be non-negative)")]
    NegativeDistance { name: &'static str, value: i64 },

    /// A score threshold was not a number
    #[error("Invalid {name}: threshold must not be NaN")]
    NanThreshold { name: &'static str },
}

/// Errors that can occur while parsing a link file record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkParseError {
    /// Wrong number of tab-separated fields
    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Failed to parse a numeric field
    #[error("Line {line}: invalid {field} value '{value}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Locus key is not `chr:start-end`
    #[error("Line {line}: invalid locus key '{key}'")]
    InvalidLocusKey { line: usize, key: String },

    /// Line is not valid UTF-8
    #[error("Line {line}: invalid UTF-8")]
    InvalidUtf8 { line: usize },
}

/// Errors raised by regulatory graph construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The same locus-TSS pair was inserted twice into one adjacency map
    #[error("Duplicate Locus-TSS link {locus}-{tss} in map")]
    DuplicateLink { tss: String, locus: String },
}

/// Errors raised when an interval is constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("Interval {chrom}:{start}-{end} ends before it starts")]
    Reversed { chrom: String, start: i64, end: i64 },
}

/// Errors raised when a derived link property is evaluated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Position-dependent property needs a '+' or '-' strand
    #[error("Missing strand in link data for {tss}-{locus} (strand '{strand}')")]
    MissingStrand {
        tss: String,
        locus: String,
        strand: String,
    },

    /// Locus key could not be parsed as `chr:start-end`
    #[error("Invalid locus key '{0}': expected chr:start-end")]
    InvalidLocusKey(String),
}

/// Result type alias for cislink operations
pub type Result<T> = std::result::Result<T, LinkMapError>;

/// Result type alias for link record parsing
pub type ParseResult<T> = std::result::Result<T, LinkParseError>;

/// Result type alias for graph construction
pub type GraphResult<T> = std::result::Result<T, GraphError>;
