//! Error types for xsdc
//!
//! This module defines all error types used throughout the library.
//! Every component is a pure function returning either a value or one of
//! these errors; there is no partial success and no implicit recovery.

use std::fmt;
use thiserror::Error;

/// Result type alias using xsdc Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsdc operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed schema structure
    #[error("schema parse error: {0}")]
    SchemaParse(#[from] SchemaParseError),

    /// A type/element/attribute reference unresolved after full
    /// import-graph traversal
    #[error("missing type: {0}")]
    MissingType(#[from] MissingTypeError),

    /// Requested root element absent from the schema during decode/encode
    #[error("element not found: {0}")]
    ElementNotFound(#[from] ElementNotFoundError),

    /// Resolved model differs after a build+reparse cycle (test harness)
    #[error("round-trip mismatch: {0}")]
    RoundTripMismatch(#[from] RoundTripMismatchError),

    /// Encoding error (value to XML conversion)
    #[error("encoding error: {0}")]
    Encode(String),

    /// Decoding error (XML to value conversion)
    #[error("decoding error: {0}")]
    Decode(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Malformed schema structure error
#[derive(Debug, Clone)]
pub struct SchemaParseError {
    /// Error message
    pub message: String,
    /// Local name of the offending node
    pub node: Option<String>,
    /// Location of the schema source, if known
    pub location: Option<String>,
}

impl SchemaParseError {
    /// Create a new schema parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            node: None,
            location: None,
        }
    }

    /// Set the offending node name
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Set the schema source location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for SchemaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref node) = self.node {
            write!(f, " (node '{}')", node)?;
        }

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaParseError {}

/// A reference that could not be resolved anywhere in the merged
/// import/include/redefine graph
#[derive(Debug, Clone)]
pub struct MissingTypeError {
    /// The unresolved name (as written in the schema, e.g. `ns:Foo`)
    pub name: String,
    /// The namespace or schema the name was expected to be found in
    pub expected_in: Option<String>,
    /// Kind of the reference (type, element, attribute, group, ...)
    pub kind: Option<String>,
}

impl MissingTypeError {
    /// Create a new missing type error
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_in: None,
            kind: None,
        }
    }

    /// Set the namespace/schema the reference was expected in
    pub fn expected_in(mut self, location: impl Into<String>) -> Self {
        self.expected_in = Some(location.into());
        self
    }

    /// Set the reference kind
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

impl fmt::Display for MissingTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(ref kind) => write!(f, "unresolved {} reference '{}'", kind, self.name)?,
            None => write!(f, "unresolved reference '{}'", self.name)?,
        }

        if let Some(ref expected) = self.expected_in {
            write!(f, ", expected in '{}'", expected)?;
        }

        Ok(())
    }
}

impl std::error::Error for MissingTypeError {}

/// Requested root element is not declared by the schema
#[derive(Debug, Clone)]
pub struct ElementNotFoundError {
    /// The element name that was requested
    pub name: String,
    /// Target namespace of the schema that was searched
    pub namespace: Option<String>,
}

impl ElementNotFoundError {
    /// Create a new element-not-found error
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Set the schema namespace that was searched
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl fmt::Display for ElementNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element '{}' is not declared", self.name)?;

        if let Some(ref ns) = self.namespace {
            write!(f, " in schema for namespace '{}'", ns)?;
        }

        Ok(())
    }
}

impl std::error::Error for ElementNotFoundError {}

/// Structural difference detected after a build+reparse cycle
///
/// Only produced by the comparison harness; production code paths never
/// construct this.
#[derive(Debug, Clone)]
pub struct RoundTripMismatchError {
    /// Human-readable description of the first difference found
    pub message: String,
    /// Category that differed (complexType, simpleType, element, ...)
    pub category: Option<String>,
}

impl RoundTripMismatchError {
    /// Create a new round-trip mismatch error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: None,
        }
    }

    /// Set the differing category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl fmt::Display for RoundTripMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref cat) = self.category {
            write!(f, " (category: {})", cat)?;
        }

        Ok(())
    }
}

impl std::error::Error for RoundTripMismatchError {}
