//! # xsdc
//!
//! A schema-driven XSD compiler: parses XML Schema documents into a typed
//! model, resolves references across the import/include/redefine graph,
//! rebuilds byte-stable schema text, and encodes/decodes instance
//! documents against the resolved model.
//!
//! ## Example
//!
//! ```rust,ignore
//! use xsdc::{codec, parser, resolver};
//!
//! // Parse and resolve a schema with no external references
//! let schema = parser::parse_schema_text(xsd_text)?;
//! let resolved = resolver::resolve_standalone(schema)?;
//!
//! // Decode an instance document into JSON
//! let value = codec::decode(&resolved, "Order", order_xml)?;
//!
//! // Encode it back
//! let xml = codec::encode_default(&resolved, "Order", &value)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod names;
pub mod namespaces;

// XML reading
pub mod nodes;

// Schema model
pub mod model;

// Compiler pipeline
pub mod builder;
pub mod parser;
pub mod resolver;

// Instance data conversion
pub mod codec;

// Resource loading
pub mod loaders;

// Testing support
pub mod comparison;

// Re-exports for convenience
pub use error::{Error, Result};
pub use model::{ResolvedSchema, Schema};

/// Version of the xsdc library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD namespace
pub const XSD_NAMESPACE: &str = namespaces::XSD_NAMESPACE;

/// XML namespace
pub const XML_NAMESPACE: &str = namespaces::XML_NAMESPACE;
