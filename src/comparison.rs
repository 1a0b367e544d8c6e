//! Structural schema comparison
//!
//! Reduces a [`Schema`] to a summary of its named entities so two schemas
//! can be checked for structural equivalence without comparing text. This
//! is what backs the round-trip guarantees: rebuilt schema text must parse
//! to the same summary as its source.

use crate::builder::{build, BuildOptions};
use crate::error::{Error, Result, RoundTripMismatchError};
use crate::model::Schema;
use crate::parser::parse_schema_text;
use serde::{Deserialize, Serialize};

/// Named-entity summary of a schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaSummary {
    /// Target namespace of the schema
    pub target_namespace: Option<String>,

    /// Names of top-level complex types, in declaration order
    pub complex_types: Vec<String>,

    /// Names of top-level simple types, in declaration order
    pub simple_types: Vec<String>,

    /// Names of top-level elements, in declaration order
    pub elements: Vec<String>,

    /// Names of top-level attributes, in declaration order
    pub attributes: Vec<String>,

    /// Names of named model groups, in declaration order
    pub groups: Vec<String>,

    /// Names of named attribute groups, in declaration order
    pub attribute_groups: Vec<String>,

    /// Number of import/include/redefine/override directives
    pub directives: usize,
}

impl SchemaSummary {
    /// Summarize a schema's named entities
    pub fn of(schema: &Schema) -> Self {
        Self {
            target_namespace: schema.target_namespace.clone(),
            complex_types: schema
                .complex_types
                .iter()
                .filter_map(|ct| ct.name.clone())
                .collect(),
            simple_types: schema
                .simple_types
                .iter()
                .filter_map(|st| st.name.clone())
                .collect(),
            elements: schema
                .elements
                .iter()
                .filter_map(|e| e.name.clone())
                .collect(),
            attributes: schema
                .attributes
                .iter()
                .filter_map(|a| a.name.clone())
                .collect(),
            groups: schema.groups.iter().map(|g| g.name.clone()).collect(),
            attribute_groups: schema
                .attribute_groups
                .iter()
                .map(|g| g.name.clone())
                .collect(),
            directives: schema.directives.len(),
        }
    }

    /// Total number of named entities in the summary
    pub fn entity_count(&self) -> usize {
        self.complex_types.len()
            + self.simple_types.len()
            + self.elements.len()
            + self.attributes.len()
            + self.groups.len()
            + self.attribute_groups.len()
    }
}

/// Check two schemas for structural equivalence
///
/// Reports the first category that differs.
pub fn compare_schemas(left: &Schema, right: &Schema) -> Result<()> {
    let a = SchemaSummary::of(left);
    let b = SchemaSummary::of(right);

    if a.target_namespace != b.target_namespace {
        return Err(mismatch(
            "targetNamespace",
            &format!("{:?}", a.target_namespace),
            &format!("{:?}", b.target_namespace),
        ));
    }

    let categories: [(&str, &[String], &[String]); 6] = [
        ("complexType", &a.complex_types, &b.complex_types),
        ("simpleType", &a.simple_types, &b.simple_types),
        ("element", &a.elements, &b.elements),
        ("attribute", &a.attributes, &b.attributes),
        ("group", &a.groups, &b.groups),
        ("attributeGroup", &a.attribute_groups, &b.attribute_groups),
    ];
    for (category, left_names, right_names) in categories {
        if left_names != right_names {
            return Err(mismatch(
                category,
                &left_names.join(", "),
                &right_names.join(", "),
            ));
        }
    }

    if a.directives != b.directives {
        return Err(mismatch(
            "directive",
            &a.directives.to_string(),
            &b.directives.to_string(),
        ));
    }

    Ok(())
}

fn mismatch(category: &str, left: &str, right: &str) -> Error {
    Error::RoundTripMismatch(
        RoundTripMismatchError::new(format!(
            "Schemas differ in {}: [{}] vs [{}]",
            category, left, right
        ))
        .with_category(category.to_string()),
    )
}

/// Verify the round-trip properties for a schema document
///
/// Checks that rebuilt text parses to a structurally equivalent schema and
/// that a second build of the reparsed schema is byte-identical to the
/// first.
pub fn check_round_trip(xsd: &str) -> Result<()> {
    let options = BuildOptions::default();

    let schema = parse_schema_text(xsd)?;
    let once = build(&schema, &options)?;
    let reparsed = parse_schema_text(&once)?;

    compare_schemas(&schema, &reparsed)?;

    let twice = build(&reparsed, &options)?;
    if once != twice {
        return Err(Error::RoundTripMismatch(RoundTripMismatchError::new(
            "Rebuilt schema text is not byte-stable across a parse/build cycle",
        )));
    }

    Ok(())
}
