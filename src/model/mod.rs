//! The canonical schema data model
//!
//! Immutable after construction: the parser and resolver build these values
//! and nothing mutates them afterwards. Resolution produces new values that
//! reference (Arc-share), not copy, the schemas they import.

pub mod queries;
pub mod schema;
pub mod types;

pub use schema::{
    Annotation, Directive, FormDefault, Notation, RedefineSet, ResolvedSchema, ResolvedType,
    Schema,
};
pub use types::{
    AttributeDecl, AttributeGroup, AttributeUse, ComplexType, DerivationMethod, ElementDecl,
    Facet, FacetKind, Field, Group, MaxOccurs, Occurs, Particle, ParticleItem, ParticleKind,
    SimpleType, SimpleVariety, TypeDerivation, Wildcard,
};
