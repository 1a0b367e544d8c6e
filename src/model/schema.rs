//! Schema document and resolved-schema structures

use super::types::{
    AttributeDecl, AttributeGroup, ComplexType, ElementDecl, Field, Group, SimpleType,
};
use crate::namespaces::PrefixMap;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Form default for elements and attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormDefault {
    /// Unqualified (default)
    #[default]
    Unqualified,
    /// Qualified
    Qualified,
}

impl FormDefault {
    /// Parse from the attribute value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }

    /// Check if qualified
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified)
    }
}

impl fmt::Display for FormDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qualified => write!(f, "qualified"),
            Self::Unqualified => write!(f, "unqualified"),
        }
    }
}

/// An annotation block (documentation / appinfo text)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    /// Text of `documentation` children, in order
    pub documentation: Vec<String>,
    /// Text of `appinfo` children, in order
    pub appinfo: Vec<String>,
}

/// A notation declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Notation {
    /// Notation name
    pub name: String,
    /// Public identifier
    pub public: Option<String>,
    /// System identifier
    pub system: Option<String>,
}

/// Declarations carried inside a redefine/override directive
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RedefineSet {
    /// Redefined complex types
    pub complex_types: Vec<ComplexType>,
    /// Redefined simple types
    pub simple_types: Vec<SimpleType>,
    /// Redefined groups
    pub groups: Vec<Group>,
    /// Redefined attribute groups
    pub attribute_groups: Vec<AttributeGroup>,
}

impl RedefineSet {
    /// Whether the set carries no redefinitions
    pub fn is_empty(&self) -> bool {
        self.complex_types.is_empty()
            && self.simple_types.is_empty()
            && self.groups.is_empty()
            && self.attribute_groups.is_empty()
    }
}

/// A cross-document directive, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `import`: pull another namespace's declarations into scope
    Import {
        /// Imported namespace
        namespace: Option<String>,
        /// Location hint
        location: Option<String>,
    },
    /// `include`: merge a same-namespace schema document
    Include {
        /// Schema location
        location: String,
    },
    /// `redefine`: include plus modification of the included declarations
    Redefine {
        /// Schema location
        location: String,
        /// The redefinitions
        redefinitions: RedefineSet,
    },
    /// `override` (XSD 1.1): include plus replacement of declarations
    Override {
        /// Schema location
        location: String,
        /// The overriding declarations
        overrides: RedefineSet,
    },
}

impl Directive {
    /// The schemaLocation of this directive, if present
    pub fn location(&self) -> Option<&str> {
        match self {
            Directive::Import { location, .. } => location.as_deref(),
            Directive::Include { location }
            | Directive::Redefine { location, .. }
            | Directive::Override { location, .. } => Some(location),
        }
    }
}

/// A parsed schema document (references still unresolved)
///
/// Collections keep declaration order; the builder re-emits them in
/// exactly this order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Target namespace
    pub target_namespace: Option<String>,
    /// Prefix declarations from the schema root
    pub prefixes: PrefixMap,
    /// elementFormDefault
    pub element_form_default: FormDefault,
    /// attributeFormDefault
    pub attribute_form_default: FormDefault,
    /// Named complex types in declaration order
    pub complex_types: Vec<ComplexType>,
    /// Named simple types in declaration order
    pub simple_types: Vec<SimpleType>,
    /// Top-level elements in declaration order
    pub elements: Vec<ElementDecl>,
    /// Top-level attributes in declaration order
    pub attributes: Vec<AttributeDecl>,
    /// Named groups in declaration order
    pub groups: Vec<Group>,
    /// Named attribute groups in declaration order
    pub attribute_groups: Vec<AttributeGroup>,
    /// Schema-level annotations in declaration order
    pub annotations: Vec<Annotation>,
    /// Notation declarations in declaration order
    pub notations: Vec<Notation>,
    /// import/include/redefine/override directives in declaration order
    pub directives: Vec<Directive>,
    /// Source location, when known (used as the resolution cache key)
    pub location: Option<String>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty schema with a target namespace
    pub fn with_target_namespace(namespace: impl Into<String>) -> Self {
        Self {
            target_namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    /// Total number of named top-level declarations
    pub fn declaration_count(&self) -> usize {
        self.complex_types.len()
            + self.simple_types.len()
            + self.elements.len()
            + self.attributes.len()
            + self.groups.len()
            + self.attribute_groups.len()
    }
}

/// Fully resolved field list for one named complex type
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    /// Type local name
    pub name: String,
    /// Namespace the type was declared in
    pub namespace: Option<String>,
    /// Linearized fields: inherited first (in base order), then own
    pub fields: Vec<Field>,
    /// Mixed-content flag
    pub mixed: bool,
}

/// A schema with every reference resolved across its import graph
///
/// Holds the root schema unmodified plus Arc-shared references to every
/// transitively merged schema, and a side table of linearized field lists
/// per named complex type.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    /// The root schema, exactly as parsed
    pub schema: Arc<Schema>,
    /// Every transitively merged schema (imports, includes, redefines)
    pub merged: Vec<Arc<Schema>>,
    /// Linearized field lists keyed by Clark-notation type name
    pub types: IndexMap<String, ResolvedType>,
}

/// Clark-notation key for namespace-qualified lookup tables
pub(crate) fn qualified_key(namespace: Option<&str>, local_name: &str) -> String {
    match namespace {
        Some(ns) => format!("{{{}}}{}", ns, local_name),
        None => local_name.to_string(),
    }
}

impl ResolvedSchema {
    /// The root schema plus every merged schema, root first
    pub fn all_schemas(&self) -> impl Iterator<Item = &Schema> {
        std::iter::once(self.schema.as_ref()).chain(self.merged.iter().map(|s| s.as_ref()))
    }

    /// Look up the linearized form of a named complex type
    pub fn resolved_type(&self, namespace: Option<&str>, local_name: &str) -> Option<&ResolvedType> {
        self.types.get(&qualified_key(namespace, local_name))
    }

    /// Look up a linearized type by local name in any merged namespace
    pub fn resolved_type_by_local_name(&self, local_name: &str) -> Option<&ResolvedType> {
        self.types.values().find(|t| t.name == local_name)
    }
}
