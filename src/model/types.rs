//! Type, particle and field definitions
//!
//! Particle and field kinds are exhaustive enums, so every consumer is
//! forced through a complete match rather than a runtime string check.

use std::fmt;

/// Upper bound of an occurrence range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    /// A concrete bound
    Bounded(u32),
    /// `maxOccurs="unbounded"`
    Unbounded,
}

/// Occurrence range for a particle or element (`minOccurs`/`maxOccurs`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences
    pub max: MaxOccurs,
}

impl Default for Occurs {
    fn default() -> Self {
        Self {
            min: 1,
            max: MaxOccurs::Bounded(1),
        }
    }
}

impl Occurs {
    /// Create an occurrence range with a concrete upper bound
    pub fn bounded(min: u32, max: u32) -> Self {
        Self {
            min,
            max: MaxOccurs::Bounded(max),
        }
    }

    /// Create an unbounded occurrence range
    pub fn unbounded(min: u32) -> Self {
        Self {
            min,
            max: MaxOccurs::Unbounded,
        }
    }

    /// Whether the particle may be absent
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// Whether more than one occurrence is allowed
    pub fn is_repeatable(&self) -> bool {
        match self.max {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(n) => n > 1,
        }
    }

    /// Whether this is the default 1/1 range
    pub fn is_default(&self) -> bool {
        self.min == 1 && self.max == MaxOccurs::Bounded(1)
    }

    /// Parse from `minOccurs`/`maxOccurs` attribute text
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Option<Self> {
        let min = match min {
            Some(s) => s.parse().ok()?,
            None => 1,
        };
        let max = match max {
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(s) => MaxOccurs::Bounded(s.parse().ok()?),
            None => MaxOccurs::Bounded(1),
        };
        Some(Self { min, max })
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{}", n),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUse {
    /// May be present (default)
    #[default]
    Optional,
    /// Must be present
    Required,
    /// Must not be present
    Prohibited,
}

impl AttributeUse {
    /// Parse from the `use` attribute value
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            "prohibited" => Some(Self::Prohibited),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optional => write!(f, "optional"),
            Self::Required => write!(f, "required"),
            Self::Prohibited => write!(f, "prohibited"),
        }
    }
}

/// Type derivation method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// Extension adds fields to the base type
    Extension,
    /// Restriction narrows the base type
    Restriction,
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension => write!(f, "extension"),
            Self::Restriction => write!(f, "restriction"),
        }
    }
}

/// Base-type reference with its derivation method
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDerivation {
    /// Base type name as written in the schema (possibly prefixed)
    pub base: String,
    /// Extension or restriction
    pub method: DerivationMethod,
}

/// An attribute declaration (top-level or inside a complex type)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeDecl {
    /// Local name (None for pure references)
    pub name: Option<String>,
    /// Reference to a top-level attribute (`ref="ns:foo"`)
    pub ref_name: Option<String>,
    /// Declared type name (possibly prefixed)
    pub type_name: Option<String>,
    /// Inline anonymous simple type
    pub inline_type: Option<Box<SimpleType>>,
    /// Use mode
    pub use_mode: AttributeUse,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
    /// Set by the resolver when an unresolvable `ref` fell back to
    /// its literal local name (see the resolver's documented fallback)
    pub from_unresolved_ref: bool,
}

impl AttributeDecl {
    /// Create a named attribute declaration
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// The effective local name (declared name, or the ref's local part)
    pub fn effective_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.ref_name.as_deref().map(crate::names::local_name))
    }
}

/// An element declaration (top-level or inside a particle)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementDecl {
    /// Local name (None for pure references)
    pub name: Option<String>,
    /// Reference to a top-level element (`ref="ns:bar"`)
    pub ref_name: Option<String>,
    /// Declared type name (possibly prefixed)
    pub type_name: Option<String>,
    /// Inline anonymous complex type
    pub inline_complex: Option<Box<ComplexType>>,
    /// Inline anonymous simple type
    pub inline_simple: Option<Box<SimpleType>>,
    /// Occurrence range
    pub occurs: Occurs,
    /// Whether xsi:nil is permitted
    pub nillable: bool,
    /// Head element this one substitutes for
    pub substitution_group: Option<String>,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
    /// Namespace qualifying this element in instance documents,
    /// stamped during resolution (None until then, or for
    /// unqualified local elements)
    pub namespace: Option<String>,
    /// Namespace the declared type was found in, stamped during
    /// resolution for named complex types
    pub type_namespace: Option<String>,
}

impl ElementDecl {
    /// Create a named element declaration
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// The effective local name (declared name, or the ref's local part)
    pub fn effective_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.ref_name.as_deref().map(crate::names::local_name))
    }
}

/// Content model kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Ordered children
    Sequence,
    /// Exactly one of the alternatives
    Choice,
    /// All children, any order
    All,
}

impl ParticleKind {
    /// The XSD element name for this kind
    pub fn xsd_name(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Choice => "choice",
            Self::All => "all",
        }
    }
}

/// One item inside a particle
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleItem {
    /// An element declaration or reference
    Element(ElementDecl),
    /// A reference to a named top-level group
    GroupRef {
        /// Group name as written (possibly prefixed)
        name: String,
        /// Occurrence range of the reference
        occurs: Occurs,
    },
    /// A nested sequence/choice/all
    Nested(Particle),
    /// An element wildcard (`any`)
    Any {
        /// The wildcard constraint
        wildcard: Wildcard,
        /// Occurrence range
        occurs: Occurs,
    },
}

/// Wildcard constraint shared by `any` and `anyAttribute`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wildcard {
    /// Namespace constraint as written (`##any`, `##other`, a URI list)
    pub namespace: Option<String>,
    /// processContents mode as written (`strict`, `lax`, `skip`)
    pub process_contents: Option<String>,
}

/// A content model particle: sequence, choice or all
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// The model kind
    pub kind: ParticleKind,
    /// Occurrence range of the particle itself
    pub occurs: Occurs,
    /// Ordered items
    pub items: Vec<ParticleItem>,
}

impl Particle {
    /// Create an empty particle of the given kind
    pub fn new(kind: ParticleKind) -> Self {
        Self {
            kind,
            occurs: Occurs::default(),
            items: Vec::new(),
        }
    }
}

/// A named or anonymous complex type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexType {
    /// Type name (None for anonymous inline types)
    pub name: Option<String>,
    /// Base type + derivation method
    pub derivation: Option<TypeDerivation>,
    /// Whether the derivation came from a simpleContent body
    pub simple_content: bool,
    /// Content particle
    pub content: Option<Particle>,
    /// Attribute declarations in declaration order
    pub attributes: Vec<AttributeDecl>,
    /// References to named attribute groups, in declaration order
    pub attribute_group_refs: Vec<String>,
    /// Attribute wildcard (`anyAttribute`)
    pub any_attribute: Option<Wildcard>,
    /// Whether character data may be interleaved with children
    pub mixed: bool,
}

impl ComplexType {
    /// Create a named complex type
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Facet kinds for simple type restrictions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    /// One permitted value
    Enumeration,
    /// Regular expression constraint
    Pattern,
    /// Exact length
    Length,
    /// Minimum length
    MinLength,
    /// Maximum length
    MaxLength,
    /// Inclusive lower bound
    MinInclusive,
    /// Inclusive upper bound
    MaxInclusive,
    /// Exclusive lower bound
    MinExclusive,
    /// Exclusive upper bound
    MaxExclusive,
    /// Maximum total digits
    TotalDigits,
    /// Maximum fraction digits
    FractionDigits,
    /// Whitespace normalization policy
    WhiteSpace,
}

impl FacetKind {
    /// The XSD element name for this facet
    pub fn xsd_name(&self) -> &'static str {
        match self {
            Self::Enumeration => "enumeration",
            Self::Pattern => "pattern",
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::MinInclusive => "minInclusive",
            Self::MaxInclusive => "maxInclusive",
            Self::MinExclusive => "minExclusive",
            Self::MaxExclusive => "maxExclusive",
            Self::TotalDigits => "totalDigits",
            Self::FractionDigits => "fractionDigits",
            Self::WhiteSpace => "whiteSpace",
        }
    }

    /// Parse from the XSD element name
    pub fn from_xsd_name(name: &str) -> Option<Self> {
        match name {
            "enumeration" => Some(Self::Enumeration),
            "pattern" => Some(Self::Pattern),
            "length" => Some(Self::Length),
            "minLength" => Some(Self::MinLength),
            "maxLength" => Some(Self::MaxLength),
            "minInclusive" => Some(Self::MinInclusive),
            "maxInclusive" => Some(Self::MaxInclusive),
            "minExclusive" => Some(Self::MinExclusive),
            "maxExclusive" => Some(Self::MaxExclusive),
            "totalDigits" => Some(Self::TotalDigits),
            "fractionDigits" => Some(Self::FractionDigits),
            "whiteSpace" => Some(Self::WhiteSpace),
            _ => None,
        }
    }
}

/// A single facet with its value
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    /// The facet kind
    pub kind: FacetKind,
    /// The facet value, verbatim from the schema
    pub value: String,
}

/// The three varieties of simple type definitions
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleVariety {
    /// Restriction of a base type with facets
    Restriction {
        /// Base type name (None when the base is inline)
        base: Option<String>,
        /// Inline anonymous base type
        inline_base: Option<Box<SimpleType>>,
        /// Facets in declaration order
        facets: Vec<Facet>,
    },
    /// Space-separated list of an item type
    List {
        /// Item type name (None when inline)
        item_type: Option<String>,
    },
    /// Union of member types
    Union {
        /// Member type names in declaration order
        member_types: Vec<String>,
    },
}

/// A named or anonymous simple type
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    /// Type name (None for anonymous inline types)
    pub name: Option<String>,
    /// The restriction/list/union body
    pub variety: SimpleVariety,
}

/// A named top-level model group
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Group name
    pub name: String,
    /// The group's content particle
    pub particle: Particle,
}

/// A named top-level attribute group
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeGroup {
    /// Attribute group name
    pub name: String,
    /// Attribute declarations in declaration order
    pub attributes: Vec<AttributeDecl>,
    /// Nested attribute group references
    pub attribute_group_refs: Vec<String>,
}

/// One fully resolved field of a complex type
///
/// This is what [`walk_attributes`](crate::model::ResolvedSchema::walk_attributes)
/// and [`walk_elements`](crate::model::ResolvedSchema::walk_elements) yield:
/// the exhaustive field-kind union.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A scalar attribute field
    Attribute(AttributeDecl),
    /// A child element appearing at most once
    Single(ElementDecl),
    /// A child element appearing more than once (array-valued)
    Repeated(ElementDecl),
    /// Exactly one of the listed alternatives
    Choice(Vec<ElementDecl>),
}

impl Field {
    /// The field's name as seen by the instance codec
    pub fn name(&self) -> Option<&str> {
        match self {
            Field::Attribute(a) => a.effective_name(),
            Field::Single(e) | Field::Repeated(e) => e.effective_name(),
            Field::Choice(_) => None,
        }
    }
}
