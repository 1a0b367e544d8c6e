//! XSD document parsing
//!
//! Walks a schema document's node tree (any [`NodeView`] backend) and
//! produces a raw [`Schema`] with references still unresolved. Declaration
//! order is preserved in every collection so the builder can regenerate
//! the document deterministically.

use crate::error::{Result, SchemaParseError};
use crate::model::{
    Annotation, AttributeDecl, AttributeGroup, AttributeUse, ComplexType, DerivationMethod,
    Directive, ElementDecl, Facet, FacetKind, FormDefault, Group, Notation, Occurs, Particle,
    ParticleItem, ParticleKind, RedefineSet, Schema, SimpleType, SimpleVariety, TypeDerivation,
    Wildcard,
};
use crate::names::{validate_ncname, validate_qname};
use crate::namespaces::XSD_NAMESPACE;
use crate::nodes::NodeView;

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const DOCUMENTATION: &str = "documentation";
    pub const APPINFO: &str = "appinfo";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const OVERRIDE: &str = "override";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const NOTATION: &str = "notation";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
    pub const NILLABLE: &str = "nillable";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const NAMESPACE: &str = "namespace";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const PUBLIC: &str = "public";
    pub const SYSTEM: &str = "system";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const USE: &str = "use";
    pub const PROCESS_CONTENTS: &str = "processContents";
}

/// Parse a schema document from its root node
pub fn parse_schema<N: NodeView>(root: &N) -> Result<Schema> {
    if root.local_name() != xsd_elements::SCHEMA {
        return Err(SchemaParseError::new(format!(
            "Root node '{}' is not a schema",
            root.local_name()
        ))
        .with_node(root.local_name().to_string())
        .into());
    }
    if let Some(ns) = root.namespace() {
        if ns != XSD_NAMESPACE {
            return Err(SchemaParseError::new(format!(
                "Schema root bound to unexpected namespace '{}'",
                ns
            ))
            .into());
        }
    }

    let mut schema = Schema::new();
    schema.target_namespace = root
        .attribute(xsd_attrs::TARGET_NAMESPACE)
        .map(|s| s.to_string());

    for (prefix, uri) in root.namespace_declarations() {
        match prefix {
            Some(p) => schema.prefixes.declare(p, uri),
            None => schema.prefixes.set_default(uri),
        }
    }

    if let Some(form) = root.attribute(xsd_attrs::ELEMENT_FORM_DEFAULT) {
        schema.element_form_default = FormDefault::from_str(form).ok_or_else(|| {
            SchemaParseError::new(format!("Invalid elementFormDefault '{}'", form))
        })?;
    }
    if let Some(form) = root.attribute(xsd_attrs::ATTRIBUTE_FORM_DEFAULT) {
        schema.attribute_form_default = FormDefault::from_str(form).ok_or_else(|| {
            SchemaParseError::new(format!("Invalid attributeFormDefault '{}'", form))
        })?;
    }

    for child in root.children() {
        match child.local_name() {
            xsd_elements::ELEMENT => schema.elements.push(parse_element_decl(&child)?),
            xsd_elements::COMPLEX_TYPE => schema.complex_types.push(parse_complex_type(&child)?),
            xsd_elements::SIMPLE_TYPE => schema.simple_types.push(parse_simple_type(&child)?),
            xsd_elements::GROUP => schema.groups.push(parse_group(&child)?),
            xsd_elements::ATTRIBUTE_GROUP => {
                schema.attribute_groups.push(parse_attribute_group(&child)?)
            }
            xsd_elements::ATTRIBUTE => schema.attributes.push(parse_attribute_decl(&child)?),
            xsd_elements::NOTATION => schema.notations.push(parse_notation(&child)?),
            xsd_elements::ANNOTATION => schema.annotations.push(parse_annotation(&child)),
            xsd_elements::IMPORT => schema.directives.push(Directive::Import {
                namespace: child.attribute(xsd_attrs::NAMESPACE).map(|s| s.to_string()),
                location: child
                    .attribute(xsd_attrs::SCHEMA_LOCATION)
                    .map(|s| s.to_string()),
            }),
            xsd_elements::INCLUDE => schema.directives.push(Directive::Include {
                location: require_attr(&child, xsd_attrs::SCHEMA_LOCATION)?,
            }),
            xsd_elements::REDEFINE => schema.directives.push(Directive::Redefine {
                location: require_attr(&child, xsd_attrs::SCHEMA_LOCATION)?,
                redefinitions: parse_redefine_set(&child)?,
            }),
            xsd_elements::OVERRIDE => schema.directives.push(Directive::Override {
                location: require_attr(&child, xsd_attrs::SCHEMA_LOCATION)?,
                overrides: parse_redefine_set(&child)?,
            }),
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unrecognized top-level schema child '{}'",
                    other
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    Ok(schema)
}

/// Required attribute, or a parse error naming the node
fn require_attr<N: NodeView>(node: &N, attr: &str) -> Result<String> {
    node.attribute(attr).map(|s| s.to_string()).ok_or_else(|| {
        SchemaParseError::new(format!(
            "'{}' requires a '{}' attribute",
            node.local_name(),
            attr
        ))
        .with_node(node.local_name().to_string())
        .into()
    })
}

fn parse_occurs<N: NodeView>(node: &N) -> Result<Occurs> {
    Occurs::parse(
        node.attribute(xsd_attrs::MIN_OCCURS),
        node.attribute(xsd_attrs::MAX_OCCURS),
    )
    .ok_or_else(|| {
        SchemaParseError::new(format!(
            "Invalid minOccurs/maxOccurs on '{}'",
            node.local_name()
        ))
        .with_node(node.local_name().to_string())
        .into()
    })
}

fn parse_wildcard<N: NodeView>(node: &N) -> Wildcard {
    Wildcard {
        namespace: node.attribute(xsd_attrs::NAMESPACE).map(|s| s.to_string()),
        process_contents: node
            .attribute(xsd_attrs::PROCESS_CONTENTS)
            .map(|s| s.to_string()),
    }
}

/// Parse an element declaration, recursing into inline types
pub fn parse_element_decl<N: NodeView>(node: &N) -> Result<ElementDecl> {
    let mut decl = ElementDecl {
        name: node.attribute(xsd_attrs::NAME).map(|s| s.to_string()),
        ref_name: node.attribute(xsd_attrs::REF).map(|s| s.to_string()),
        type_name: node.attribute(xsd_attrs::TYPE).map(|s| s.to_string()),
        occurs: parse_occurs(node)?,
        nillable: node.attribute(xsd_attrs::NILLABLE) == Some("true"),
        substitution_group: node
            .attribute(xsd_attrs::SUBSTITUTION_GROUP)
            .map(|s| s.to_string()),
        default: node.attribute(xsd_attrs::DEFAULT).map(|s| s.to_string()),
        fixed: node.attribute(xsd_attrs::FIXED).map(|s| s.to_string()),
        ..Default::default()
    };

    if decl.name.is_none() && decl.ref_name.is_none() {
        return Err(
            SchemaParseError::new("Element declaration needs a 'name' or a 'ref'")
                .with_node(xsd_elements::ELEMENT)
                .into(),
        );
    }
    if let Some(name) = &decl.name {
        validate_ncname(name)?;
    }
    if let Some(ref_name) = &decl.ref_name {
        validate_qname(ref_name)?;
    }
    if let Some(type_name) = &decl.type_name {
        validate_qname(type_name)?;
    }

    for child in node.children() {
        match child.local_name() {
            xsd_elements::COMPLEX_TYPE => {
                decl.inline_complex = Some(Box::new(parse_complex_type(&child)?));
            }
            xsd_elements::SIMPLE_TYPE => {
                decl.inline_simple = Some(Box::new(parse_simple_type(&child)?));
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside element declaration",
                    other
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    Ok(decl)
}

/// Parse an attribute declaration, recursing into an inline simple type
pub fn parse_attribute_decl<N: NodeView>(node: &N) -> Result<AttributeDecl> {
    let mut decl = AttributeDecl {
        name: node.attribute(xsd_attrs::NAME).map(|s| s.to_string()),
        ref_name: node.attribute(xsd_attrs::REF).map(|s| s.to_string()),
        type_name: node.attribute(xsd_attrs::TYPE).map(|s| s.to_string()),
        default: node.attribute(xsd_attrs::DEFAULT).map(|s| s.to_string()),
        fixed: node.attribute(xsd_attrs::FIXED).map(|s| s.to_string()),
        ..Default::default()
    };

    if let Some(use_mode) = node.attribute(xsd_attrs::USE) {
        decl.use_mode = AttributeUse::from_str(use_mode).ok_or_else(|| {
            SchemaParseError::new(format!("Invalid attribute use '{}'", use_mode))
        })?;
    }

    if decl.name.is_none() && decl.ref_name.is_none() {
        return Err(
            SchemaParseError::new("Attribute declaration needs a 'name' or a 'ref'")
                .with_node(xsd_elements::ATTRIBUTE)
                .into(),
        );
    }
    if let Some(name) = &decl.name {
        validate_ncname(name)?;
    }
    if let Some(ref_name) = &decl.ref_name {
        validate_qname(ref_name)?;
    }
    if let Some(type_name) = &decl.type_name {
        validate_qname(type_name)?;
    }

    for child in node.children() {
        match child.local_name() {
            xsd_elements::SIMPLE_TYPE => {
                decl.inline_type = Some(Box::new(parse_simple_type(&child)?));
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside attribute declaration",
                    other
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    Ok(decl)
}

/// Parse a complexType definition
pub fn parse_complex_type<N: NodeView>(node: &N) -> Result<ComplexType> {
    let mut ct = ComplexType {
        name: node.attribute(xsd_attrs::NAME).map(|s| s.to_string()),
        mixed: node.attribute(xsd_attrs::MIXED) == Some("true"),
        ..Default::default()
    };
    if let Some(name) = &ct.name {
        validate_ncname(name)?;
    }

    for child in node.children() {
        match child.local_name() {
            xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                ct.content = Some(parse_particle(&child)?);
            }
            xsd_elements::COMPLEX_CONTENT => parse_derived_content(&child, &mut ct, false)?,
            xsd_elements::SIMPLE_CONTENT => parse_derived_content(&child, &mut ct, true)?,
            xsd_elements::ATTRIBUTE => ct.attributes.push(parse_attribute_decl(&child)?),
            xsd_elements::ATTRIBUTE_GROUP => {
                ct.attribute_group_refs
                    .push(require_attr(&child, xsd_attrs::REF)?);
            }
            xsd_elements::GROUP => {
                let occurs = parse_occurs(&child)?;
                let name = require_attr(&child, xsd_attrs::REF)?;
                ct.content = Some(Particle {
                    kind: ParticleKind::Sequence,
                    occurs: Occurs::default(),
                    items: vec![ParticleItem::GroupRef { name, occurs }],
                });
            }
            xsd_elements::ANY_ATTRIBUTE => {
                ct.any_attribute = Some(parse_wildcard(&child));
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside complexType",
                    other
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    Ok(ct)
}

/// Parse a complexContent/simpleContent body into the enclosing type
fn parse_derived_content<N: NodeView>(
    node: &N,
    ct: &mut ComplexType,
    simple_content: bool,
) -> Result<()> {
    ct.simple_content = simple_content;
    if node.attribute(xsd_attrs::MIXED) == Some("true") {
        ct.mixed = true;
    }

    for child in node.children() {
        let method = match child.local_name() {
            xsd_elements::EXTENSION => DerivationMethod::Extension,
            xsd_elements::RESTRICTION => DerivationMethod::Restriction,
            xsd_elements::ANNOTATION => continue,
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside {}",
                    other,
                    node.local_name()
                ))
                .with_node(other.to_string())
                .into())
            }
        };

        ct.derivation = Some(TypeDerivation {
            base: require_attr(&child, xsd_attrs::BASE)?,
            method,
        });

        for body in child.children() {
            match body.local_name() {
                xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                    ct.content = Some(parse_particle(&body)?);
                }
                xsd_elements::ATTRIBUTE => ct.attributes.push(parse_attribute_decl(&body)?),
                xsd_elements::ATTRIBUTE_GROUP => {
                    ct.attribute_group_refs
                        .push(require_attr(&body, xsd_attrs::REF)?);
                }
                xsd_elements::GROUP => {
                    let occurs = parse_occurs(&body)?;
                    let name = require_attr(&body, xsd_attrs::REF)?;
                    ct.content = Some(Particle {
                        kind: ParticleKind::Sequence,
                        occurs: Occurs::default(),
                        items: vec![ParticleItem::GroupRef { name, occurs }],
                    });
                }
                xsd_elements::ANY_ATTRIBUTE => {
                    ct.any_attribute = Some(parse_wildcard(&body));
                }
                xsd_elements::ANNOTATION => {}
                // Facets on simpleContent restrictions are tolerated and
                // dropped; the model keeps facets on simple types only.
                other if simple_content && FacetKind::from_xsd_name(other).is_some() => {}
                other => {
                    return Err(SchemaParseError::new(format!(
                        "Unexpected child '{}' inside {}",
                        other,
                        child.local_name()
                    ))
                    .with_node(other.to_string())
                    .into())
                }
            }
        }
    }

    Ok(())
}

/// Parse a sequence/choice/all particle recursively
pub fn parse_particle<N: NodeView>(node: &N) -> Result<Particle> {
    let kind = match node.local_name() {
        xsd_elements::SEQUENCE => ParticleKind::Sequence,
        xsd_elements::CHOICE => ParticleKind::Choice,
        xsd_elements::ALL => ParticleKind::All,
        other => {
            return Err(
                SchemaParseError::new(format!("'{}' is not a particle", other))
                    .with_node(other.to_string())
                    .into(),
            )
        }
    };

    let mut particle = Particle {
        kind,
        occurs: parse_occurs(node)?,
        items: Vec::new(),
    };

    for child in node.children() {
        match child.local_name() {
            xsd_elements::ELEMENT => {
                particle
                    .items
                    .push(ParticleItem::Element(parse_element_decl(&child)?));
            }
            xsd_elements::GROUP => {
                particle.items.push(ParticleItem::GroupRef {
                    name: require_attr(&child, xsd_attrs::REF)?,
                    occurs: parse_occurs(&child)?,
                });
            }
            xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                particle
                    .items
                    .push(ParticleItem::Nested(parse_particle(&child)?));
            }
            xsd_elements::ANY => {
                particle.items.push(ParticleItem::Any {
                    wildcard: parse_wildcard(&child),
                    occurs: parse_occurs(&child)?,
                });
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unrecognized child '{}' inside {}",
                    other,
                    node.local_name()
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    Ok(particle)
}

/// Parse a named top-level group
pub fn parse_group<N: NodeView>(node: &N) -> Result<Group> {
    let name = require_attr(node, xsd_attrs::NAME)?;
    validate_ncname(&name)?;

    let mut particle = None;
    for child in node.children() {
        match child.local_name() {
            xsd_elements::SEQUENCE | xsd_elements::CHOICE | xsd_elements::ALL => {
                particle = Some(parse_particle(&child)?);
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside group",
                    other
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    let particle = particle.ok_or_else(|| {
        SchemaParseError::new(format!("Group '{}' has no content particle", name))
            .with_node(xsd_elements::GROUP)
    })?;

    Ok(Group { name, particle })
}

/// Parse a named top-level attribute group
pub fn parse_attribute_group<N: NodeView>(node: &N) -> Result<AttributeGroup> {
    let name = require_attr(node, xsd_attrs::NAME)?;
    validate_ncname(&name)?;
    let mut group = AttributeGroup {
        name,
        attributes: Vec::new(),
        attribute_group_refs: Vec::new(),
    };

    for child in node.children() {
        match child.local_name() {
            xsd_elements::ATTRIBUTE => group.attributes.push(parse_attribute_decl(&child)?),
            xsd_elements::ATTRIBUTE_GROUP => {
                group
                    .attribute_group_refs
                    .push(require_attr(&child, xsd_attrs::REF)?);
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside attributeGroup",
                    other
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    Ok(group)
}

/// Parse a simpleType definition
pub fn parse_simple_type<N: NodeView>(node: &N) -> Result<SimpleType> {
    let name = node.attribute(xsd_attrs::NAME).map(|s| s.to_string());
    if let Some(name) = &name {
        validate_ncname(name)?;
    }

    for child in node.children() {
        match child.local_name() {
            xsd_elements::RESTRICTION => {
                let base = child.attribute(xsd_attrs::BASE).map(|s| s.to_string());
                let mut inline_base = None;
                let mut facets = Vec::new();

                for facet_node in child.children() {
                    match facet_node.local_name() {
                        xsd_elements::SIMPLE_TYPE => {
                            inline_base = Some(Box::new(parse_simple_type(&facet_node)?));
                        }
                        xsd_elements::ANNOTATION => {}
                        other => match FacetKind::from_xsd_name(other) {
                            Some(kind) => facets.push(Facet {
                                kind,
                                value: require_attr(&facet_node, xsd_attrs::VALUE)?,
                            }),
                            None => {
                                return Err(SchemaParseError::new(format!(
                                    "Unrecognized facet '{}'",
                                    other
                                ))
                                .with_node(other.to_string())
                                .into())
                            }
                        },
                    }
                }

                return Ok(SimpleType {
                    name,
                    variety: SimpleVariety::Restriction {
                        base,
                        inline_base,
                        facets,
                    },
                });
            }
            xsd_elements::LIST => {
                return Ok(SimpleType {
                    name,
                    variety: SimpleVariety::List {
                        item_type: child.attribute(xsd_attrs::ITEM_TYPE).map(|s| s.to_string()),
                    },
                });
            }
            xsd_elements::UNION => {
                let member_types = child
                    .attribute(xsd_attrs::MEMBER_TYPES)
                    .map(|s| s.split_whitespace().map(|t| t.to_string()).collect())
                    .unwrap_or_default();
                return Ok(SimpleType {
                    name,
                    variety: SimpleVariety::Union { member_types },
                });
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside simpleType",
                    other
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }

    Err(
        SchemaParseError::new("simpleType has no restriction, list or union body")
            .with_node(xsd_elements::SIMPLE_TYPE)
            .into(),
    )
}

/// Parse a notation declaration
pub fn parse_notation<N: NodeView>(node: &N) -> Result<Notation> {
    Ok(Notation {
        name: require_attr(node, xsd_attrs::NAME)?,
        public: node.attribute(xsd_attrs::PUBLIC).map(|s| s.to_string()),
        system: node.attribute(xsd_attrs::SYSTEM).map(|s| s.to_string()),
    })
}

/// Parse an annotation block
pub fn parse_annotation<N: NodeView>(node: &N) -> Annotation {
    let mut annotation = Annotation::default();
    for child in node.children() {
        match child.local_name() {
            xsd_elements::DOCUMENTATION => {
                annotation
                    .documentation
                    .push(child.text().unwrap_or_default().to_string());
            }
            xsd_elements::APPINFO => {
                annotation
                    .appinfo
                    .push(child.text().unwrap_or_default().to_string());
            }
            _ => {}
        }
    }
    annotation
}

/// Parse the declarations inside a redefine/override directive
fn parse_redefine_set<N: NodeView>(node: &N) -> Result<RedefineSet> {
    let mut set = RedefineSet::default();
    for child in node.children() {
        match child.local_name() {
            xsd_elements::COMPLEX_TYPE => set.complex_types.push(parse_complex_type(&child)?),
            xsd_elements::SIMPLE_TYPE => set.simple_types.push(parse_simple_type(&child)?),
            xsd_elements::GROUP => set.groups.push(parse_group(&child)?),
            xsd_elements::ATTRIBUTE_GROUP => {
                set.attribute_groups.push(parse_attribute_group(&child)?)
            }
            xsd_elements::ANNOTATION => {}
            other => {
                return Err(SchemaParseError::new(format!(
                    "Unexpected child '{}' inside {}",
                    other,
                    node.local_name()
                ))
                .with_node(other.to_string())
                .into())
            }
        }
    }
    Ok(set)
}

/// Convenience: parse a schema from XSD text
pub fn parse_schema_text(xsd: &str) -> Result<Schema> {
    let tree = crate::nodes::XmlNode::from_string(xsd)?;
    parse_schema(&&tree)
}
