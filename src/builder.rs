//! Schema serialization back to XSD text
//!
//! Rebuilds schema-language text from a [`Schema`] value with deterministic
//! ordering: every collection is emitted in the order the parser discovered
//! it, using the schema's own prefix declarations. Equal inputs always
//! produce byte-identical output; this is what makes the round-trip
//! stability property hold.

use crate::error::{Error, Result};
use crate::model::{
    Annotation, AttributeDecl, AttributeGroup, AttributeUse, ComplexType, DerivationMethod,
    Directive, ElementDecl, Group, Notation, Occurs, Particle, ParticleItem, RedefineSet, Schema,
    SimpleType, SimpleVariety, Wildcard,
};
use crate::namespaces::XSD_NAMESPACE;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Output options for the schema builder
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Emit an XML declaration
    pub xml_decl: bool,
    /// Encoding named in the XML declaration
    pub encoding: String,
    /// Indent the output
    pub pretty: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            xml_decl: true,
            encoding: "UTF-8".to_string(),
            pretty: true,
        }
    }
}

impl BuildOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to emit an XML declaration
    pub fn with_xml_decl(mut self, xml_decl: bool) -> Self {
        self.xml_decl = xml_decl;
        self
    }

    /// Set the declared encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set pretty-printing
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Serialize a schema to XSD text
pub fn build(schema: &Schema, options: &BuildOptions) -> Result<String> {
    let mut builder = SchemaBuilder::new(schema, options);
    builder.run()?;
    let bytes = builder.into_bytes();
    String::from_utf8(bytes).map_err(|e| Error::Xml(format!("Built schema is not UTF-8: {}", e)))
}

/// Serialize a schema with default options
pub fn build_default(schema: &Schema) -> Result<String> {
    build(schema, &BuildOptions::default())
}

struct SchemaBuilder<'a> {
    schema: &'a Schema,
    options: &'a BuildOptions,
    writer: Writer<Vec<u8>>,
    /// Prefix bound to the XSD namespace; None means it is the default
    xsd_prefix: Option<String>,
}

impl<'a> SchemaBuilder<'a> {
    fn new(schema: &'a Schema, options: &'a BuildOptions) -> Self {
        let writer = if options.pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };

        // Reuse the schema's own XSD binding; fall back to "xs" only when
        // the schema declares none at all (programmatically built values).
        let xsd_prefix = if schema.prefixes.default_namespace() == Some(XSD_NAMESPACE) {
            None
        } else {
            Some(
                schema
                    .prefixes
                    .prefix_for(XSD_NAMESPACE)
                    .unwrap_or("xs")
                    .to_string(),
            )
        };

        Self {
            schema,
            options,
            writer,
            xsd_prefix,
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    /// Tag name for an XSD-namespace element
    fn xsd_tag(&self, local: &str) -> String {
        match &self.xsd_prefix {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    fn write(&mut self, event: Event) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Xml(format!("Failed to write event: {}", e)))
    }

    fn start(&mut self, start: BytesStart) -> Result<()> {
        self.write(Event::Start(start))
    }

    fn empty(&mut self, start: BytesStart) -> Result<()> {
        self.write(Event::Empty(start))
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(tag.to_string())))
    }

    fn run(&mut self) -> Result<()> {
        if self.options.xml_decl {
            let encoding = self.options.encoding.clone();
            self.write(Event::Decl(BytesDecl::new("1.0", Some(encoding.as_str()), None)))?;
        }

        let tag = self.xsd_tag("schema");
        let mut root = BytesStart::new(tag.clone());

        if let Some(default) = self.schema.prefixes.default_namespace() {
            root.push_attribute(("xmlns", default));
        }
        let mut has_xsd_binding = self.schema.prefixes.default_namespace() == Some(XSD_NAMESPACE);
        for (prefix, ns) in self.schema.prefixes.iter() {
            root.push_attribute((format!("xmlns:{}", prefix).as_str(), ns));
            if ns == XSD_NAMESPACE {
                has_xsd_binding = true;
            }
        }
        if !has_xsd_binding {
            if let Some(prefix) = &self.xsd_prefix {
                root.push_attribute((format!("xmlns:{}", prefix).as_str(), XSD_NAMESPACE));
            }
        }

        if let Some(target) = &self.schema.target_namespace {
            root.push_attribute(("targetNamespace", target.as_str()));
        }
        if self.schema.element_form_default.is_qualified() {
            root.push_attribute(("elementFormDefault", "qualified"));
        }
        if self.schema.attribute_form_default.is_qualified() {
            root.push_attribute(("attributeFormDefault", "qualified"));
        }

        self.start(root)?;

        for directive in &self.schema.directives {
            self.write_directive(directive)?;
        }
        for annotation in &self.schema.annotations {
            self.write_annotation(annotation)?;
        }
        for notation in &self.schema.notations {
            self.write_notation(notation)?;
        }
        for st in &self.schema.simple_types {
            self.write_simple_type(st)?;
        }
        for ct in &self.schema.complex_types {
            self.write_complex_type(ct)?;
        }
        for group in &self.schema.groups {
            self.write_group(group)?;
        }
        for ag in &self.schema.attribute_groups {
            self.write_attribute_group(ag)?;
        }
        for attr in &self.schema.attributes {
            self.write_attribute_decl(attr)?;
        }
        for elem in &self.schema.elements {
            self.write_element_decl(elem)?;
        }

        self.end(&tag)
    }

    fn write_directive(&mut self, directive: &Directive) -> Result<()> {
        match directive {
            Directive::Import {
                namespace,
                location,
            } => {
                let mut start = BytesStart::new(self.xsd_tag("import"));
                if let Some(ns) = namespace {
                    start.push_attribute(("namespace", ns.as_str()));
                }
                if let Some(loc) = location {
                    start.push_attribute(("schemaLocation", loc.as_str()));
                }
                self.empty(start)
            }
            Directive::Include { location } => {
                let mut start = BytesStart::new(self.xsd_tag("include"));
                start.push_attribute(("schemaLocation", location.as_str()));
                self.empty(start)
            }
            Directive::Redefine {
                location,
                redefinitions,
            } => self.write_redefine_like("redefine", location, redefinitions),
            Directive::Override {
                location,
                overrides,
            } => self.write_redefine_like("override", location, overrides),
        }
    }

    fn write_redefine_like(
        &mut self,
        kind: &str,
        location: &str,
        set: &RedefineSet,
    ) -> Result<()> {
        let tag = self.xsd_tag(kind);
        let mut start = BytesStart::new(tag.clone());
        start.push_attribute(("schemaLocation", location));

        if set.is_empty() {
            return self.empty(start);
        }

        self.start(start)?;
        for st in &set.simple_types {
            self.write_simple_type(st)?;
        }
        for ct in &set.complex_types {
            self.write_complex_type(ct)?;
        }
        for group in &set.groups {
            self.write_group(group)?;
        }
        for ag in &set.attribute_groups {
            self.write_attribute_group(ag)?;
        }
        self.end(&tag)
    }

    fn write_annotation(&mut self, annotation: &Annotation) -> Result<()> {
        let tag = self.xsd_tag("annotation");
        self.start(BytesStart::new(tag.clone()))?;
        for doc in &annotation.documentation {
            let doc_tag = self.xsd_tag("documentation");
            if doc.is_empty() {
                self.empty(BytesStart::new(doc_tag))?;
            } else {
                self.start(BytesStart::new(doc_tag.clone()))?;
                self.write(Event::Text(BytesText::new(doc)))?;
                self.end(&doc_tag)?;
            }
        }
        for info in &annotation.appinfo {
            let info_tag = self.xsd_tag("appinfo");
            if info.is_empty() {
                self.empty(BytesStart::new(info_tag))?;
            } else {
                self.start(BytesStart::new(info_tag.clone()))?;
                self.write(Event::Text(BytesText::new(info)))?;
                self.end(&info_tag)?;
            }
        }
        self.end(&tag)
    }

    fn write_notation(&mut self, notation: &Notation) -> Result<()> {
        let mut start = BytesStart::new(self.xsd_tag("notation"));
        start.push_attribute(("name", notation.name.as_str()));
        if let Some(public) = &notation.public {
            start.push_attribute(("public", public.as_str()));
        }
        if let Some(system) = &notation.system {
            start.push_attribute(("system", system.as_str()));
        }
        self.empty(start)
    }

    fn push_occurs(start: &mut BytesStart, occurs: &Occurs) {
        if occurs.is_default() {
            return;
        }
        if occurs.min != 1 {
            start.push_attribute(("minOccurs", occurs.min.to_string().as_str()));
        }
        match occurs.max {
            crate::model::MaxOccurs::Bounded(1) => {}
            max => start.push_attribute(("maxOccurs", max.to_string().as_str())),
        }
    }

    fn write_element_decl(&mut self, decl: &ElementDecl) -> Result<()> {
        let tag = self.xsd_tag("element");
        let mut start = BytesStart::new(tag.clone());

        if let Some(name) = &decl.name {
            start.push_attribute(("name", name.as_str()));
        }
        if let Some(ref_name) = &decl.ref_name {
            start.push_attribute(("ref", ref_name.as_str()));
        }
        if let Some(type_name) = &decl.type_name {
            start.push_attribute(("type", type_name.as_str()));
        }
        Self::push_occurs(&mut start, &decl.occurs);
        if decl.nillable {
            start.push_attribute(("nillable", "true"));
        }
        if let Some(head) = &decl.substitution_group {
            start.push_attribute(("substitutionGroup", head.as_str()));
        }
        if let Some(default) = &decl.default {
            start.push_attribute(("default", default.as_str()));
        }
        if let Some(fixed) = &decl.fixed {
            start.push_attribute(("fixed", fixed.as_str()));
        }

        if decl.inline_complex.is_none() && decl.inline_simple.is_none() {
            return self.empty(start);
        }

        self.start(start)?;
        if let Some(inline) = &decl.inline_simple {
            self.write_simple_type(inline)?;
        }
        if let Some(inline) = &decl.inline_complex {
            self.write_complex_type(inline)?;
        }
        self.end(&tag)
    }

    fn write_attribute_decl(&mut self, decl: &AttributeDecl) -> Result<()> {
        let tag = self.xsd_tag("attribute");
        let mut start = BytesStart::new(tag.clone());

        if let Some(name) = &decl.name {
            start.push_attribute(("name", name.as_str()));
        }
        if let Some(ref_name) = &decl.ref_name {
            start.push_attribute(("ref", ref_name.as_str()));
        }
        if let Some(type_name) = &decl.type_name {
            start.push_attribute(("type", type_name.as_str()));
        }
        if decl.use_mode != AttributeUse::Optional {
            start.push_attribute(("use", decl.use_mode.to_string().as_str()));
        }
        if let Some(default) = &decl.default {
            start.push_attribute(("default", default.as_str()));
        }
        if let Some(fixed) = &decl.fixed {
            start.push_attribute(("fixed", fixed.as_str()));
        }

        match &decl.inline_type {
            None => self.empty(start),
            Some(inline) => {
                self.start(start)?;
                self.write_simple_type(inline)?;
                self.end(&tag)
            }
        }
    }

    fn write_complex_type(&mut self, ct: &ComplexType) -> Result<()> {
        let tag = self.xsd_tag("complexType");
        let mut start = BytesStart::new(tag.clone());
        if let Some(name) = &ct.name {
            start.push_attribute(("name", name.as_str()));
        }
        if ct.mixed {
            start.push_attribute(("mixed", "true"));
        }
        self.start(start)?;

        match &ct.derivation {
            Some(derivation) => {
                let content_tag = if ct.simple_content {
                    self.xsd_tag("simpleContent")
                } else {
                    self.xsd_tag("complexContent")
                };
                self.start(BytesStart::new(content_tag.clone()))?;

                let method_tag = match derivation.method {
                    DerivationMethod::Extension => self.xsd_tag("extension"),
                    DerivationMethod::Restriction => self.xsd_tag("restriction"),
                };
                let mut method_start = BytesStart::new(method_tag.clone());
                method_start.push_attribute(("base", derivation.base.as_str()));

                let body_empty = ct.content.is_none()
                    && ct.attributes.is_empty()
                    && ct.attribute_group_refs.is_empty()
                    && ct.any_attribute.is_none();
                if body_empty {
                    self.empty(method_start)?;
                } else {
                    self.start(method_start)?;
                    self.write_type_body(ct)?;
                    self.end(&method_tag)?;
                }
                self.end(&content_tag)?;
            }
            None => self.write_type_body(ct)?,
        }

        self.end(&tag)
    }

    fn write_type_body(&mut self, ct: &ComplexType) -> Result<()> {
        if let Some(content) = &ct.content {
            self.write_particle(content)?;
        }
        for attr in &ct.attributes {
            self.write_attribute_decl(attr)?;
        }
        for group_ref in &ct.attribute_group_refs {
            let mut start = BytesStart::new(self.xsd_tag("attributeGroup"));
            start.push_attribute(("ref", group_ref.as_str()));
            self.empty(start)?;
        }
        if let Some(wildcard) = &ct.any_attribute {
            let mut start = BytesStart::new(self.xsd_tag("anyAttribute"));
            Self::push_wildcard(&mut start, wildcard);
            self.empty(start)?;
        }
        Ok(())
    }

    fn push_wildcard(start: &mut BytesStart, wildcard: &Wildcard) {
        if let Some(namespace) = &wildcard.namespace {
            start.push_attribute(("namespace", namespace.as_str()));
        }
        if let Some(mode) = &wildcard.process_contents {
            start.push_attribute(("processContents", mode.as_str()));
        }
    }

    fn write_particle(&mut self, particle: &Particle) -> Result<()> {
        // A synthetic single-group-ref sequence unparses back to the bare
        // group reference it came from.
        if particle.occurs.is_default() && particle.items.len() == 1 {
            if let ParticleItem::GroupRef { name, occurs } = &particle.items[0] {
                let mut start = BytesStart::new(self.xsd_tag("group"));
                start.push_attribute(("ref", name.as_str()));
                Self::push_occurs(&mut start, occurs);
                return self.empty(start);
            }
        }

        let tag = self.xsd_tag(particle.kind.xsd_name());
        let mut start = BytesStart::new(tag.clone());
        Self::push_occurs(&mut start, &particle.occurs);

        if particle.items.is_empty() {
            return self.empty(start);
        }

        self.start(start)?;
        for item in &particle.items {
            match item {
                ParticleItem::Element(decl) => self.write_element_decl(decl)?,
                ParticleItem::GroupRef { name, occurs } => {
                    let mut group = BytesStart::new(self.xsd_tag("group"));
                    group.push_attribute(("ref", name.as_str()));
                    Self::push_occurs(&mut group, occurs);
                    self.empty(group)?;
                }
                ParticleItem::Nested(nested) => self.write_particle(nested)?,
                ParticleItem::Any { wildcard, occurs } => {
                    let mut any = BytesStart::new(self.xsd_tag("any"));
                    Self::push_wildcard(&mut any, wildcard);
                    Self::push_occurs(&mut any, occurs);
                    self.empty(any)?;
                }
            }
        }
        self.end(&tag)
    }

    fn write_group(&mut self, group: &Group) -> Result<()> {
        let tag = self.xsd_tag("group");
        let mut start = BytesStart::new(tag.clone());
        start.push_attribute(("name", group.name.as_str()));
        self.start(start)?;
        self.write_particle(&group.particle)?;
        self.end(&tag)
    }

    fn write_attribute_group(&mut self, group: &AttributeGroup) -> Result<()> {
        let tag = self.xsd_tag("attributeGroup");
        let mut start = BytesStart::new(tag.clone());
        start.push_attribute(("name", group.name.as_str()));
        self.start(start)?;
        for attr in &group.attributes {
            self.write_attribute_decl(attr)?;
        }
        for nested in &group.attribute_group_refs {
            let mut start = BytesStart::new(self.xsd_tag("attributeGroup"));
            start.push_attribute(("ref", nested.as_str()));
            self.empty(start)?;
        }
        self.end(&tag)
    }

    fn write_simple_type(&mut self, st: &SimpleType) -> Result<()> {
        let tag = self.xsd_tag("simpleType");
        let mut start = BytesStart::new(tag.clone());
        if let Some(name) = &st.name {
            start.push_attribute(("name", name.as_str()));
        }
        self.start(start)?;

        match &st.variety {
            SimpleVariety::Restriction {
                base,
                inline_base,
                facets,
            } => {
                let restriction_tag = self.xsd_tag("restriction");
                let mut restriction = BytesStart::new(restriction_tag.clone());
                if let Some(base) = base {
                    restriction.push_attribute(("base", base.as_str()));
                }

                if inline_base.is_none() && facets.is_empty() {
                    self.empty(restriction)?;
                } else {
                    self.start(restriction)?;
                    if let Some(inline) = inline_base {
                        self.write_simple_type(inline)?;
                    }
                    for facet in facets {
                        let mut facet_start = BytesStart::new(self.xsd_tag(facet.kind.xsd_name()));
                        facet_start.push_attribute(("value", facet.value.as_str()));
                        self.empty(facet_start)?;
                    }
                    self.end(&restriction_tag)?;
                }
            }
            SimpleVariety::List { item_type } => {
                let mut list = BytesStart::new(self.xsd_tag("list"));
                if let Some(item) = item_type {
                    list.push_attribute(("itemType", item.as_str()));
                }
                self.empty(list)?;
            }
            SimpleVariety::Union { member_types } => {
                let mut union = BytesStart::new(self.xsd_tag("union"));
                if !member_types.is_empty() {
                    union.push_attribute(("memberTypes", member_types.join(" ").as_str()));
                }
                self.empty(union)?;
            }
        }

        self.end(&tag)
    }
}
