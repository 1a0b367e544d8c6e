//! Reference resolution across the schema import graph
//!
//! Merges imported/included/redefined/overridden schemas, resolves every
//! type/element/attribute reference, and linearizes inheritance chains into
//! a single ordered field list per complex type. The resolver performs no
//! I/O: fetching schema text is delegated to an injected [`SchemaLoader`],
//! and parsed results are memoized in an explicit [`SchemaRegistry`] passed
//! by reference, never hidden global state.
//!
//! Import cycles are normal: a visited-location set shared across the whole
//! call guarantees termination when schema A imports B and B imports A.

use crate::error::{Error, MissingTypeError, Result, SchemaParseError};
use crate::limits::Limits;
use crate::model::schema::qualified_key;
use crate::model::{
    AttributeDecl, AttributeUse, ComplexType, DerivationMethod, Directive, ElementDecl, Field,
    Group, Particle, ParticleItem, ParticleKind, RedefineSet, ResolvedSchema, ResolvedType,
    Schema, SimpleType,
};
use crate::names::{local_name, split_qname};
use crate::namespaces::XSD_NAMESPACE;
use crate::parser::parse_schema_text;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Maps a schemaLocation string to schema text
///
/// The resolver never reads the filesystem or network; every
/// import/include/redefine/override target goes through this seam.
pub trait SchemaLoader {
    /// Fetch the schema text behind a location
    fn load(&self, location: &str) -> Result<String>;
}

impl<F> SchemaLoader for F
where
    F: Fn(&str) -> Result<String>,
{
    fn load(&self, location: &str) -> Result<String> {
        self(location)
    }
}

/// Memoization cache for parsed schemas, keyed by source location
///
/// Safe to share across concurrent resolver calls: cached values are
/// immutable `Arc<Schema>`s, and population uses a single insert-if-absent
/// under one short-lived lock.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    cache: Mutex<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }

    /// Fetch the parsed schema for a location, loading and parsing it on
    /// first use
    pub fn get_or_parse(&self, location: &str, loader: &dyn SchemaLoader) -> Result<Arc<Schema>> {
        if let Some(cached) = self.cache.lock().unwrap().get(location) {
            return Ok(Arc::clone(cached));
        }

        // Parse outside the lock; a racing caller may parse the same text,
        // but only the first insertion wins and both get the same value.
        let text = loader.load(location)?;
        let mut schema = parse_schema_text(&text)?;
        schema.location = Some(location.to_string());
        let parsed = Arc::new(schema);

        let mut cache = self.cache.lock().unwrap();
        Ok(Arc::clone(
            cache
                .entry(location.to_string())
                .or_insert(parsed),
        ))
    }
}

/// Resolve a raw schema against a loader, using a private registry
pub fn resolve(raw: Schema, loader: &dyn SchemaLoader) -> Result<ResolvedSchema> {
    let registry = SchemaRegistry::new();
    Resolver::new(loader, &registry).resolve(raw)
}

/// Resolve a schema that references no external documents
///
/// Any import/include location encountered is an error.
pub fn resolve_standalone(raw: Schema) -> Result<ResolvedSchema> {
    let deny = |location: &str| -> Result<String> {
        Err(Error::Resource(format!(
            "Schema references external location '{}' but no loader is configured",
            location
        )))
    };
    resolve(raw, &deny)
}

/// The reference resolver
pub struct Resolver<'a> {
    loader: &'a dyn SchemaLoader,
    registry: &'a SchemaRegistry,
    limits: Limits,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over an injected loader and registry
    pub fn new(loader: &'a dyn SchemaLoader, registry: &'a SchemaRegistry) -> Self {
        Self {
            loader,
            registry,
            limits: Limits::default(),
        }
    }

    /// Replace the processing limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Resolve every reference in `raw` across its transitive
    /// import/include/redefine/override graph
    pub fn resolve(&self, raw: Schema) -> Result<ResolvedSchema> {
        let root = Arc::new(raw);
        let merged = self.collect_merged(&root)?;

        let types = {
            let lookup = Lookup::build(&root, &merged);

            let mut types: IndexMap<String, ResolvedType> = IndexMap::new();

            // Redefinitions first, so the post-redefinition binding owns
            // the qualified key and loaded originals cannot overwrite it.
            for schema in std::iter::once(root.as_ref()).chain(merged.iter().map(|s| s.as_ref())) {
                for directive in &schema.directives {
                    let set = match directive {
                        Directive::Redefine { redefinitions, .. } => redefinitions,
                        Directive::Override { overrides, .. } => overrides,
                        _ => continue,
                    };
                    for ct in &set.complex_types {
                        self.insert_resolved(&lookup, schema, ct, &mut types)?;
                    }
                }
            }

            for schema in std::iter::once(root.as_ref()).chain(merged.iter().map(|s| s.as_ref())) {
                for ct in &schema.complex_types {
                    self.insert_resolved(&lookup, schema, ct, &mut types)?;
                }
            }

            // Top-level element type references must resolve as well;
            // failures here are resolution errors, not codec errors.
            for schema in std::iter::once(root.as_ref()).chain(merged.iter().map(|s| s.as_ref())) {
                for elem in &schema.elements {
                    self.check_element(&lookup, schema, elem)?;
                }
            }

            types
        };

        Ok(ResolvedSchema {
            schema: root,
            merged,
            types,
        })
    }

    /// Worklist traversal of the directive graph, cycle-safe
    fn collect_merged(&self, root: &Arc<Schema>) -> Result<Vec<Arc<Schema>>> {
        let mut merged: Vec<Arc<Schema>> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        if let Some(loc) = &root.location {
            visited.insert(loc.clone());
        }

        let mut pending: VecDeque<(Arc<Schema>, Option<String>, usize)> = VecDeque::new();
        pending.push_back((Arc::clone(root), root.target_namespace.clone(), 0));

        while let Some((schema, parent_ns, depth)) = pending.pop_front() {
            for directive in &schema.directives {
                let location = match directive.location() {
                    Some(loc) => loc.to_string(),
                    // An import without a location hint resolves against
                    // schemas already merged under that namespace.
                    None => continue,
                };

                if !visited.insert(location.clone()) {
                    continue;
                }

                self.limits.check_schema_depth(depth + 1)?;
                let loaded = self.registry.get_or_parse(&location, self.loader)?;

                // Chameleon include: a same-namespace directive target
                // without its own targetNamespace adopts the includer's.
                let adopted = match (&loaded.target_namespace, directive) {
                    (None, Directive::Include { .. })
                    | (None, Directive::Redefine { .. })
                    | (None, Directive::Override { .. }) => {
                        let includer_ns = schema.target_namespace.clone().or(parent_ns.clone());
                        match includer_ns {
                            Some(ns) => {
                                let mut clone = (*loaded).clone();
                                clone.target_namespace = Some(ns);
                                Arc::new(clone)
                            }
                            None => loaded,
                        }
                    }
                    _ => loaded,
                };

                pending.push_back((
                    Arc::clone(&adopted),
                    adopted.target_namespace.clone(),
                    depth + 1,
                ));
                merged.push(adopted);
            }
        }

        Ok(merged)
    }

    fn insert_resolved(
        &self,
        lookup: &Lookup<'_>,
        schema: &Schema,
        ct: &ComplexType,
        types: &mut IndexMap<String, ResolvedType>,
    ) -> Result<()> {
        let name = match &ct.name {
            Some(n) => n.clone(),
            None => return Ok(()),
        };
        let key = qualified_key(schema.target_namespace.as_deref(), &name);
        if types.contains_key(&key) {
            return Ok(());
        }

        let mut stack = Vec::new();
        let fields = linearize_with(lookup, schema, ct, &mut stack)?;
        types.insert(
            key,
            ResolvedType {
                name,
                namespace: schema.target_namespace.clone(),
                fields,
                mixed: ct.mixed,
            },
        );
        Ok(())
    }

    fn check_element(
        &self,
        lookup: &Lookup<'_>,
        schema: &Schema,
        elem: &ElementDecl,
    ) -> Result<()> {
        if let Some(type_name) = &elem.type_name {
            lookup.require_type(schema, type_name)?;
        }
        if let Some(inline) = &elem.inline_complex {
            let mut stack = Vec::new();
            linearize_with(lookup, schema, inline, &mut stack)?;
        }
        Ok(())
    }
}

/// Linearize an anonymous (inline) complex type against an already
/// resolved schema
///
/// Named types should go through [`ResolvedSchema::resolved_type`] instead;
/// this rebuilds the merged lookup for types the side table cannot key.
pub fn linearize_inline(resolved: &ResolvedSchema, ct: &ComplexType) -> Result<Vec<Field>> {
    let lookup = Lookup::build(&resolved.schema, &resolved.merged);
    let mut stack = Vec::new();
    linearize_with(&lookup, &resolved.schema, ct, &mut stack)
}

/// One entry in the merged complex-type table
struct TypeBinding<'a> {
    decl: &'a ComplexType,
    schema: &'a Schema,
    /// For redefinitions: the frozen pre-redefinition declaration, used
    /// when the redefined type's base names itself
    scoped_base: Option<(&'a ComplexType, &'a Schema)>,
}

/// Namespaces a reference written in `schema` may point into, in lookup order
///
/// A prefixed name resolves through the schema's prefix map; an unprefixed
/// name tries the default namespace, the schema's target namespace, then
/// no namespace.
pub(crate) fn reference_namespaces(schema: &Schema, reference: &str) -> Vec<Option<String>> {
    let (prefix, _) = split_qname(reference);
    match prefix {
        Some(p) => vec![schema.prefixes.namespace_for(p).map(|s| s.to_string())],
        None => {
            let mut namespaces: Vec<Option<String>> = Vec::new();
            if let Some(default) = schema.prefixes.default_namespace() {
                namespaces.push(Some(default.to_string()));
            }
            if let Some(target) = schema.target_namespace.as_deref() {
                namespaces.push(Some(target.to_string()));
            }
            namespaces.push(None);
            namespaces
        }
    }
}

/// Namespace-qualified lookup tables over the merged graph
struct Lookup<'a> {
    complex_types: HashMap<String, TypeBinding<'a>>,
    simple_types: HashMap<String, &'a SimpleType>,
    elements: HashMap<String, (&'a ElementDecl, &'a Schema)>,
    attributes: HashMap<String, (&'a AttributeDecl, &'a Schema)>,
    groups: HashMap<String, (&'a Group, &'a Schema)>,
    attribute_groups: HashMap<String, (&'a crate::model::AttributeGroup, &'a Schema)>,
}

impl<'a> Lookup<'a> {
    /// Build the lookup tables, redefinitions layered over plain
    /// declarations
    fn build(root: &'a Arc<Schema>, merged: &'a [Arc<Schema>]) -> Self {
        let mut lookup = Lookup {
            complex_types: HashMap::new(),
            simple_types: HashMap::new(),
            elements: HashMap::new(),
            attributes: HashMap::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
        };

        let schemas: Vec<&'a Schema> = std::iter::once(root.as_ref())
            .chain(merged.iter().map(|s| s.as_ref()))
            .collect();

        // Redefinitions claim their qualified names first so that later
        // plain declarations (the pre-redefinition originals) do not
        // shadow them.
        for schema in &schemas {
            for directive in &schema.directives {
                let (set, location) = match directive {
                    Directive::Redefine {
                        redefinitions,
                        location,
                    } => (redefinitions, location),
                    Directive::Override {
                        overrides,
                        location,
                    } => (overrides, location),
                    _ => continue,
                };
                let target = schemas
                    .iter()
                    .find(|s| s.location.as_deref() == Some(location.as_str()))
                    .copied();
                lookup.insert_redefine_set(schema, set, target);
            }
        }

        for schema in &schemas {
            lookup.insert_schema(schema);
        }

        lookup
    }

    fn insert_redefine_set(
        &mut self,
        owner: &'a Schema,
        set: &'a RedefineSet,
        target: Option<&'a Schema>,
    ) {
        for ct in &set.complex_types {
            if let Some(name) = &ct.name {
                let key = qualified_key(owner.target_namespace.as_deref(), name);
                let scoped_base = target.and_then(|t| {
                    t.find_complex_type(name).map(|decl| (decl, t))
                });
                self.complex_types.entry(key).or_insert(TypeBinding {
                    decl: ct,
                    schema: owner,
                    scoped_base,
                });
            }
        }
        for st in &set.simple_types {
            if let Some(name) = &st.name {
                let key = qualified_key(owner.target_namespace.as_deref(), name);
                self.simple_types.entry(key).or_insert(st);
            }
        }
        for group in &set.groups {
            let key = qualified_key(owner.target_namespace.as_deref(), &group.name);
            self.groups.entry(key).or_insert((group, owner));
        }
        for ag in &set.attribute_groups {
            let key = qualified_key(owner.target_namespace.as_deref(), &ag.name);
            self.attribute_groups.entry(key).or_insert((ag, owner));
        }
    }

    fn insert_schema(&mut self, schema: &'a Schema) {
        let ns = schema.target_namespace.as_deref();
        for ct in &schema.complex_types {
            if let Some(name) = &ct.name {
                self.complex_types
                    .entry(qualified_key(ns, name))
                    .or_insert(TypeBinding {
                        decl: ct,
                        schema,
                        scoped_base: None,
                    });
            }
        }
        for st in &schema.simple_types {
            if let Some(name) = &st.name {
                self.simple_types
                    .entry(qualified_key(ns, name))
                    .or_insert(st);
            }
        }
        for elem in &schema.elements {
            if let Some(name) = &elem.name {
                self.elements
                    .entry(qualified_key(ns, name))
                    .or_insert((elem, schema));
            }
        }
        for attr in &schema.attributes {
            if let Some(name) = &attr.name {
                self.attributes
                    .entry(qualified_key(ns, name))
                    .or_insert((attr, schema));
            }
        }
        for group in &schema.groups {
            self.groups
                .entry(qualified_key(ns, &group.name))
                .or_insert((group, schema));
        }
        for ag in &schema.attribute_groups {
            self.attribute_groups
                .entry(qualified_key(ns, &ag.name))
                .or_insert((ag, schema));
        }
    }

    /// Candidate qualified keys for a reference as written in `schema`
    fn candidate_keys(schema: &Schema, reference: &str) -> Vec<String> {
        let (_, local) = split_qname(reference);
        reference_namespaces(schema, reference)
            .iter()
            .map(|ns| qualified_key(ns.as_deref(), local))
            .collect()
    }

    /// Namespace a reference points into, for error reporting
    fn referenced_namespace(schema: &Schema, reference: &str) -> Option<String> {
        reference_namespaces(schema, reference)
            .into_iter()
            .next()
            .flatten()
    }

    /// Whether a reference targets an XSD built-in type
    fn is_builtin(schema: &Schema, reference: &str) -> bool {
        let (prefix, _) = split_qname(reference);
        match prefix {
            Some(p) => schema.prefixes.namespace_for(p) == Some(XSD_NAMESPACE),
            None => schema.prefixes.default_namespace() == Some(XSD_NAMESPACE),
        }
    }

    fn find_complex_type(&self, schema: &Schema, reference: &str) -> Option<&TypeBinding<'a>> {
        Self::candidate_keys(schema, reference)
            .iter()
            .find_map(|key| self.complex_types.get(key))
    }

    fn find_simple_type(&self, schema: &Schema, reference: &str) -> Option<&'a SimpleType> {
        Self::candidate_keys(schema, reference)
            .iter()
            .find_map(|key| self.simple_types.get(key))
            .copied()
    }

    fn find_element(&self, schema: &Schema, reference: &str) -> Option<(&'a ElementDecl, &'a Schema)> {
        Self::candidate_keys(schema, reference)
            .iter()
            .find_map(|key| self.elements.get(key))
            .copied()
    }

    fn find_attribute(
        &self,
        schema: &Schema,
        reference: &str,
    ) -> Option<(&'a AttributeDecl, &'a Schema)> {
        Self::candidate_keys(schema, reference)
            .iter()
            .find_map(|key| self.attributes.get(key))
            .copied()
    }

    fn find_group(&self, schema: &Schema, reference: &str) -> Option<(&'a Group, &'a Schema)> {
        Self::candidate_keys(schema, reference)
            .iter()
            .find_map(|key| self.groups.get(key))
            .copied()
    }

    fn find_attribute_group(
        &self,
        schema: &Schema,
        reference: &str,
    ) -> Option<(&'a crate::model::AttributeGroup, &'a Schema)> {
        Self::candidate_keys(schema, reference)
            .iter()
            .find_map(|key| self.attribute_groups.get(key))
            .copied()
    }

    /// Require a type reference to resolve (builtin, complex or simple)
    fn require_type(&self, schema: &Schema, reference: &str) -> Result<()> {
        if Self::is_builtin(schema, reference)
            || self.find_complex_type(schema, reference).is_some()
            || self.find_simple_type(schema, reference).is_some()
        {
            Ok(())
        } else {
            let mut err = MissingTypeError::new(reference).with_kind("type");
            if let Some(ns) = Self::referenced_namespace(schema, reference) {
                err = err.expected_in(ns);
            }
            Err(err.into())
        }
    }
}

/// Linearize a complex type into its ordered field list:
/// inherited fields first (in the base type's order), then the type's own
fn linearize_with(
    lookup: &Lookup<'_>,
    schema: &Schema,
    ct: &ComplexType,
    stack: &mut Vec<String>,
) -> Result<Vec<Field>> {
    let mut fields = Vec::new();

    if let Some(derivation) = &ct.derivation {
        let self_named = ct
            .name
            .as_deref()
            .map(|n| n == local_name(&derivation.base))
            .unwrap_or(false);

        // A redefine target whose base equals its own name binds to the
        // pre-redefinition declaration, never the final merged one.
        let scoped = if self_named {
            ct.name.as_deref().and_then(|n| {
                let key = qualified_key(schema.target_namespace.as_deref(), n);
                lookup
                    .complex_types
                    .get(&key)
                    .and_then(|binding| binding.scoped_base)
            })
        } else {
            None
        };

        let base_binding = match scoped {
            Some((decl, base_schema)) => Some((decl, base_schema)),
            None => lookup
                .find_complex_type(schema, &derivation.base)
                .map(|b| (b.decl, b.schema)),
        };

        match base_binding {
            Some((base_decl, base_schema)) => {
                let guard = qualified_key(
                    base_schema.target_namespace.as_deref(),
                    base_decl.name.as_deref().unwrap_or(""),
                );
                if stack.contains(&guard) {
                    return Err(SchemaParseError::new(format!(
                        "Derivation cycle through type '{}'",
                        derivation.base
                    ))
                    .into());
                }
                stack.push(guard);
                let inherited = linearize_with(lookup, base_schema, base_decl, stack)?;
                stack.pop();
                fields.extend(inherited);
            }
            None => {
                // Simple or builtin bases contribute no fields, but the
                // reference still has to exist somewhere.
                if !Lookup::is_builtin(schema, &derivation.base)
                    && lookup.find_simple_type(schema, &derivation.base).is_none()
                {
                    let mut err = MissingTypeError::new(derivation.base.clone())
                        .with_kind(match derivation.method {
                            DerivationMethod::Extension => "extension base",
                            DerivationMethod::Restriction => "restriction base",
                        });
                    if let Some(ns) = Lookup::referenced_namespace(schema, &derivation.base) {
                        err = err.expected_in(ns);
                    }
                    return Err(err.into());
                }
            }
        }
    }

    collect_attribute_fields(lookup, schema, &ct.attributes, &ct.attribute_group_refs, &mut fields, &mut Vec::new())?;

    if let Some(content) = &ct.content {
        collect_element_fields(lookup, schema, content, &mut fields, stack, false)?;
    }

    Ok(fields)
}

/// Expand attributes and attributeGroup references into attribute fields
fn collect_attribute_fields(
    lookup: &Lookup<'_>,
    schema: &Schema,
    attributes: &[AttributeDecl],
    group_refs: &[String],
    fields: &mut Vec<Field>,
    seen_groups: &mut Vec<String>,
) -> Result<()> {
    for attr in attributes {
        if attr.use_mode == AttributeUse::Prohibited {
            continue;
        }
        fields.push(Field::Attribute(resolve_attribute(lookup, schema, attr)?));
    }

    for group_ref in group_refs {
        match lookup.find_attribute_group(schema, group_ref) {
            Some((group, group_schema)) => {
                if seen_groups.contains(group_ref) {
                    continue;
                }
                seen_groups.push(group_ref.clone());
                collect_attribute_fields(
                    lookup,
                    group_schema,
                    &group.attributes,
                    &group.attribute_group_refs,
                    fields,
                    seen_groups,
                )?;
            }
            None => {
                let mut err = MissingTypeError::new(group_ref.clone()).with_kind("attributeGroup");
                if let Some(ns) = Lookup::referenced_namespace(schema, group_ref) {
                    err = err.expected_in(ns);
                }
                return Err(err.into());
            }
        }
    }

    Ok(())
}

/// Resolve one attribute declaration, following refs
///
/// An unresolvable `ref` does not fail: it falls back to an optional
/// attribute named after the ref's literal local name. This mirrors
/// observed behavior of schema consumers in the wild and is flagged on the
/// declaration via `from_unresolved_ref`.
fn resolve_attribute(
    lookup: &Lookup<'_>,
    schema: &Schema,
    attr: &AttributeDecl,
) -> Result<AttributeDecl> {
    if let Some(ref_name) = &attr.ref_name {
        return Ok(match lookup.find_attribute(schema, ref_name) {
            Some((target, _)) => {
                let mut resolved = target.clone();
                if attr.use_mode != AttributeUse::Optional {
                    resolved.use_mode = attr.use_mode;
                }
                if attr.default.is_some() {
                    resolved.default = attr.default.clone();
                }
                if attr.fixed.is_some() {
                    resolved.fixed = attr.fixed.clone();
                }
                resolved
            }
            None => AttributeDecl {
                name: Some(local_name(ref_name).to_string()),
                use_mode: attr.use_mode,
                from_unresolved_ref: true,
                ..Default::default()
            },
        });
    }

    if let Some(type_name) = &attr.type_name {
        if !Lookup::is_builtin(schema, type_name)
            && lookup.find_simple_type(schema, type_name).is_none()
        {
            let mut err = MissingTypeError::new(type_name.clone()).with_kind("attribute type");
            if let Some(ns) = Lookup::referenced_namespace(schema, type_name) {
                err = err.expected_in(ns);
            }
            return Err(err.into());
        }
    }

    Ok(attr.clone())
}

/// Flatten a content particle into element fields
///
/// `enclosing_repeats` carries repetition inward: an element inside a
/// non-repeating nested particle under a repeating outer one still
/// occurs more than once in instances.
fn collect_element_fields(
    lookup: &Lookup<'_>,
    schema: &Schema,
    particle: &Particle,
    fields: &mut Vec<Field>,
    stack: &mut Vec<String>,
    enclosing_repeats: bool,
) -> Result<()> {
    if particle.kind == ParticleKind::Choice {
        let mut branches = Vec::new();
        collect_choice_branches(lookup, schema, particle, &mut branches, stack)?;
        fields.push(Field::Choice(branches));
        return Ok(());
    }

    let particle_repeats = enclosing_repeats || particle.occurs.is_repeatable();

    for item in &particle.items {
        match item {
            ParticleItem::Element(decl) => {
                fields.push(element_field(lookup, schema, decl, particle_repeats, stack)?);
            }
            ParticleItem::GroupRef { name, occurs } => {
                let (group, group_schema) = require_group(lookup, schema, name)?;
                let key = qualified_key(group_schema.target_namespace.as_deref(), &group.name);
                if stack.contains(&key) {
                    continue;
                }
                stack.push(key);
                let mut inner = group.particle.clone();
                if occurs.is_repeatable() {
                    inner.occurs = *occurs;
                }
                collect_element_fields(lookup, group_schema, &inner, fields, stack, particle_repeats)?;
                stack.pop();
            }
            ParticleItem::Nested(nested) => {
                collect_element_fields(lookup, schema, nested, fields, stack, particle_repeats)?;
            }
            // Wildcards contribute no named fields.
            ParticleItem::Any { .. } => {}
        }
    }

    Ok(())
}

/// Collect the element alternatives of a choice particle
fn collect_choice_branches(
    lookup: &Lookup<'_>,
    schema: &Schema,
    particle: &Particle,
    branches: &mut Vec<ElementDecl>,
    stack: &mut Vec<String>,
) -> Result<()> {
    for item in &particle.items {
        match item {
            ParticleItem::Element(decl) => {
                branches.push(resolve_element(lookup, schema, decl, stack)?);
            }
            ParticleItem::GroupRef { name, .. } => {
                let (group, group_schema) = require_group(lookup, schema, name)?;
                collect_choice_branches(lookup, group_schema, &group.particle, branches, stack)?;
            }
            ParticleItem::Nested(nested) => {
                collect_choice_branches(lookup, schema, nested, branches, stack)?;
            }
            ParticleItem::Any { .. } => {}
        }
    }
    Ok(())
}

fn require_group<'l>(
    lookup: &'l Lookup<'_>,
    schema: &Schema,
    name: &str,
) -> Result<(&'l Group, &'l Schema)> {
    lookup.find_group(schema, name).ok_or_else(|| {
        let mut err = MissingTypeError::new(name.to_string()).with_kind("group");
        if let Some(ns) = Lookup::referenced_namespace(schema, name) {
            err = err.expected_in(ns);
        }
        err.into()
    })
}

/// Classify an element declaration as a single or repeated field
fn element_field(
    lookup: &Lookup<'_>,
    schema: &Schema,
    decl: &ElementDecl,
    enclosing_repeats: bool,
    stack: &mut Vec<String>,
) -> Result<Field> {
    let resolved = resolve_element(lookup, schema, decl, stack)?;
    if resolved.occurs.is_repeatable() || enclosing_repeats {
        Ok(Field::Repeated(resolved))
    } else {
        Ok(Field::Single(resolved))
    }
}

/// Resolve one element declaration, following refs and checking its type
fn resolve_element(
    lookup: &Lookup<'_>,
    schema: &Schema,
    decl: &ElementDecl,
    stack: &mut Vec<String>,
) -> Result<ElementDecl> {
    if let Some(ref_name) = &decl.ref_name {
        let (target, target_schema) = lookup.find_element(schema, ref_name).ok_or_else(|| {
            let mut err = MissingTypeError::new(ref_name.clone()).with_kind("element");
            if let Some(ns) = Lookup::referenced_namespace(schema, ref_name) {
                err = err.expected_in(ns);
            }
            Error::from(err)
        })?;
        let mut resolved = target.clone();
        // The referencing site controls the occurrence range.
        resolved.occurs = decl.occurs;
        // Top-level elements are always qualified by their schema's
        // target namespace.
        resolved.namespace = target_schema.target_namespace.clone();
        stamp_type_namespace(lookup, target_schema, &mut resolved);
        return Ok(resolved);
    }

    if let Some(type_name) = &decl.type_name {
        lookup.require_type(schema, type_name)?;
    }
    if let Some(inline) = &decl.inline_complex {
        linearize_with(lookup, schema, inline, stack)?;
    }

    let mut resolved = decl.clone();
    if schema.element_form_default.is_qualified() {
        resolved.namespace = schema.target_namespace.clone();
    }
    stamp_type_namespace(lookup, schema, &mut resolved);
    Ok(resolved)
}

/// Record the namespace an element's declared type was found in, so the
/// codec can bind the exact qualified type rather than a local-name match
fn stamp_type_namespace(lookup: &Lookup<'_>, schema: &Schema, decl: &mut ElementDecl) {
    if let Some(type_name) = &decl.type_name {
        if let Some(binding) = lookup.find_complex_type(schema, type_name) {
            decl.type_namespace = binding.schema.target_namespace.clone();
        }
    }
}
