//! Query operations over raw and resolved schemas
//!
//! These are the lookups downstream code generators consume: find a named
//! declaration, or walk the fully linearized (inheritance-flattened) field
//! list of a complex type.

use super::schema::{ResolvedSchema, Schema};
use super::types::{
    AttributeDecl, AttributeGroup, ComplexType, ElementDecl, Field, Group, SimpleType,
};

impl Schema {
    /// Find a named complex type declared in this document
    pub fn find_complex_type(&self, name: &str) -> Option<&ComplexType> {
        self.complex_types
            .iter()
            .find(|t| t.name.as_deref() == Some(name))
    }

    /// Find a named simple type declared in this document
    pub fn find_simple_type(&self, name: &str) -> Option<&SimpleType> {
        self.simple_types
            .iter()
            .find(|t| t.name.as_deref() == Some(name))
    }

    /// Find a top-level element declared in this document
    pub fn find_element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
    }

    /// Find a top-level attribute declared in this document
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
    }

    /// Find a named group declared in this document
    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Find a named attribute group declared in this document
    pub fn find_attribute_group(&self, name: &str) -> Option<&AttributeGroup> {
        self.attribute_groups.iter().find(|g| g.name == name)
    }
}

impl ResolvedSchema {
    /// Find a named complex type in the root schema or any merged schema
    ///
    /// The root schema wins on name collisions, so redefined types shadow
    /// the definitions they were built from.
    pub fn find_complex_type(&self, name: &str) -> Option<&ComplexType> {
        self.all_schemas().find_map(|s| s.find_complex_type(name))
    }

    /// Find a named simple type in the root schema or any merged schema
    pub fn find_simple_type(&self, name: &str) -> Option<&SimpleType> {
        self.all_schemas().find_map(|s| s.find_simple_type(name))
    }

    /// Find a top-level element in the root schema or any merged schema
    pub fn find_element(&self, name: &str) -> Option<&ElementDecl> {
        self.all_schemas().find_map(|s| s.find_element(name))
    }

    /// Find a top-level element together with the schema declaring it
    pub fn find_element_entry(&self, name: &str) -> Option<(&ElementDecl, &Schema)> {
        self.all_schemas()
            .find_map(|s| s.find_element(name).map(|decl| (decl, s)))
    }

    /// Find a top-level attribute in the root schema or any merged schema
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.all_schemas().find_map(|s| s.find_attribute(name))
    }

    /// Find a named group in the root schema or any merged schema
    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.all_schemas().find_map(|s| s.find_group(name))
    }

    /// Find a named attribute group in the root schema or any merged schema
    pub fn find_attribute_group(&self, name: &str) -> Option<&AttributeGroup> {
        self.all_schemas().find_map(|s| s.find_attribute_group(name))
    }

    /// Linearized fields of a named complex type: inherited fields first
    /// (in the base type's declared order), then the type's own fields
    pub fn fields(&self, type_name: &str) -> Option<&[Field]> {
        self.resolved_type_by_local_name(type_name)
            .map(|t| t.fields.as_slice())
    }

    /// Walk the fully linearized attribute list of a named complex type,
    /// inherited attributes first
    pub fn walk_attributes(&self, type_name: &str) -> impl Iterator<Item = &AttributeDecl> {
        self.fields(type_name)
            .unwrap_or(&[])
            .iter()
            .filter_map(|f| match f {
                Field::Attribute(a) => Some(a),
                _ => None,
            })
    }

    /// Walk the fully linearized element fields of a named complex type,
    /// inherited elements first
    pub fn walk_elements(&self, type_name: &str) -> impl Iterator<Item = &Field> {
        self.fields(type_name)
            .unwrap_or(&[])
            .iter()
            .filter(|f| !matches!(f, Field::Attribute(_)))
    }
}
