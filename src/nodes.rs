//! Generic XML node trees
//!
//! The schema parser and instance codec never touch a concrete XML reader
//! directly; they see documents through the narrow [`NodeView`] interface
//! (local name, namespace, attribute map, ordered children, text). Two
//! backends are provided: an owned [`XmlNode`] tree built with quick-xml,
//! and an adapter over `roxmltree`'s arena-allocated nodes.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::PrefixMap;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Read-only view of an XML element node
///
/// Implemented for `&XmlNode` and for `roxmltree::Node`, both of which are
/// cheap to clone, so `children` hands out values rather than references.
pub trait NodeView: Clone {
    /// Local (unprefixed) element name
    fn local_name(&self) -> &str;

    /// Namespace URI the element is bound to
    fn namespace(&self) -> Option<&str>;

    /// Attribute value by local name (namespace declarations excluded)
    fn attribute(&self, name: &str) -> Option<&str>;

    /// All attributes in document order as (local name, value) pairs
    fn attributes(&self) -> Vec<(String, String)>;

    /// Element children in document order
    fn children(&self) -> Vec<Self>;

    /// Text content directly inside this element
    fn text(&self) -> Option<&str>;

    /// Namespace declarations appearing on this element, as
    /// (prefix, URI) pairs; `None` prefix is the default namespace
    fn namespace_declarations(&self) -> Vec<(Option<String>, String)>;
}

/// Owned XML element tree
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    /// Local element name
    pub local_name: String,
    /// Resolved namespace URI
    pub namespace: Option<String>,
    /// Attributes in document order, keyed by local name
    pub attributes: IndexMap<String, String>,
    /// Namespace declarations made on this element
    pub prefix_map: PrefixMap,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Create a new element node with no namespace
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            namespace: None,
            attributes: IndexMap::new(),
            prefix_map: PrefixMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::from_string_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from a string, enforcing the given limits
    pub fn from_string_with_limits(xml: &str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        // Stack of in-scope prefix bindings; each entry is the cumulative
        // context for one open element.
        let mut ns_stack: Vec<PrefixMap> = vec![PrefixMap::new()];
        let mut element_stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    let (node, ctx) = parse_start(&e, ns_stack.last().unwrap())?;
                    ns_stack.push(ctx);
                    element_stack.push(node);
                }
                Ok(Event::End(_)) => {
                    ns_stack.pop();
                    if let Some(current) = element_stack.pop() {
                        if let Some(parent) = element_stack.last_mut() {
                            parent.children.push(current);
                        } else {
                            root = Some(current);
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    let (node, _) = parse_start(&e, ns_stack.last().unwrap())?;
                    if let Some(parent) = element_stack.last_mut() {
                        parent.children.push(node);
                    } else {
                        root = Some(node);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?
                            .to_string();
                        if !text.trim().is_empty() {
                            current.text = Some(text);
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = String::from_utf8_lossy(e.as_ref()).to_string();
                        if !text.trim().is_empty() {
                            current.text = Some(text);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // comments, processing instructions, declarations
            }
            buf.clear();
        }

        root.ok_or_else(|| Error::Xml("Document has no root element".to_string()))
    }

    /// Attribute value by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Child elements with the given local name
    pub fn find_children(&self, local_name: &str) -> Vec<&XmlNode> {
        self.children
            .iter()
            .filter(|c| c.local_name == local_name)
            .collect()
    }
}

/// Build a node from a start tag, resolving its namespace against the
/// enclosing context plus its own declarations
fn parse_start(start: &BytesStart, parent_ctx: &PrefixMap) -> Result<(XmlNode, PrefixMap)> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
        .to_string();

    let mut ctx = parent_ctx.clone();
    let mut attributes = IndexMap::new();
    let mut prefix_map = PrefixMap::new();

    for attr_result in start.attributes() {
        let attr =
            attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
        let attr_name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;
        let attr_value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
            .to_string();

        if attr_name == "xmlns" {
            prefix_map.set_default(&attr_value);
            ctx.set_default(attr_value);
        } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
            prefix_map.declare(prefix, &attr_value);
            ctx.declare(prefix, attr_value);
        } else {
            // Attribute names are stored by local name; prefixed
            // attributes are rare in schema documents.
            let local = attr_name.split_once(':').map(|(_, l)| l).unwrap_or(attr_name);
            attributes.insert(local.to_string(), attr_value);
        }
    }

    let qname = ctx.resolve(&name)?;

    let node = XmlNode {
        local_name: qname.local_name,
        namespace: qname.namespace,
        attributes,
        prefix_map,
        text: None,
        children: Vec::new(),
    };

    Ok((node, ctx))
}

impl<'a> NodeView for &'a XmlNode {
    fn local_name(&self) -> &str {
        &self.local_name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        XmlNode::attribute(self, name)
    }

    fn attributes(&self) -> Vec<(String, String)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn children(&self) -> Vec<Self> {
        self.children.iter().collect()
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn namespace_declarations(&self) -> Vec<(Option<String>, String)> {
        let mut decls = Vec::new();
        if let Some(default) = self.prefix_map.default_namespace() {
            decls.push((None, default.to_string()));
        }
        for (prefix, ns) in self.prefix_map.iter() {
            decls.push((Some(prefix.to_string()), ns.to_string()));
        }
        decls
    }
}

impl<'a, 'input> NodeView for roxmltree::Node<'a, 'input> {
    fn local_name(&self) -> &str {
        self.tag_name().name()
    }

    fn namespace(&self) -> Option<&str> {
        self.tag_name().namespace()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        roxmltree::Node::attribute(self, name)
    }

    fn attributes(&self) -> Vec<(String, String)> {
        roxmltree::Node::attributes(self)
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect()
    }

    fn children(&self) -> Vec<Self> {
        roxmltree::Node::children(self)
            .filter(|c| c.is_element())
            .collect()
    }

    fn text(&self) -> Option<&str> {
        roxmltree::Node::text(self).filter(|t| !t.trim().is_empty())
    }

    fn namespace_declarations(&self) -> Vec<(Option<String>, String)> {
        self.namespaces()
            .map(|ns| (ns.name().map(|n| n.to_string()), ns.uri().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let node = XmlNode::from_string(xml).unwrap();

        assert_eq!(node.local_name, "root");
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].local_name, "child");
        assert_eq!(node.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<root attr1="value1" attr2="value2"><child/></root>"#;
        let node = XmlNode::from_string(xml).unwrap();

        assert_eq!(node.attribute("attr1"), Some("value1"));
        assert_eq!(node.attribute("attr2"), Some("value2"));
    }

    #[test]
    fn test_namespace_resolution() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="a"/>
        </xs:schema>"#;
        let node = XmlNode::from_string(xml).unwrap();

        assert_eq!(node.local_name, "schema");
        assert_eq!(
            node.namespace.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert_eq!(node.children[0].local_name, "element");
        assert_eq!(
            node.children[0].namespace.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema")
        );
    }

    #[test]
    fn test_default_namespace_inherited() {
        let xml = r#"<root xmlns="http://example.com"><child/></root>"#;
        let node = XmlNode::from_string(xml).unwrap();

        assert_eq!(node.namespace.as_deref(), Some("http://example.com"));
        assert_eq!(
            node.children[0].namespace.as_deref(),
            Some("http://example.com")
        );
    }

    #[test]
    fn test_unknown_prefix_is_error() {
        let xml = r#"<xs:schema/>"#;
        assert!(XmlNode::from_string(xml).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut xml = String::new();
        for _ in 0..150 {
            xml.push_str("<a>");
        }
        for _ in 0..150 {
            xml.push_str("</a>");
        }
        let result = XmlNode::from_string_with_limits(&xml, &Limits::strict());
        assert!(result.is_err());
    }

    #[test]
    fn test_node_view_over_xmlnode() {
        let xml = r#"<root a="1"><x/><y/><x/></root>"#;
        let node = XmlNode::from_string(xml).unwrap();
        let view = &node;

        assert_eq!(NodeView::local_name(&view), "root");
        assert_eq!(NodeView::attribute(&view, "a"), Some("1"));
        assert_eq!(view.children().len(), 3);
        assert_eq!(view.children()[2].local_name(), "x");
    }

    #[test]
    fn test_node_view_over_roxmltree() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="a"/>
        </xs:schema>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert_eq!(NodeView::local_name(&root), "schema");
        assert_eq!(
            NodeView::namespace(&root),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        let children = NodeView::children(&root);
        assert_eq!(children.len(), 1);
        assert_eq!(NodeView::attribute(&children[0], "name"), Some("a"));
    }
}
