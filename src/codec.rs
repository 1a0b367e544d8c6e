//! Schema-driven instance codec
//!
//! Decodes XML instance documents into JSON values and encodes them back,
//! steered entirely by a resolved schema: no generated code, no
//! per-schema configuration. Field lists produced by the resolver decide
//! which children become object members, which become arrays, and how
//! text is coerced into typed scalars.

use crate::builder::BuildOptions;
use crate::error::{ElementNotFoundError, Error, Result};
use crate::model::{AttributeDecl, ElementDecl, Field, ResolvedSchema, Schema};
use crate::names::local_name;
use crate::nodes::{NodeView, XmlNode};
use crate::resolver::{linearize_inline, reference_namespaces};
use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

/// Key under which mixed-content text is stored in decoded objects
pub const TEXT_KEY: &str = "$";

/// Decode an XML instance document against a resolved schema
///
/// `element_name` selects the top-level element declaration to decode
/// against. The document root must carry the same local name.
pub fn decode(resolved: &ResolvedSchema, element_name: &str, xml: &str) -> Result<Value> {
    let (decl, declared_in) = find_top_element(resolved, element_name)?;
    let root = XmlNode::from_string(xml)?;
    if root.local_name != element_name {
        return Err(Error::Decode(format!(
            "Document root '{}' does not match requested element '{}'",
            root.local_name, element_name
        )));
    }
    decode_element(resolved, decl, &&root, Some(declared_in))
}

/// Encode a JSON value as an XML instance document
pub fn encode(
    resolved: &ResolvedSchema,
    element_name: &str,
    value: &Value,
    options: &BuildOptions,
) -> Result<String> {
    let (decl, declared_in) = find_top_element(resolved, element_name)?;

    let mut writer = if options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    if options.xml_decl {
        let encoding = options.encoding.clone();
        writer
            .write_event(Event::Decl(BytesDecl::new(
                "1.0",
                Some(encoding.as_str()),
                None,
            )))
            .map_err(|e| Error::Encode(format!("Failed to write declaration: {}", e)))?;
    }

    let mut encoder = Encoder {
        resolved,
        declared_in,
        writer: &mut writer,
    };
    encoder.encode_element(element_name, decl, value, true)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Encode(format!("Encoded document is not UTF-8: {}", e)))
}

/// Encode with default output options
pub fn encode_default(resolved: &ResolvedSchema, element_name: &str, value: &Value) -> Result<String> {
    encode(resolved, element_name, value, &BuildOptions::default())
}

fn find_top_element<'a>(
    resolved: &'a ResolvedSchema,
    element_name: &str,
) -> Result<(&'a ElementDecl, &'a Schema)> {
    resolved.find_element_entry(element_name).ok_or_else(|| {
        let mut err = ElementNotFoundError::new(element_name.to_string());
        if let Some(ns) = &resolved.schema.target_namespace {
            err = err.with_namespace(ns.clone());
        }
        Error::ElementNotFound(err)
    })
}

/// Scalar coercion classes derived from a declared type's local name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Boolean,
    Integer,
    Float,
    Decimal,
    Date,
    DateTime,
    Text,
}

impl ScalarKind {
    /// Classify a type reference by its local name
    fn from_type_name(type_name: Option<&str>) -> Self {
        let local = match type_name {
            Some(name) => local_name(name),
            None => return Self::Text,
        };
        match local {
            "boolean" => Self::Boolean,
            "int" | "integer" | "long" | "short" | "byte" | "unsignedInt" | "unsignedLong"
            | "unsignedShort" | "unsignedByte" | "positiveInteger" | "negativeInteger"
            | "nonNegativeInteger" | "nonPositiveInteger" => Self::Integer,
            "float" | "double" => Self::Float,
            "decimal" => Self::Decimal,
            _ if local.ends_with("dateTime") => Self::DateTime,
            _ if local.ends_with("date") || local.ends_with("Date") => Self::Date,
            _ => Self::Text,
        }
    }
}

/// Coerce raw element or attribute text into a JSON scalar
fn decode_scalar(text: &str, kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::Boolean => match text {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            other => Value::String(other.to_string()),
        },
        ScalarKind::Integer => match text.parse::<i64>() {
            Ok(n) => Value::Number(Number::from(n)),
            Err(_) => Value::String(text.to_string()),
        },
        ScalarKind::Float => match text.parse::<f64>() {
            Ok(f) => Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(text.to_string())),
            Err(_) => Value::String(text.to_string()),
        },
        // Decimal, date and dateTime values stay textual so encoding them
        // again reproduces the input byte for byte. Parsing here is a
        // well-formedness check only; values chrono or rust_decimal
        // cannot read pass through unchanged.
        ScalarKind::Decimal => {
            let _ = Decimal::from_str(text);
            Value::String(text.to_string())
        }
        ScalarKind::Date => {
            let _ = NaiveDate::parse_from_str(text, "%Y-%m-%d");
            Value::String(text.to_string())
        }
        ScalarKind::DateTime => {
            let _ = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S");
            Value::String(text.to_string())
        }
        ScalarKind::Text => Value::String(text.to_string()),
    }
}

/// Format a JSON scalar back into XML text
fn encode_scalar(value: &Value) -> Result<String> {
    match value {
        Value::Bool(true) => Ok("true".to_string()),
        Value::Bool(false) => Ok("false".to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(Error::Encode(format!(
            "Cannot encode {} as element text",
            kind_name(other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Field list for an element declaration, or None when its type is simple
///
/// Named types bind by qualified name: the namespace stamped during
/// resolution wins, otherwise the type prefix is resolved through the
/// declaring schema's prefix map. A local name from one namespace never
/// binds a type from another.
fn fields_for(
    resolved: &ResolvedSchema,
    decl: &ElementDecl,
    declared_in: Option<&Schema>,
) -> Result<Option<FieldsInfo>> {
    if let Some(inline) = &decl.inline_complex {
        let fields = linearize_inline(resolved, inline)?;
        return Ok(Some(FieldsInfo {
            fields,
            mixed: inline.mixed,
        }));
    }
    if decl.inline_simple.is_some() {
        return Ok(None);
    }
    if let Some(type_name) = &decl.type_name {
        let local = local_name(type_name);
        let named = match (&decl.type_namespace, declared_in) {
            (Some(ns), _) => resolved.resolved_type(Some(ns), local),
            (None, Some(schema)) => reference_namespaces(schema, type_name)
                .iter()
                .find_map(|ns| resolved.resolved_type(ns.as_deref(), local)),
            (None, None) => resolved.resolved_type(None, local),
        };
        if let Some(resolved_type) = named {
            return Ok(Some(FieldsInfo {
                fields: resolved_type.fields.clone(),
                mixed: resolved_type.mixed,
            }));
        }
    }
    Ok(None)
}

struct FieldsInfo {
    fields: Vec<Field>,
    mixed: bool,
}

fn decode_element<N: NodeView>(
    resolved: &ResolvedSchema,
    decl: &ElementDecl,
    node: &N,
    declared_in: Option<&Schema>,
) -> Result<Value> {
    match fields_for(resolved, decl, declared_in)? {
        Some(info) => decode_complex(resolved, &info, node),
        None => {
            let kind = ScalarKind::from_type_name(decl.type_name.as_deref());
            let text = node.text().unwrap_or_default();
            Ok(decode_scalar(text, kind))
        }
    }
}

/// First child matching an element field, preferring an exact namespace
/// match over a bare local-name match
fn find_child<'c, N: NodeView>(children: &'c [N], elem: &ElementDecl) -> Option<&'c N> {
    let name = elem.effective_name().unwrap_or_default();
    let mut fallback = None;
    for child in children.iter().filter(|c| c.local_name() == name) {
        if child.namespace() == elem.namespace.as_deref() {
            return Some(child);
        }
        if fallback.is_none() {
            fallback = Some(child);
        }
    }
    fallback
}

/// All children matching a repeated element field, with the same
/// namespace preference as [`find_child`]
fn matching_children<'c, N: NodeView>(children: &'c [N], elem: &ElementDecl) -> Vec<&'c N> {
    let name = elem.effective_name().unwrap_or_default();
    let exact: Vec<&N> = children
        .iter()
        .filter(|c| c.local_name() == name && c.namespace() == elem.namespace.as_deref())
        .collect();
    if !exact.is_empty() {
        return exact;
    }
    children.iter().filter(|c| c.local_name() == name).collect()
}

fn decode_complex<N: NodeView>(
    resolved: &ResolvedSchema,
    info: &FieldsInfo,
    node: &N,
) -> Result<Value> {
    let mut object = Map::new();
    let children = node.children();

    for field in &info.fields {
        match field {
            Field::Attribute(attr) => {
                let name = attr.effective_name().unwrap_or_default();
                if let Some(raw) = node.attribute(name) {
                    let kind = ScalarKind::from_type_name(attr.type_name.as_deref());
                    object.insert(name.to_string(), decode_scalar(&raw, kind));
                }
            }
            Field::Single(elem) => {
                let name = elem.effective_name().unwrap_or_default();
                if let Some(child) = find_child(&children, elem) {
                    let value = decode_element(resolved, elem, child, None)?;
                    object.insert(name.to_string(), value);
                }
            }
            Field::Repeated(elem) => {
                let name = elem.effective_name().unwrap_or_default();
                let mut items = Vec::new();
                for child in matching_children(&children, elem) {
                    items.push(decode_element(resolved, elem, child, None)?);
                }
                if !items.is_empty() {
                    object.insert(name.to_string(), Value::Array(items));
                }
            }
            Field::Choice(branches) => {
                for branch in branches {
                    let name = branch.effective_name().unwrap_or_default();
                    if let Some(child) = find_child(&children, branch) {
                        let value = decode_element(resolved, branch, child, None)?;
                        object.insert(name.to_string(), value);
                        break;
                    }
                }
            }
        }
    }

    if info.mixed {
        if let Some(text) = node.text() {
            if !text.trim().is_empty() {
                object.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
            }
        }
    }

    Ok(Value::Object(object))
}

struct Encoder<'a> {
    resolved: &'a ResolvedSchema,
    /// Schema declaring the top-level element being encoded
    declared_in: &'a Schema,
    writer: &'a mut Writer<Vec<u8>>,
}

impl<'a> Encoder<'a> {
    fn encode_element(
        &mut self,
        name: &str,
        decl: &ElementDecl,
        value: &Value,
        is_root: bool,
    ) -> Result<()> {
        let mut start = BytesStart::new(name.to_string());
        if is_root {
            if let Some(target) = &self.resolved.schema.target_namespace {
                start.push_attribute(("xmlns", target.as_str()));
            }
        }

        match fields_for(self.resolved, decl, is_root.then_some(self.declared_in))? {
            Some(info) => {
                let object = value.as_object().ok_or_else(|| {
                    Error::Encode(format!(
                        "Element '{}' has complex content and needs an object, got {}",
                        name,
                        kind_name(value)
                    ))
                })?;

                for field in &info.fields {
                    if let Field::Attribute(attr) = field {
                        self.push_attribute_field(&mut start, attr, object)?;
                    }
                }

                self.write(Event::Start(start))?;
                for field in &info.fields {
                    match field {
                        Field::Attribute(_) => {}
                        Field::Single(elem) => {
                            let child_name = elem.effective_name().unwrap_or_default();
                            if let Some(child_value) = object.get(child_name) {
                                self.encode_element(child_name, elem, child_value, false)?;
                            }
                        }
                        Field::Repeated(elem) => {
                            let child_name = elem.effective_name().unwrap_or_default();
                            if let Some(child_value) = object.get(child_name) {
                                let items = child_value.as_array().ok_or_else(|| {
                                    Error::Encode(format!(
                                        "Repeated element '{}' needs an array, got {}",
                                        child_name,
                                        kind_name(child_value)
                                    ))
                                })?;
                                for item in items {
                                    self.encode_element(child_name, elem, item, false)?;
                                }
                            }
                        }
                        Field::Choice(branches) => {
                            for branch in branches {
                                let child_name = branch.effective_name().unwrap_or_default();
                                if let Some(child_value) = object.get(child_name) {
                                    self.encode_element(child_name, branch, child_value, false)?;
                                    break;
                                }
                            }
                        }
                    }
                }
                if info.mixed {
                    if let Some(Value::String(text)) = object.get(TEXT_KEY) {
                        self.write(Event::Text(BytesText::new(text)))?;
                    }
                }
                self.write(Event::End(BytesEnd::new(name.to_string())))?;
            }
            None => {
                let text = encode_scalar(value)?;
                if text.is_empty() {
                    self.write(Event::Empty(start))?;
                } else {
                    self.write(Event::Start(start))?;
                    self.write(Event::Text(BytesText::new(&text)))?;
                    self.write(Event::End(BytesEnd::new(name.to_string())))?;
                }
            }
        }
        Ok(())
    }

    fn push_attribute_field(
        &self,
        start: &mut BytesStart,
        attr: &AttributeDecl,
        object: &Map<String, Value>,
    ) -> Result<()> {
        let name = attr.effective_name().unwrap_or_default();
        if let Some(value) = object.get(name) {
            let text = encode_scalar(value)?;
            start.push_attribute((name, text.as_str()));
        }
        Ok(())
    }

    fn write(&mut self, event: Event) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Encode(format!("Failed to write event: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema_text;
    use crate::resolver::resolve_standalone;
    use serde_json::json;

    const ORDER_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="OrderType">
        <xs:sequence>
          <xs:element name="id" type="xs:int"/>
          <xs:element name="note" type="xs:string" minOccurs="0"/>
          <xs:element name="items" type="xs:string" maxOccurs="unbounded"/>
        </xs:sequence>
        <xs:attribute name="priority" type="xs:boolean"/>
      </xs:complexType>
      <xs:element name="Order" type="OrderType"/>
    </xs:schema>"#;

    fn order_schema() -> ResolvedSchema {
        let schema = parse_schema_text(ORDER_XSD).unwrap();
        resolve_standalone(schema).unwrap()
    }

    #[test]
    fn test_decode_repeated_elements_become_array() {
        let resolved = order_schema();
        let xml = r#"<Order priority="true"><id>7</id><items>a</items><items>b</items></Order>"#;
        let value = decode(&resolved, "Order", xml).unwrap();

        assert_eq!(
            value,
            json!({"priority": true, "id": 7, "items": ["a", "b"]})
        );
    }

    #[test]
    fn test_decode_optional_absence_is_omission() {
        let resolved = order_schema();
        let xml = r#"<Order><id>1</id><items>x</items></Order>"#;
        let value = decode(&resolved, "Order", xml).unwrap();

        assert!(value.get("note").is_none());
        assert!(value.get("priority").is_none());
    }

    #[test]
    fn test_decode_unknown_root_fails() {
        let resolved = order_schema();
        let err = decode(&resolved, "Invoice", "<Invoice/>").unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));
    }

    #[test]
    fn test_decode_mismatched_document_root_fails() {
        let resolved = order_schema();
        let err = decode(&resolved, "Order", "<Invoice/>").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let resolved = order_schema();
        let value = json!({"priority": false, "id": 42, "note": "rush", "items": ["p", "q"]});

        let options = BuildOptions::new().with_xml_decl(false).with_pretty(false);
        let xml = encode(&resolved, "Order", &value, &options).unwrap();
        let back = decode(&resolved, "Order", &xml).unwrap();

        assert_eq!(back, value);
    }

    #[test]
    fn test_encode_omits_absent_optional() {
        let resolved = order_schema();
        let value = json!({"id": 1, "items": ["only"]});

        let options = BuildOptions::new().with_xml_decl(false).with_pretty(false);
        let xml = encode(&resolved, "Order", &value, &options).unwrap();

        assert!(!xml.contains("<note"));
        assert!(!xml.contains("priority="));
    }

    #[test]
    fn test_encode_boolean_literals() {
        let resolved = order_schema();
        let value = json!({"priority": true, "id": 1, "items": ["x"]});

        let options = BuildOptions::new().with_xml_decl(false).with_pretty(false);
        let xml = encode(&resolved, "Order", &value, &options).unwrap();

        assert!(xml.contains(r#"priority="true""#));
    }

    #[test]
    fn test_choice_decode_takes_present_branch() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:complexType name="PaymentType">
            <xs:choice>
              <xs:element name="card" type="xs:string"/>
              <xs:element name="cash" type="xs:decimal"/>
            </xs:choice>
          </xs:complexType>
          <xs:element name="payment" type="PaymentType"/>
        </xs:schema>"#;
        let resolved = resolve_standalone(parse_schema_text(xsd).unwrap()).unwrap();

        let value = decode(&resolved, "payment", "<payment><cash>10.50</cash></payment>").unwrap();
        assert_eq!(value, json!({"cash": "10.50"}));

        let options = BuildOptions::new().with_xml_decl(false).with_pretty(false);
        let xml = encode(&resolved, "payment", &value, &options).unwrap();
        assert!(xml.contains("<cash>10.50</cash>"));
        assert!(!xml.contains("<card"));
    }

    #[test]
    fn test_date_and_datetime_pass_through() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:complexType name="StampType">
            <xs:sequence>
              <xs:element name="day" type="xs:date"/>
              <xs:element name="at" type="xs:dateTime"/>
            </xs:sequence>
          </xs:complexType>
          <xs:element name="stamp" type="StampType"/>
        </xs:schema>"#;
        let resolved = resolve_standalone(parse_schema_text(xsd).unwrap()).unwrap();

        let xml = "<stamp><day>2024-06-01</day><at>2024-06-01T12:30:00</at></stamp>";
        let value = decode(&resolved, "stamp", xml).unwrap();
        assert_eq!(value, json!({"day": "2024-06-01", "at": "2024-06-01T12:30:00"}));

        let options = BuildOptions::new().with_xml_decl(false).with_pretty(false);
        assert_eq!(encode(&resolved, "stamp", &value, &options).unwrap(), xml);
    }

    #[test]
    fn test_nested_complex_type() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:complexType name="AddressType">
            <xs:sequence>
              <xs:element name="city" type="xs:string"/>
            </xs:sequence>
          </xs:complexType>
          <xs:complexType name="PersonType">
            <xs:sequence>
              <xs:element name="name" type="xs:string"/>
              <xs:element name="address" type="AddressType"/>
            </xs:sequence>
          </xs:complexType>
          <xs:element name="person" type="PersonType"/>
        </xs:schema>"#;
        let resolved = resolve_standalone(parse_schema_text(xsd).unwrap()).unwrap();

        let xml = "<person><name>Ada</name><address><city>Turin</city></address></person>";
        let value = decode(&resolved, "person", xml).unwrap();
        assert_eq!(value, json!({"name": "Ada", "address": {"city": "Turin"}}));
    }

    #[test]
    fn test_inline_complex_type_decode() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="pair">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="left" type="xs:int"/>
                <xs:element name="right" type="xs:int"/>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;
        let resolved = resolve_standalone(parse_schema_text(xsd).unwrap()).unwrap();

        let value = decode(&resolved, "pair", "<pair><left>1</left><right>2</right></pair>").unwrap();
        assert_eq!(value, json!({"left": 1, "right": 2}));
    }
}
