//! End-to-end codec tests: schema in, XML in, JSON out, XML back

use pretty_assertions::assert_eq;
use serde_json::json;
use xsdc::builder::BuildOptions;
use xsdc::codec::{decode, encode};
use xsdc::error::Error;
use xsdc::model::ResolvedSchema;
use xsdc::parser::parse_schema_text;
use xsdc::resolver::{resolve, resolve_standalone};

fn resolved(xsd: &str) -> ResolvedSchema {
    resolve_standalone(parse_schema_text(xsd).unwrap()).unwrap()
}

fn compact() -> BuildOptions {
    BuildOptions::new().with_xml_decl(false).with_pretty(false)
}

const ORDER_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="OrderType">
    <xs:sequence>
      <xs:element name="id" type="xs:int"/>
      <xs:element name="shipped" type="xs:boolean"/>
      <xs:element name="note" type="xs:string" minOccurs="0"/>
      <xs:element name="items" type="xs:string" maxOccurs="unbounded"/>
    </xs:sequence>
  </xs:complexType>
  <xs:element name="Order" type="OrderType"/>
</xs:schema>"#;

#[test]
fn order_decodes_to_typed_json() {
    let resolved = resolved(ORDER_XSD);
    let xml = "<Order><id>1</id><shipped>true</shipped><items>a</items><items>b</items></Order>";

    let value = decode(&resolved, "Order", xml).unwrap();
    assert_eq!(
        value,
        json!({"id": 1, "shipped": true, "items": ["a", "b"]})
    );
}

#[test]
fn decode_then_encode_reproduces_the_document() {
    let resolved = resolved(ORDER_XSD);
    let xml = "<Order><id>1</id><shipped>true</shipped><items>a</items><items>b</items></Order>";

    let value = decode(&resolved, "Order", xml).unwrap();
    let back = encode(&resolved, "Order", &value, &compact()).unwrap();

    assert_eq!(back, xml);
}

#[test]
fn optional_absence_round_trips_as_omission() {
    let resolved = resolved(ORDER_XSD);
    let xml = "<Order><id>2</id><shipped>false</shipped><items>x</items></Order>";

    let value = decode(&resolved, "Order", xml).unwrap();
    assert!(value.get("note").is_none());

    let back = encode(&resolved, "Order", &value, &compact()).unwrap();
    assert!(!back.contains("<note"));
    assert_eq!(back, xml);
}

#[test]
fn unknown_root_element_is_rejected() {
    let resolved = resolved(ORDER_XSD);

    let err = decode(&resolved, "Order", "<Invoice><id>1</id></Invoice>").unwrap_err();
    assert!(matches!(err, Error::ElementNotFound(_)));

    let err = encode(&resolved, "Invoice", &json!({}), &compact()).unwrap_err();
    assert!(matches!(err, Error::ElementNotFound(_)));
}

#[test]
fn derived_type_exposes_inherited_fields() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="PersonType">
        <xs:sequence>
          <xs:element name="name" type="xs:string"/>
        </xs:sequence>
      </xs:complexType>
      <xs:complexType name="EmployeeType">
        <xs:complexContent>
          <xs:extension base="PersonType">
            <xs:sequence>
              <xs:element name="badge" type="xs:int"/>
            </xs:sequence>
          </xs:extension>
        </xs:complexContent>
      </xs:complexType>
      <xs:element name="employee" type="EmployeeType"/>
    </xs:schema>"#;
    let resolved = resolved(xsd);

    let xml = "<employee><name>Grace</name><badge>7</badge></employee>";
    let value = decode(&resolved, "employee", xml).unwrap();
    assert_eq!(value, json!({"name": "Grace", "badge": 7}));

    // Inherited fields serialize before the derived ones.
    assert_eq!(encode(&resolved, "employee", &value, &compact()).unwrap(), xml);
}

#[test]
fn choice_encodes_exactly_one_branch() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="ContactType">
        <xs:choice>
          <xs:element name="email" type="xs:string"/>
          <xs:element name="phone" type="xs:string"/>
        </xs:choice>
      </xs:complexType>
      <xs:element name="contact" type="ContactType"/>
    </xs:schema>"#;
    let resolved = resolved(xsd);

    let value = json!({"phone": "555-0100"});
    let xml = encode(&resolved, "contact", &value, &compact()).unwrap();
    assert_eq!(xml, "<contact><phone>555-0100</phone></contact>");

    assert_eq!(decode(&resolved, "contact", &xml).unwrap(), value);
}

#[test]
fn attributes_ride_on_the_element() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="TagType">
        <xs:sequence>
          <xs:element name="value" type="xs:string"/>
        </xs:sequence>
        <xs:attribute name="lang" type="xs:string"/>
        <xs:attribute name="rank" type="xs:int"/>
      </xs:complexType>
      <xs:element name="tag" type="TagType"/>
    </xs:schema>"#;
    let resolved = resolved(xsd);

    let xml = r#"<tag lang="en" rank="3"><value>hi</value></tag>"#;
    let value = decode(&resolved, "tag", xml).unwrap();
    assert_eq!(value, json!({"lang": "en", "rank": 3, "value": "hi"}));

    assert_eq!(encode(&resolved, "tag", &value, &compact()).unwrap(), xml);
}

#[test]
fn qualified_root_carries_the_target_namespace() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="http://example.com/q" targetNamespace="http://example.com/q"
        elementFormDefault="qualified">
      <xs:complexType name="MsgType">
        <xs:sequence><xs:element name="body" type="xs:string"/></xs:sequence>
      </xs:complexType>
      <xs:element name="msg" type="tns:MsgType"/>
    </xs:schema>"#;
    let resolved = resolved(xsd);

    let value = json!({"body": "hello"});
    let xml = encode(&resolved, "msg", &value, &compact()).unwrap();
    assert_eq!(
        xml,
        r#"<msg xmlns="http://example.com/q"><body>hello</body></msg>"#
    );

    assert_eq!(decode(&resolved, "msg", &xml).unwrap(), value);
}

#[test]
fn decimal_text_survives_unchanged() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="PriceType">
        <xs:sequence><xs:element name="amount" type="xs:decimal"/></xs:sequence>
      </xs:complexType>
      <xs:element name="price" type="PriceType"/>
    </xs:schema>"#;
    let resolved = resolved(xsd);

    let xml = "<price><amount>19.900</amount></price>";
    let value = decode(&resolved, "price", xml).unwrap();

    // Trailing zeros are significant for exact re-encoding.
    assert_eq!(value, json!({"amount": "19.900"}));
    assert_eq!(encode(&resolved, "price", &value, &compact()).unwrap(), xml);
}

#[test]
fn element_typed_across_import_binds_the_imported_type() {
    // Both namespaces declare an "Item" type; the element's prefixed type
    // reference must bind the imported one, not the root schema's.
    let root_xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns:o="http://example.com/other"
            targetNamespace="http://example.com/root">
      <xs:import namespace="http://example.com/other" schemaLocation="other.xsd"/>
      <xs:complexType name="Item">
        <xs:sequence><xs:element name="sku" type="xs:string"/></xs:sequence>
      </xs:complexType>
      <xs:element name="box" type="o:Item"/>
      <xs:element name="crate" type="Item"/>
    </xs:schema>"#;
    let other_xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            targetNamespace="http://example.com/other">
      <xs:complexType name="Item">
        <xs:sequence><xs:element name="payload" type="xs:string"/></xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    let loader = |location: &str| -> Result<String, Error> {
        match location {
            "other.xsd" => Ok(other_xsd.to_string()),
            other => Err(Error::Resource(format!("unknown location '{}'", other))),
        }
    };
    let resolved = resolve(parse_schema_text(root_xsd).unwrap(), &loader).unwrap();

    let value = decode(
        &resolved,
        "box",
        r#"<box xmlns="http://example.com/root"><payload>ok</payload></box>"#,
    )
    .unwrap();
    assert_eq!(value, json!({"payload": "ok"}));

    // The root schema's own Item still binds for an unprefixed reference.
    let value = decode(
        &resolved,
        "crate",
        r#"<crate xmlns="http://example.com/root"><sku>A-1</sku></crate>"#,
    )
    .unwrap();
    assert_eq!(value, json!({"sku": "A-1"}));
}
