//! Round-trip tests: parse, build, reparse, rebuild
//!
//! The guarantees under test: rebuilt text parses to a structurally
//! equivalent schema, a second build is byte-identical to the first, and
//! no named entity is gained or lost across the cycle.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use xsdc::builder::{build, build_default, BuildOptions};
use xsdc::comparison::{check_round_trip, compare_schemas, SchemaSummary};
use xsdc::parser::parse_schema_text;

const PURCHASE_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:tns="http://example.com/purchase"
    targetNamespace="http://example.com/purchase"
    elementFormDefault="qualified">
  <xs:annotation>
    <xs:documentation>Purchase order vocabulary</xs:documentation>
  </xs:annotation>
  <xs:simpleType name="Sku">
    <xs:restriction base="xs:string">
      <xs:pattern value="[A-Z]{3}-[0-9]{4}"/>
      <xs:maxLength value="8"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:complexType name="ItemType">
    <xs:sequence>
      <xs:element name="sku" type="tns:Sku"/>
      <xs:element name="quantity" type="xs:positiveInteger"/>
      <xs:element name="comment" type="xs:string" minOccurs="0"/>
    </xs:sequence>
    <xs:attribute name="partNum" type="xs:string" use="required"/>
  </xs:complexType>
  <xs:complexType name="PurchaseOrderType">
    <xs:sequence>
      <xs:element name="shipTo" type="xs:string"/>
      <xs:element name="item" type="tns:ItemType" maxOccurs="unbounded"/>
    </xs:sequence>
    <xs:attribute name="orderDate" type="xs:date"/>
  </xs:complexType>
  <xs:element name="purchaseOrder" type="tns:PurchaseOrderType"/>
</xs:schema>"#;

#[test]
fn rebuilt_schema_is_structurally_equivalent() {
    let schema = parse_schema_text(PURCHASE_XSD).unwrap();
    let rebuilt = parse_schema_text(&build_default(&schema).unwrap()).unwrap();

    compare_schemas(&schema, &rebuilt).unwrap();
}

#[test]
fn second_build_is_byte_identical() {
    let schema = parse_schema_text(PURCHASE_XSD).unwrap();
    let once = build_default(&schema).unwrap();
    let reparsed = parse_schema_text(&once).unwrap();
    let twice = build_default(&reparsed).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn named_entity_counts_survive_the_cycle() {
    let schema = parse_schema_text(PURCHASE_XSD).unwrap();
    let rebuilt = parse_schema_text(&build_default(&schema).unwrap()).unwrap();

    let before = SchemaSummary::of(&schema);
    let after = SchemaSummary::of(&rebuilt);

    assert_eq!(before, after);
    assert_eq!(after.entity_count(), 4);
}

#[test]
fn check_round_trip_accepts_the_vocabulary() {
    check_round_trip(PURCHASE_XSD).unwrap();
}

#[test]
fn directives_survive_the_cycle_in_order() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://example.com/d">
      <xs:import namespace="http://example.com/a" schemaLocation="a.xsd"/>
      <xs:include schemaLocation="b.xsd"/>
      <xs:import namespace="http://example.com/c"/>
    </xs:schema>"#;

    let schema = parse_schema_text(xsd).unwrap();
    let built = build_default(&schema).unwrap();
    let reparsed = parse_schema_text(&built).unwrap();

    assert_eq!(reparsed.directives.len(), 3);
    assert_eq!(reparsed.directives[0].location(), Some("a.xsd"));
    assert_eq!(reparsed.directives[1].location(), Some("b.xsd"));
    assert_eq!(reparsed.directives[2].location(), None);

    // Order and content stabilize after one cycle.
    assert_eq!(built, build_default(&reparsed).unwrap());
}

#[test]
fn redefine_directive_round_trips_with_its_body() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="http://example.com/r" targetNamespace="http://example.com/r">
      <xs:redefine schemaLocation="base.xsd">
        <xs:complexType name="Widget">
          <xs:complexContent>
            <xs:extension base="tns:Widget">
              <xs:sequence>
                <xs:element name="extra" type="xs:string"/>
              </xs:sequence>
            </xs:extension>
          </xs:complexContent>
        </xs:complexType>
      </xs:redefine>
    </xs:schema>"#;

    let schema = parse_schema_text(xsd).unwrap();
    let built = build_default(&schema).unwrap();

    assert!(built.contains("<xs:redefine schemaLocation=\"base.xsd\">"));
    assert!(built.contains("base=\"tns:Widget\""));

    let reparsed = parse_schema_text(&built).unwrap();
    assert_eq!(built, build_default(&reparsed).unwrap());
}

#[test]
fn unqualified_schema_round_trips() {
    let xsd = r#"<schema xmlns="http://www.w3.org/2001/XMLSchema">
      <element name="plain" type="string"/>
    </schema>"#;

    let schema = parse_schema_text(xsd).unwrap();
    let built = build(&schema, &BuildOptions::new().with_xml_decl(false)).unwrap();

    assert!(built.starts_with("<schema"));
    let reparsed = parse_schema_text(&built).unwrap();
    assert_eq!(reparsed.elements.len(), 1);
}

proptest! {
    /// Any schema made of simple named declarations is byte-stable after
    /// one parse/build cycle.
    #[test]
    fn generated_declarations_are_byte_stable(
        names in proptest::collection::vec("[A-Za-z][A-Za-z0-9]{0,8}", 1..8)
    ) {
        let mut body = String::new();
        for (i, name) in names.iter().enumerate() {
            body.push_str(&format!(
                "<xs:element name=\"{}{}\" type=\"xs:string\"/>",
                name, i
            ));
        }
        let xsd = format!(
            "<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">{}</xs:schema>",
            body
        );

        let schema = parse_schema_text(&xsd).unwrap();
        let once = build_default(&schema).unwrap();
        let reparsed = parse_schema_text(&once).unwrap();
        let twice = build_default(&reparsed).unwrap();

        prop_assert_eq!(once, twice);
    }
}

/// A schema document describing schema documents themselves, in the shape
/// of the W3C schema for schemas: wildcard-carrying base types, a named
/// group of top-level alternatives, and elements typed by derivation.
const META_XSD: &str = r###"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="http://www.w3.org/2001/XMLSchema" elementFormDefault="qualified">
  <xs:simpleType name="formChoice">
    <xs:restriction base="xs:NMTOKEN">
      <xs:enumeration value="qualified"/>
      <xs:enumeration value="unqualified"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:complexType name="openAttrs">
    <xs:sequence>
      <xs:any namespace="##other" processContents="lax" minOccurs="0" maxOccurs="unbounded"/>
    </xs:sequence>
    <xs:anyAttribute namespace="##other" processContents="lax"/>
  </xs:complexType>
  <xs:complexType name="annotated">
    <xs:complexContent>
      <xs:extension base="xs:openAttrs">
        <xs:sequence>
          <xs:element ref="xs:annotation" minOccurs="0"/>
        </xs:sequence>
        <xs:attribute name="id" type="xs:ID"/>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
  <xs:group name="schemaTop">
    <xs:choice>
      <xs:element ref="xs:element"/>
      <xs:element ref="xs:attribute"/>
      <xs:element ref="xs:notation"/>
    </xs:choice>
  </xs:group>
  <xs:element name="schema">
    <xs:complexType>
      <xs:sequence>
        <xs:group ref="xs:schemaTop" minOccurs="0" maxOccurs="unbounded"/>
      </xs:sequence>
      <xs:attribute name="targetNamespace" type="xs:anyURI"/>
      <xs:attribute name="elementFormDefault" type="xs:formChoice"/>
    </xs:complexType>
  </xs:element>
  <xs:element name="annotation" type="xs:annotated"/>
  <xs:element name="element" type="xs:annotated"/>
  <xs:element name="attribute" type="xs:annotated"/>
  <xs:element name="notation" type="xs:annotated"/>
</xs:schema>"###;

#[test]
fn self_describing_schema_counts_stay_stable() {
    let schema = parse_schema_text(META_XSD).unwrap();
    assert!(!schema.complex_types.is_empty());
    assert!(!schema.simple_types.is_empty());
    assert!(!schema.elements.is_empty());
    assert!(!schema.groups.is_empty());
    let counts = SchemaSummary::of(&schema);

    let once = build_default(&schema).unwrap();
    let reparsed = parse_schema_text(&once).unwrap();
    assert_eq!(SchemaSummary::of(&reparsed), counts);

    let twice = build_default(&reparsed).unwrap();
    let again = parse_schema_text(&twice).unwrap();
    assert_eq!(SchemaSummary::of(&again), counts);
    assert_eq!(once, twice);
}

#[test]
fn wildcards_round_trip() {
    let xsd = r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="Open">
        <xs:sequence>
          <xs:element name="known" type="xs:string"/>
          <xs:any namespace="##any" processContents="skip" minOccurs="0"/>
        </xs:sequence>
        <xs:anyAttribute namespace="##local"/>
      </xs:complexType>
    </xs:schema>"###;

    let schema = parse_schema_text(xsd).unwrap();
    let rebuilt = build_default(&schema).unwrap();
    assert!(rebuilt.contains(r###"<xs:any namespace="##any" processContents="skip" minOccurs="0"/>"###));
    assert!(rebuilt.contains(r###"<xs:anyAttribute namespace="##local"/>"###));

    check_round_trip(xsd).unwrap();
}
