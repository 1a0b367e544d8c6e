//! Resolver integration tests across multi-document schema graphs

use std::collections::HashMap;
use xsdc::error::{Error, Result};
use xsdc::model::Field;
use xsdc::parser::parse_schema_text;
use xsdc::resolver::{resolve, resolve_standalone, Resolver, SchemaLoader, SchemaRegistry};

/// In-memory loader keyed by schemaLocation
struct MapLoader {
    documents: HashMap<&'static str, &'static str>,
}

impl MapLoader {
    fn new(documents: &[(&'static str, &'static str)]) -> Self {
        Self {
            documents: documents.iter().copied().collect(),
        }
    }
}

impl SchemaLoader for MapLoader {
    fn load(&self, location: &str) -> Result<String> {
        self.documents
            .get(location)
            .map(|text| text.to_string())
            .ok_or_else(|| Error::Resource(format!("Unknown location: {}", location)))
    }
}

fn field_names(fields: &[Field]) -> Vec<&str> {
    fields.iter().filter_map(Field::name).collect()
}

#[test]
fn extension_across_an_import_boundary() {
    let base = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://example.com/base">
      <xs:complexType name="Vehicle">
        <xs:sequence>
          <xs:element name="wheels" type="xs:int"/>
        </xs:sequence>
        <xs:attribute name="vin" type="xs:string"/>
      </xs:complexType>
    </xs:schema>"#;

    let main = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:b="http://example.com/base"
        xmlns:tns="http://example.com/cars"
        targetNamespace="http://example.com/cars">
      <xs:import namespace="http://example.com/base" schemaLocation="base.xsd"/>
      <xs:complexType name="Car">
        <xs:complexContent>
          <xs:extension base="b:Vehicle">
            <xs:sequence>
              <xs:element name="doors" type="xs:int"/>
            </xs:sequence>
          </xs:extension>
        </xs:complexContent>
      </xs:complexType>
      <xs:element name="car" type="tns:Car"/>
    </xs:schema>"#;

    let loader = MapLoader::new(&[("base.xsd", base)]);
    let resolved = resolve(parse_schema_text(main).unwrap(), &loader).unwrap();

    let fields = resolved.fields("Car").unwrap();
    assert_eq!(field_names(fields), vec!["vin", "wheels", "doors"]);
}

#[test]
fn mutual_imports_terminate() {
    let a = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://example.com/a">
      <xs:import namespace="http://example.com/b" schemaLocation="b.xsd"/>
      <xs:complexType name="A">
        <xs:sequence><xs:element name="fromA" type="xs:string"/></xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    let b = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://example.com/b">
      <xs:import namespace="http://example.com/a" schemaLocation="a.xsd"/>
      <xs:complexType name="B">
        <xs:sequence><xs:element name="fromB" type="xs:string"/></xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    let loader = MapLoader::new(&[("a.xsd", a), ("b.xsd", b)]);
    let resolved = resolve(parse_schema_text(a).unwrap(), &loader).unwrap();

    assert!(resolved.resolved_type_by_local_name("A").is_some());
    assert!(resolved.resolved_type_by_local_name("B").is_some());
}

#[test]
fn chameleon_include_adopts_the_including_namespace() {
    let parts = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:complexType name="Part">
        <xs:sequence><xs:element name="label" type="xs:string"/></xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    let main = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="http://example.com/host"
        targetNamespace="http://example.com/host">
      <xs:include schemaLocation="parts.xsd"/>
      <xs:element name="part" type="tns:Part"/>
    </xs:schema>"#;

    let loader = MapLoader::new(&[("parts.xsd", parts)]);
    let resolved = resolve(parse_schema_text(main).unwrap(), &loader).unwrap();

    assert!(resolved
        .resolved_type(Some("http://example.com/host"), "Part")
        .is_some());
}

#[test]
fn redefined_type_extends_its_own_pre_redefinition_snapshot() {
    let base = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://example.com/r">
      <xs:complexType name="Widget">
        <xs:sequence><xs:element name="core" type="xs:string"/></xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    let main = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="http://example.com/r" targetNamespace="http://example.com/r">
      <xs:redefine schemaLocation="base.xsd">
        <xs:complexType name="Widget">
          <xs:complexContent>
            <xs:extension base="tns:Widget">
              <xs:sequence><xs:element name="extra" type="xs:string"/></xs:sequence>
            </xs:extension>
          </xs:complexContent>
        </xs:complexType>
      </xs:redefine>
      <xs:element name="widget" type="tns:Widget"/>
    </xs:schema>"#;

    let loader = MapLoader::new(&[("base.xsd", base)]);
    let resolved = resolve(parse_schema_text(main).unwrap(), &loader).unwrap();

    let fields = resolved.fields("Widget").unwrap();
    assert_eq!(field_names(fields), vec!["core", "extra"]);
}

#[test]
fn shared_registry_parses_each_document_once() {
    let shared = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://example.com/n">
      <xs:complexType name="Shared">
        <xs:sequence><xs:element name="v" type="xs:string"/></xs:sequence>
      </xs:complexType>
    </xs:schema>"#;

    let main = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="http://example.com/n" targetNamespace="http://example.com/n">
      <xs:include schemaLocation="shared.xsd"/>
      <xs:element name="one" type="tns:Shared"/>
    </xs:schema>"#;

    let other = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="http://example.com/n" targetNamespace="http://example.com/n">
      <xs:include schemaLocation="shared.xsd"/>
      <xs:element name="two" type="tns:Shared"/>
    </xs:schema>"#;

    let loader = MapLoader::new(&[("shared.xsd", shared)]);
    let registry = SchemaRegistry::new();
    let resolver = Resolver::new(&loader, &registry);

    resolver.resolve(parse_schema_text(main).unwrap()).unwrap();
    resolver.resolve(parse_schema_text(other).unwrap()).unwrap();

    // One cached entry serves both resolutions.
    assert_eq!(registry.len(), 1);
}

#[test]
fn missing_type_reports_name_and_namespace() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="http://example.com/m" targetNamespace="http://example.com/m">
      <xs:element name="ghost" type="tns:NoSuchType"/>
    </xs:schema>"#;

    let err = resolve_standalone(parse_schema_text(xsd).unwrap()).unwrap_err();
    match err {
        Error::MissingType(inner) => {
            assert!(inner.name.contains("NoSuchType"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
