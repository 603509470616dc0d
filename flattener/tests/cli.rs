use std::fs;
use std::process::Command;

const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="entrySet">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="entry" maxOccurs="unbounded">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="label" type="xs:string" minOccurs="0"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:string" use="required"/>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

const MAPPING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<flattenerMapping>
  <schemaURL>entries.xsd</schemaURL>
  <documentURL>entries.xml</documentURL>
  <separator>;</separator>
  <selections>
    <node path="0.0"/>
    <node path="0.1"/>
  </selections>
</flattenerMapping>"#;

fn flattener() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xml-flattener"))
}

#[test]
fn flattens_the_document_named_by_the_mapping() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("entries.xsd"), SCHEMA).unwrap();
    fs::write(
        dir.path().join("entries.xml"),
        r#"<entrySet><entry id="1"><label>one</label></entry><entry id="2"/></entrySet>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("other.xml"),
        r#"<entrySet><entry id="9"><label>nine</label></entry></entrySet>"#,
    )
    .unwrap();
    let mapping = dir.path().join("mapping.xml");
    fs::write(&mapping, MAPPING).unwrap();
    let output = dir.path().join("out.txt");

    let status = flattener()
        .arg("-mapping")
        .arg(&mapping)
        .arg("-o")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), "id;label\n1;one\n2;\n");

    let status = flattener()
        .current_dir(dir.path())
        .args(["--mapping", "mapping.xml", "-o", "out.txt", "-xmlDocument", "other.xml"])
        .args(["-separator", "\\t"])
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), "id\tlabel\n9\tnine\n");
}

#[test]
fn exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let status = flattener().arg("-o").arg("out.txt").status().unwrap();
    assert_eq!(status.code(), Some(1));

    let missing = dir.path().join("missing.xml");
    let status = flattener()
        .arg("-mapping")
        .arg(&missing)
        .arg("-o")
        .arg(dir.path().join("out.txt"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));
}
