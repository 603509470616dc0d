use std::fs;

use fm_tree::{
    DictionaryAssociation, DictionaryMapping, ExpansionRecord, FieldReference, FlatFileMapping,
    Flattener, MakerMapping, TreeConfig, TreeMapping, XmlMaker,
};

const SCHEMA: &str = r#"
    <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:element name="entrySet">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="interactor" maxOccurs="unbounded">
              <xs:complexType>
                <xs:sequence>
                  <xs:element name="name" type="xs:string"/>
                  <xs:element name="alias" type="xs:string" minOccurs="0" maxOccurs="3"/>
                  <xs:element name="organism" type="xs:string" minOccurs="0"/>
                </xs:sequence>
                <xs:attribute name="id" type="xs:string" use="required"/>
              </xs:complexType>
            </xs:element>
          </xs:sequence>
        </xs:complexType>
      </xs:element>
    </xs:schema>"#;

const DOCUMENT: &str = r#"<entrySet>
    <interactor id="i1"><name>p53</name><alias>TP53</alias><alias>LFS1</alias></interactor>
    <interactor id="i2"><name>mdm2</name><organism>human</organism></interactor>
    <interactor id="x3"><name>brca1</name></interactor>
  </entrySet>"#;

#[test]
fn flattener_mappings_reload_to_the_same_output() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("interactors.xsd");
    let document = dir.path().join("interactors.xml");
    fs::write(&schema, SCHEMA).unwrap();
    fs::write(&document, DOCUMENT).unwrap();

    let mut flattener = Flattener::default();
    flattener.load_schema(&schema.to_string_lossy()).unwrap();
    flattener.load_document(&document.to_string_lossy()).unwrap();
    for path in ["0.0", "0.2"] {
        let node = flattener.node_at(path).unwrap();
        flattener.select(node);
    }
    let id = flattener.node_at("0.0").unwrap();
    flattener.set_name(id, Some("identifier"));
    flattener.set_filter(id, Some("i[0-9]+")).unwrap();
    flattener.set_separator(",");

    let mut expected = Vec::new();
    flattener.write(&mut expected).unwrap();
    assert_eq!(
        String::from_utf8_lossy(&expected),
        "identifier,alias,alias-1\ni1,TP53,LFS1\ni2,,\n,,\n"
    );

    let mapping_file = dir.path().join("flattener.xml");
    flattener.save_mapping_file(&mapping_file).unwrap();
    let mut reloaded = Flattener::default();
    reloaded.load_mapping_file(&mapping_file).unwrap();

    let mut output = Vec::new();
    reloaded.write(&mut output).unwrap();
    assert_eq!(output, expected);
    assert_eq!(
        reloaded.export_mapping().unwrap(),
        flattener.export_mapping().unwrap()
    );
}

const CHOICES: &str = r#"
    <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:element name="doc">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="holder" maxOccurs="unbounded">
              <xs:complexType>
                <xs:choice>
                  <xs:element name="Ref" type="xs:string"/>
                  <xs:element name="Target">
                    <xs:complexType>
                      <xs:attribute name="id" type="xs:string"/>
                      <xs:attribute name="value" type="xs:string"/>
                    </xs:complexType>
                  </xs:element>
                </xs:choice>
              </xs:complexType>
            </xs:element>
          </xs:sequence>
        </xs:complexType>
      </xs:element>
    </xs:schema>"#;

#[test]
fn mappings_with_managed_choices_reload_in_a_default_flattener() {
    let dir = tempfile::tempdir().unwrap();
    let schema = dir.path().join("choices.xsd");
    let document = dir.path().join("choices.xml");
    fs::write(&schema, CHOICES).unwrap();
    fs::write(
        &document,
        r#"<doc><holder><Target id="X" value="found"/></holder><holder><Ref>X</Ref></holder></doc>"#,
    )
    .unwrap();

    let mut flattener = Flattener::new(TreeConfig {
        manage_choices: true,
        ..TreeConfig::flattener()
    });
    flattener.load_schema(&schema.to_string_lossy()).unwrap();
    flattener.load_document(&document.to_string_lossy()).unwrap();
    let choice = flattener.node_at("0.0").unwrap();
    flattener.choose(choice, "Target").unwrap();
    let value = flattener.node_at("0.0.0.1").unwrap();
    flattener.select(value);
    let holder = flattener.node_at("0").unwrap();
    flattener.set_line_node(Some(holder));

    let mut expected = Vec::new();
    flattener.write(&mut expected).unwrap();
    assert_eq!(String::from_utf8_lossy(&expected), "value\nfound\n\n");

    let mapping_file = dir.path().join("flattener.xml");
    flattener.save_mapping_file(&mapping_file).unwrap();
    let mut reloaded = Flattener::default();
    reloaded.load_mapping_file(&mapping_file).unwrap();
    assert!(reloaded.config().manage_choices);

    let mut output = Vec::new();
    reloaded.write(&mut output).unwrap();
    assert_eq!(output, expected);
    assert_eq!(
        reloaded.export_mapping().unwrap(),
        flattener.export_mapping().unwrap()
    );
}

#[test]
fn maker_mappings_resolve_files_next_to_them() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("interactors.xsd"), SCHEMA).unwrap();
    fs::write(
        dir.path().join("interactors.tsv"),
        "name\taliases\ttaxid\np53\tTP53|LFS1\t9606\nmdm2\t\t10090\n",
    )
    .unwrap();
    fs::write(dir.path().join("organisms.txt"), "9606;human\n10090;mouse\n").unwrap();

    // A second alias node, right after the first
    let mut tree = TreeMapping {
        schema_url: Some(String::from("interactors.xsd")),
        expand_choices: vec![ExpansionRecord {
            path: String::from("0.2"),
            choice: None,
        }],
        ..TreeMapping::default()
    };
    tree.flat_files.insert(String::from("0"), 0);
    tree.generated_ids.insert(String::from("0.0"));
    let field = |field: &str| FieldReference {
        flat_file: 0,
        field: field.to_string(),
    };
    tree.fields.insert(String::from("0.1"), field("0"));
    tree.fields.insert(String::from("0.2"), field("1.0"));
    tree.fields.insert(String::from("0.3"), field("1.1"));
    tree.dictionaries.insert(
        String::from("0.4"),
        DictionaryAssociation {
            dictionary: 0,
            column: 0,
            source: field("2"),
        },
    );
    let mapping = MakerMapping {
        flat_files: vec![FlatFileMapping {
            url: String::from("interactors.tsv"),
            line_separator: None,
            first_line_for_titles: true,
            separators: [
                (String::from(""), String::from("\t")),
                (String::from("1"), String::from("|")),
            ]
            .into_iter()
            .collect(),
        }],
        dictionaries: vec![DictionaryMapping {
            url: String::from("organisms.txt"),
            separator: String::from(";"),
            case_sensitive: false,
        }],
        tree,
    };

    let mapping_file = dir.path().join("maker.xml");
    mapping.save(&mapping_file).unwrap();
    let reloaded = MakerMapping::read(&mapping_file).unwrap();
    assert_eq!(reloaded, mapping);

    let mut maker = XmlMaker::load(&reloaded, Some(&mapping_file.to_string_lossy())).unwrap();
    assert!(maker.check());
    let xml = maker.to_xml().unwrap();
    assert_eq!(xml.matches("<interactor ").count(), 2, "{xml}");
    assert!(xml.contains(r#"<interactor id="ID1">"#), "{xml}");
    assert!(xml.contains("<alias>TP53</alias>"), "{xml}");
    assert!(xml.contains("<alias>LFS1</alias>"), "{xml}");
    assert!(xml.contains("<organism>mouse</organism>"), "{xml}");
    assert!(!xml.contains("<name>name</name>"), "{xml}");
}
