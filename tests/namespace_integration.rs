//! Namespace signing of ids produced by the mapping engine
//!
//! Run with: cargo test --test namespace_integration

use ftm_mapping::config::ModelLoader;
use ftm_mapping::{Namespace, QueryMapping, Record, SEP};

const QUERY: &str = r#"
entities:
  vessel:
    schema: Vessel
    keys: [imo]
    properties:
      name: { column: vessel_name }
      flag: { column: flag }
      owner: { entity: owner }
  owner:
    schema: Company
    id_column: owner_id
    properties:
      name: { column: owner_name }
"#;

fn record() -> Record {
    Record::new()
        .with("imo", "9321483")
        .with("vessel_name", "Northern Star")
        .with("flag", "PA")
        .with("owner_id", "oc-gb-0001")
        .with("owner_name", "Star Shipping Ltd")
}

#[test]
fn test_mapped_ids_sign_and_verify() {
    let model = ModelLoader::builtin().load().unwrap();
    let query = QueryMapping::from_yaml_str(&model, None, QUERY).unwrap();
    let entities = query.map(&record());

    let ns = Namespace::new("maritime");
    for proxy in entities.values() {
        let plain = proxy.id.as_deref().unwrap();
        assert!(!plain.contains(SEP));

        let signed = ns.sign(plain).unwrap();
        assert!(ns.verify(signed.as_str()));
        assert_eq!(ns.parse(signed.as_str()).0, Some(plain));
        assert_eq!(ns.sign(signed.as_str()), Some(signed.clone()));
        assert!(!Namespace::new("other").verify(signed.as_str()));
    }
}

#[test]
fn test_same_record_in_two_datasets() {
    let model = ModelLoader::builtin().load().unwrap();
    let query = QueryMapping::from_yaml_str(&model, None, QUERY).unwrap();
    let vessel = query.map(&record()).remove("vessel").unwrap();

    let left = Namespace::new("registry_a").apply(&vessel);
    let right = Namespace::new("registry_b").apply(&vessel);

    assert_ne!(left.id, right.id);
    assert_ne!(left.get("owner"), right.get("owner"));
    assert_eq!(left.get("flag"), right.get("flag"));

    // Moving an entity between datasets re-signs rather than stacking
    let moved = Namespace::new("registry_b").apply(&left);
    assert_eq!(moved, right);
}

#[test]
fn test_pass_through_leaves_entities_alone() {
    let model = ModelLoader::builtin().load().unwrap();
    let query = QueryMapping::from_yaml_str(&model, None, QUERY).unwrap();
    let entities = query.map(&record());

    let ns = Namespace::make(None);
    for proxy in entities.values() {
        assert_eq!(&ns.apply(proxy), proxy);
        assert!(!ns.verify(proxy.id.as_deref()));
    }
}

#[test]
fn test_generate_from_record_values() {
    let ns = Namespace::new("maritime");
    let record = record();

    let id = ns
        .generate([record.text("imo").unwrap(), record.text("flag").unwrap()])
        .unwrap();
    assert!(ns.verify(id.as_str()));

    let empty = Record::new().with("imo", " ");
    assert_eq!(ns.generate(empty.text("imo")), None);
}
