//! End-to-end mapping tests against the built-in schema model
//!
//! Run with: cargo test --test mapping_integration

use ftm_mapping::config::ModelLoader;
use ftm_mapping::mapping::BindContext;
use ftm_mapping::{
    EntityConfig, EntityMapping, EntityProxy, MapOutcome, MappingError, Model, Namespace,
    Property, PropertyBinder, QueryMapping, Record, SkipReason,
};
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};

fn model() -> Model {
    ModelLoader::builtin().load().expect("built-in model loads")
}

fn entity_config(yaml: &str) -> EntityConfig {
    EntityConfig::from_yaml_str(yaml).expect("valid entity config")
}

fn no_entities() -> BTreeMap<String, EntityProxy> {
    BTreeMap::new()
}

// ============================================================================
// SINGLE ENTITY MAPPING
// ============================================================================

#[test]
fn test_person_by_email() {
    let model = model();
    let config = entity_config(
        r#"
schema: Person
keys: [email]
properties:
  name: { column: name }
"#,
    );
    let mapping = EntityMapping::new(&model, None, "person", &config).unwrap();

    let record = Record::new().with("email", "a@b.com").with("name", "A B");
    let proxy = mapping
        .map(&record, &no_entities())
        .into_entity()
        .expect("record with an email maps");
    assert_eq!(proxy.schema().name, "Person");
    assert!(proxy.id.is_some());
    assert_eq!(proxy.get("name"), ["A B".to_string()]);

    let record = Record::new().with("email", "").with("name", "A B");
    assert_eq!(
        mapping.map(&record, &no_entities()),
        MapOutcome::Skipped(SkipReason::NoKey)
    );
}

#[test]
fn test_all_empty_keys_have_no_identity() {
    let model = model();
    let config = entity_config("schema: Person\nkeys: [first_name, last_name]\n");
    let mapping = EntityMapping::new(&model, Some("dataset"), "person", &config).unwrap();

    assert_eq!(mapping.compute_key(&Record::new()), None);
    assert_eq!(
        mapping.compute_key(&Record::new().with("first_name", "  ").with("last_name", "")),
        None
    );
    assert!(mapping
        .compute_key(&Record::new().with("last_name", "Smith"))
        .is_some());
}

#[test]
fn test_key_order_does_not_matter() {
    let model = model();
    let forward = entity_config("schema: Person\nkeys: [first_name, last_name]\n");
    let backward = entity_config("schema: Person\nkeys: [last_name, first_name]\n");
    let forward = EntityMapping::new(&model, Some("p"), "a", &forward).unwrap();
    let backward = EntityMapping::new(&model, Some("p"), "b", &backward).unwrap();

    let record = Record::new()
        .with("first_name", "John")
        .with("last_name", "Smith");
    assert_eq!(forward.compute_key(&record), backward.compute_key(&record));

    // Swapping the values between columns keeps the same multiset of values
    let swapped = Record::new()
        .with("first_name", "Smith")
        .with("last_name", "John");
    assert_eq!(forward.compute_key(&record), forward.compute_key(&swapped));
}

#[test]
fn test_key_prefix_and_literal_partition_ids() {
    let model = model();
    let plain = entity_config("schema: Company\nkeys: [reg]\n");
    let literal = entity_config("schema: Company\nkeys: [reg]\nkey_literal: branch\n");
    let record = Record::new().with("reg", "0001");

    let a = EntityMapping::new(&model, Some("uk"), "c", &plain).unwrap();
    let b = EntityMapping::new(&model, Some("fr"), "c", &plain).unwrap();
    let c = EntityMapping::new(&model, Some("uk"), "c", &literal).unwrap();

    let ids: BTreeSet<Option<String>> = [&a, &b, &c]
        .iter()
        .map(|mapping| mapping.compute_key(&record))
        .collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_id_column_is_passed_through() {
    let model = model();
    let config = entity_config("schema: Company\nid_column: company_id\n");
    let mapping = EntityMapping::new(&model, None, "company", &config).unwrap();

    let record = Record::new().with("company_id", "GB-0001 ");
    assert_eq!(mapping.compute_key(&record).as_deref(), Some("GB-0001 "));

    let record = Record::new().with("company_id", "");
    assert_eq!(mapping.compute_key(&record).as_deref(), Some(""));
    assert!(mapping.map(&record, &no_entities()).entity().is_some());

    assert_eq!(mapping.compute_key(&Record::new()), None);
}

#[test]
fn test_required_property_gates_the_entity() {
    let model = model();
    let config = entity_config(
        r#"
schema: Person
keys: [id]
properties:
  name: { column: name }
  email: { column: email, required: true }
"#,
    );
    let mapping = EntityMapping::new(&model, None, "person", &config).unwrap();

    let record = Record::new().with("id", "1").with("name", "Jane");
    assert_eq!(
        mapping.map(&record, &no_entities()),
        MapOutcome::Skipped(SkipReason::MissingRequired {
            property: "email".to_string()
        })
    );

    let record = record.with("email", "jane@example.org");
    assert!(!mapping.map(&record, &no_entities()).is_skipped());
}

#[test]
fn test_configuration_errors_name_the_mapping() {
    let model = model();

    let err = EntityMapping::new(&model, None, "ghost", &entity_config("schema: Person\n"))
        .unwrap_err();
    assert_eq!(err.to_string(), "No keys or ID: ghost");

    let config = entity_config("schema: Person\nkeys: [a]\nid_column: b\n");
    let err = EntityMapping::new(&model, None, "both", &config).unwrap_err();
    assert_eq!(err.mapping(), Some("both"));

    let config = entity_config("schema: Spaceship\nkeys: [a]\n");
    let err = EntityMapping::new(&model, None, "ship", &config).unwrap_err();
    assert!(matches!(err, MappingError::UnknownSchema { .. }));

    let config = entity_config("schema: Person\nkeys: [a]\nproperties:\n  wingspan: { column: w }\n");
    let err = EntityMapping::new(&model, None, "bird", &config).unwrap_err();
    match err {
        MappingError::UnknownProperty {
            mapping, property, ..
        } => {
            assert_eq!(mapping, "bird");
            assert_eq!(property, "wingspan");
        }
        other => panic!("expected unknown property, got {other}"),
    }
}

// ============================================================================
// COUNTRY CONTEXT
// ============================================================================

/// Writes the countries it was handed as the property value
#[derive(Debug)]
struct CountryEcho {
    prop: Property,
    refs: BTreeSet<String>,
}

impl PropertyBinder for CountryEcho {
    fn prop(&self) -> &Property {
        &self.prop
    }

    fn refs(&self) -> &BTreeSet<String> {
        &self.refs
    }

    fn entity_dependency(&self) -> Option<&str> {
        None
    }

    fn required(&self) -> bool {
        false
    }

    fn bind(&self, _ctx: &BindContext<'_>) -> Result<(), MappingError> {
        Ok(())
    }

    fn apply(
        &self,
        proxy: &mut EntityProxy,
        _record: &Record,
        _entities: &BTreeMap<String, EntityProxy>,
        countries: Option<&BTreeSet<String>>,
    ) {
        let seen: Vec<&str> = countries
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        proxy.add(&self.prop, [seen.join(",")]);
    }
}

#[test]
fn test_countries_are_visible_to_other_properties() {
    let model = model();
    // phone is declared before nationality
    let config = entity_config(
        r#"
schema: Person
keys: [id]
properties:
  phone: { column: phone }
  nationality: { column: nationality }
  country: { column: residence }
"#,
    );
    let mapping = EntityMapping::with_binders(&model, None, "person", &config, |name, spec, prop| {
        if prop.is_country() {
            Ok(Box::new(ftm_mapping::PropertyMapping::new(name, spec, prop)?)
                as Box<dyn PropertyBinder>)
        } else {
            Ok(Box::new(CountryEcho {
                prop: prop.clone(),
                refs: BTreeSet::new(),
            }) as Box<dyn PropertyBinder>)
        }
    })
    .unwrap();

    let record = Record::new()
        .with("id", "1")
        .with("nationality", "GB")
        .with("residence", "FR");
    let proxy = mapping.map(&record, &no_entities()).into_entity().unwrap();
    assert_eq!(proxy.get("phone"), ["fr,gb".to_string()]);
}

// ============================================================================
// QUERY MAPPING
// ============================================================================

const OWNERSHIP_QUERY: &str = r#"
filters_not:
  status: [dissolved, struck_off]
entities:
  ownership:
    schema: Ownership
    keys: [company_number, owner_name]
    properties:
      owner: { entity: owner }
      asset: { entity: company }
      percentage: { column: share }
      summary:
        template: "{{owner_name}} holds {{share}}% of {{company_name}}"
  owner:
    schema: Person
    keys: [owner_name, owner_birth_date]
    properties:
      name: { column: owner_name }
      nationality: { column: owner_country }
  company:
    schema: Company
    key: company_number
    key_literal: company
    properties:
      name: { column: company_name, required: true }
      registrationNumber: { column: company_number }
      jurisdiction: { literal: GB }
      alias: { column: other_names, split: ";" }
"#;

fn ownership_record() -> Record {
    Record::new()
        .with("company_number", "01234567")
        .with("company_name", "Acme Holdings Ltd")
        .with("other_names", "Acme;ACME HOLDINGS")
        .with("owner_name", "Jane Doe")
        .with("owner_birth_date", "1970-01-01")
        .with("owner_country", "GB")
        .with("share", 75)
        .with("status", "active")
}

#[test]
fn test_ownership_query_end_to_end() {
    let model = model();
    let query = QueryMapping::from_yaml_str(&model, Some("registry"), OWNERSHIP_QUERY).unwrap();

    let order: Vec<&str> = query.mappings().iter().map(EntityMapping::name).collect();
    assert_eq!(order, vec!["owner", "company", "ownership"]);

    let entities = query.map(&ownership_record());
    let owner = &entities["owner"];
    let company = &entities["company"];
    let ownership = &entities["ownership"];

    assert_eq!(owner.get("nationality"), ["gb".to_string()]);
    assert_eq!(company.get("jurisdiction"), ["gb".to_string()]);
    assert_eq!(
        company.get("alias"),
        ["Acme".to_string(), "ACME HOLDINGS".to_string()]
    );
    assert_eq!(ownership.get("owner"), [owner.id.clone().unwrap()]);
    assert_eq!(ownership.get("asset"), [company.id.clone().unwrap()]);
    assert_eq!(ownership.get("percentage"), ["75".to_string()]);
    assert_eq!(
        ownership.get("summary"),
        ["Jane Doe holds 75% of Acme Holdings Ltd".to_string()]
    );
}

#[test]
fn test_filtered_records_produce_nothing() {
    let model = model();
    let query = QueryMapping::from_yaml_str(&model, None, OWNERSHIP_QUERY).unwrap();

    let record = ownership_record().with("status", "dissolved");
    assert!(query.map(&record).is_empty());
}

#[test]
fn test_records_are_independent() {
    let model = model();
    let query = QueryMapping::from_yaml_str(&model, None, OWNERSHIP_QUERY).unwrap();

    // A row without a company name drops the company but not the others
    let partial = ownership_record().with("company_name", "");
    let entities = query.map(&partial);
    assert!(!entities.contains_key("company"));
    assert!(entities.contains_key("owner"));
    assert!(!entities["ownership"].has("asset"));

    // The next full row is unaffected
    assert_eq!(query.map(&ownership_record()).len(), 3);
}

#[test]
fn test_query_is_shared_across_threads() {
    let model = model();
    let query = QueryMapping::from_yaml_str(&model, None, OWNERSHIP_QUERY).unwrap();
    let expected = query.map(&ownership_record());

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    assert_eq!(query.map(&ownership_record()), expected);
                }
            });
        }
    });
}

#[test]
fn test_signed_output_keeps_references_consistent() {
    let model = model();
    let query = QueryMapping::from_yaml_str(&model, None, OWNERSHIP_QUERY).unwrap();
    let namespace = Namespace::new("uk_psc");

    let entities = query.map(&ownership_record());
    let owner = namespace.apply(&entities["owner"]);
    let ownership = namespace.apply(&entities["ownership"]);

    assert!(namespace.verify(owner.id.as_deref()));
    assert!(namespace.verify(ownership.id.as_deref()));
    assert_eq!(ownership.get("owner"), [owner.id.clone().unwrap()]);
}
