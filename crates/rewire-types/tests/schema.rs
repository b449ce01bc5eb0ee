use pretty_assertions::assert_eq;
use rewire_types::{IntrospectionError, SchemaIntrospector, TypeIntrospector};

const SCHEMA: &str = r#"{
  "types": {
    "Google\\Cloud\\Dlp\\V2\\DlpServiceClient": {
      "parent": "Google\\Cloud\\Dlp\\V2\\Gapic\\DlpServiceGapicClient"
    },
    "Google\\Cloud\\Dlp\\V2\\Gapic\\DlpServiceGapicClient": {
      "methods": {
        "createDlpJob": [
          { "name": "parent", "type": "string" },
          { "name": "optionalArgs", "type": "array" }
        ]
      }
    },
    "Google\\Cloud\\Dlp\\V2\\Client\\DlpServiceClient": {
      "methods": {
        "createDlpJob": [
          { "name": "request", "type": "Google\\Cloud\\Dlp\\V2\\CreateDlpJobRequest" },
          "callOptions"
        ],
        "legacyShape": [
          { "name": "request", "type": "Custom\\Thing", "is_builtin": true }
        ]
      }
    },
    "Google\\Cloud\\Dlp\\V2\\CreateDlpJobRequest": {}
  }
}"#;

#[test]
fn schema_resolves_inherited_methods() {
    let types = SchemaIntrospector::from_json_str(SCHEMA).unwrap();
    assert_eq!(types.type_count(), 4);
    let params = types
        .parameters("Google\\Cloud\\Dlp\\V2\\DlpServiceClient", "createDlpJob")
        .unwrap();
    assert_eq!(params[0].name, "parent");
    assert!(params[0].is_builtin);
    assert_eq!(params[1].name, "optionalArgs");
}

#[test]
fn schema_derives_builtin_flags() {
    let types = SchemaIntrospector::from_json_str(SCHEMA).unwrap();
    let method = types
        .method("\\Google\\Cloud\\Dlp\\V2\\Client\\DlpServiceClient", "createDlpJob")
        .unwrap();
    let first = method.first_parameter().unwrap();
    assert!(!first.is_builtin);
    assert_eq!(
        first.class_name(),
        Some("Google\\Cloud\\Dlp\\V2\\CreateDlpJobRequest")
    );
    assert_eq!(method.parameters[1].declared_type, None);
    assert!(method.parameters[1].is_builtin);

    let explicit = types
        .parameters("Google\\Cloud\\Dlp\\V2\\Client\\DlpServiceClient", "legacyShape")
        .unwrap();
    assert!(explicit[0].is_builtin);
}

#[test]
fn load_reads_file_and_probe_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("types.json");
    std::fs::write(&path, SCHEMA).unwrap();

    let types = SchemaIntrospector::load(&path).unwrap();
    assert_eq!(types.path(), Some(path.as_path()));
    types.probe().unwrap();
}

#[test]
fn load_reports_missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        SchemaIntrospector::load(&missing),
        Err(IntrospectionError::Io { .. })
    ));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ \"types\": [").unwrap();
    assert!(matches!(
        SchemaIntrospector::load(&broken),
        Err(IntrospectionError::Json { .. })
    ));
}

#[test]
fn probe_rejects_empty_schema() {
    let types = SchemaIntrospector::from_json_str(r#"{ "types": {} }"#).unwrap();
    let err = types.probe().unwrap_err();
    assert!(err.to_string().contains("declares no types"), "{err}");
}
