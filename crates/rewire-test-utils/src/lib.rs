//! Utilities shared by rewire tests.
//!
//! - before/after fixture pairs with `BLESS=1` regeneration ([`fixtures`])
//! - a shared type schema describing a couple of generated clients
//!   ([`test_introspector`])
//! - a process-wide lock for tests that touch environment variables

pub mod env;
mod fixtures;

use std::path::PathBuf;

use rewire_types::SchemaIntrospector;

pub use env::{env_lock, EnvVarGuard};
pub use fixtures::{
    assert_fixture_pair, bless_enabled, fixture_names, load_fixture_pair, FixturePair,
};

/// The shared test schema, as JSON text.
pub const TEST_SCHEMA: &str = include_str!("../data/schema.json");

/// Path of the shared test schema on disk.
pub fn test_schema_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("schema.json")
}

/// Introspector over [`TEST_SCHEMA`].
///
/// Knows the legacy and next-gen DLP and Language clients, their request
/// types, and a `Google\Cloud\Handwritten\HandwrittenClient` that has no
/// generated parent.
pub fn test_introspector() -> SchemaIntrospector {
    SchemaIntrospector::from_json_str(TEST_SCHEMA)
        .unwrap_or_else(|err| panic!("test schema should parse: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewire_types::TypeIntrospector;

    #[test]
    fn test_schema_loads_from_text_and_disk() {
        let from_text = test_introspector();
        assert!(from_text.type_exists("Google\\Cloud\\Dlp\\V2\\DlpServiceClient"));
        let from_disk = SchemaIntrospector::load(test_schema_path()).unwrap();
        assert_eq!(from_disk.type_count(), from_text.type_count());
        from_disk.probe().unwrap();
    }
}
