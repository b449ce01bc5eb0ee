#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use rewire_refactor::{migrate_source, CatalogOptions};
use rewire_types::SchemaIntrospector;

mod utils;

fn introspector() -> &'static SchemaIntrospector {
    static TYPES: OnceLock<SchemaIntrospector> = OnceLock::new();
    TYPES.get_or_init(rewire_test_utils::test_introspector)
}

// Seed inputs that mention the test schema's clients reach the rewriting
// paths; everything else checks that untouched input stays byte-identical.
fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };
    let source = utils::as_php(text);

    let Ok(outcome) = migrate_source(&source, introspector(), &CatalogOptions::default()) else {
        return;
    };
    if outcome.report.rewritten.is_empty() {
        assert_eq!(outcome.output, source);
        return;
    }

    // A migrated file has nothing left to migrate.
    if let Ok(again) = migrate_source(&outcome.output, introspector(), &CatalogOptions::default()) {
        assert!(again.report.rewritten.is_empty(), "migration is not idempotent");
    }
});
