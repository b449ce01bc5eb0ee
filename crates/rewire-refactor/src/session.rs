use std::collections::BTreeMap;

use rewire_syntax::Tokens;
use rewire_types::TypeIntrospector;

use crate::bindings::{collect_bindings, CatalogNames};
use crate::catalog::{CatalogOptions, ClientType, TypeCatalog};
use crate::counter::RequestVariableCounter;
use crate::edit::TokenEditSet;
use crate::imports::{consolidate, parse_imports, ImportTable};
use crate::report::MigrationReport;
use crate::synthesis;
use crate::MigrateError;

/// Per-file migration state: the memoizing catalog, the variable counter and
/// whether the after-imports fallback anchor has been used yet.
///
/// A session is consumed by [`MigrationSession::migrate`]; build a new one per
/// file.
pub struct MigrationSession<'a> {
    pub(crate) catalog: TypeCatalog<'a>,
    pub(crate) counter: RequestVariableCounter,
    pub(crate) fallback_used: bool,
}

impl<'a> MigrationSession<'a> {
    pub fn new(introspector: &'a dyn TypeIntrospector, options: &'a CatalogOptions) -> Self {
        Self {
            catalog: TypeCatalog::new(introspector, options),
            counter: RequestVariableCounter::new(),
            fallback_used: false,
        }
    }

    /// Rewrites every eligible call in `tokens` in place.
    ///
    /// When no call is rewritten the tokens are left untouched, even if some
    /// imports would otherwise be renamed or reordered.
    pub fn migrate(mut self, tokens: &mut Tokens) -> Result<MigrationReport, MigrateError> {
        self.counter = RequestVariableCounter::for_tokens(tokens);
        let imports = parse_imports(tokens);
        let clients = self.catalog_names(&imports);
        if clients.is_empty() {
            tracing::trace!(target: "rewire.refactor", "no cataloged client imports");
            return Ok(MigrationReport::default());
        }

        let bindings = collect_bindings(tokens, &clients);
        let synthesis = synthesis::rewrite(tokens, &mut self, &bindings, &imports);
        let mut report = MigrationReport {
            rewritten: synthesis.rewritten,
            skipped: synthesis.skipped,
            ..MigrationReport::default()
        };
        if report.rewritten.is_empty() {
            return Ok(report);
        }

        let renames: BTreeMap<String, String> = clients
            .values()
            .map(|client| (client.legacy.to_ascii_lowercase(), client.next_gen.clone()))
            .collect();
        let changes = consolidate(tokens, &imports, &renames, &synthesis.used_requests);

        let mut edits: TokenEditSet = synthesis.edits.into_iter().collect();
        edits.extend(changes.edits);
        tracing::debug!(
            target: "rewire.refactor",
            edits = edits.len(),
            rewritten = report.rewritten.len(),
            skipped = report.skipped.len(),
            "applying planned edits"
        );
        edits.apply(tokens)?;

        report.renamed_imports = changes.renamed;
        report.added_imports = changes.added;
        Ok(report)
    }

    /// Cataloged clients keyed by the lowercased local name they are imported as.
    fn catalog_names(&self, imports: &ImportTable) -> CatalogNames {
        let mut names = CatalogNames::new();
        for import in imports.class_imports() {
            let Some(next_gen) = self.catalog.resolve_next_gen_type(&import.name) else {
                continue;
            };
            tracing::trace!(
                target: "rewire.refactor",
                legacy = %import.name,
                next_gen = %next_gen,
                "cataloged client import"
            );
            names.insert(
                import.local_name().to_ascii_lowercase(),
                ClientType {
                    legacy: import.name.clone(),
                    next_gen,
                },
            );
        }
        names
    }
}
