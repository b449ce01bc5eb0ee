//! Token-level migration of legacy client calls to request-object calls.
//!
//! Given PHP source that calls methods on legacy generated clients with flat
//! arguments, the engine rewrites each eligible call so it builds a request
//! object through setters and passes that object instead:
//!
//! ```text
//! $dlp->createDlpJob($parent, ['jobId' => $id]);
//! ```
//!
//! becomes
//!
//! ```text
//! $createDlpJobRequest = (new CreateDlpJobRequest())
//!     ->setParent($parent)
//!     ->setJobId($id);
//! $dlp->createDlpJob($createDlpJobRequest);
//! ```
//!
//! Client imports are switched to the next-generation classes and request
//! classes are imported. Type questions are answered by a
//! [`TypeIntrospector`]; everything else is purely lexical.
//!
//! Per file the pipeline is: parse imports, resolve cataloged clients, collect
//! bindings, plan one rewrite per call against the unmodified tokens, then
//! apply all edits at once (see [`TokenEditSet`]).

mod bindings;
mod catalog;
mod counter;
mod edit;
mod imports;
mod preview;
mod report;
mod segment;
mod session;
mod synthesis;

use rewire_syntax::Tokens;
use rewire_types::{IntrospectionError, TypeIntrospector};
use thiserror::Error;

pub use bindings::{collect_bindings, is_declaration_site, Bindings, CatalogNames, ClientBinding};
pub use catalog::{
    short_name, CatalogOptions, ClientType, ParameterDescriptor, ParameterRole,
    RequestTypeDescriptor, TypeCatalog,
};
pub use counter::RequestVariableCounter;
pub use edit::{EditError, TokenEdit, TokenEditSet, TokenRange};
pub use imports::{
    consolidate, parse_imports, Import, ImportBlock, ImportChanges, ImportKind, ImportTable,
    RenamedImport,
};
pub use preview::{generate_preview, unified_diff, FilePreview};
pub use report::{MigrationOutcome, MigrationReport, RewrittenCall, SkipReason, SkippedCall};
pub use segment::{segment_arguments, trim_trivia, ArgumentGroup, ArgumentShape, SegmentedCall};
pub use session::MigrationSession;
pub use synthesis::{rewrite, Synthesis};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
    #[error("internal edit conflict: {0}")]
    Edit(#[from] EditError),
}

/// Migrates `tokens` in place.
pub fn migrate_tokens(
    tokens: &mut Tokens,
    introspector: &dyn TypeIntrospector,
    options: &CatalogOptions,
) -> Result<MigrationReport, MigrateError> {
    MigrationSession::new(introspector, options).migrate(tokens)
}

/// Migrates one PHP source text.
///
/// Text without rewritten calls is returned byte-identical.
pub fn migrate_source(
    source: &str,
    introspector: &dyn TypeIntrospector,
    options: &CatalogOptions,
) -> Result<MigrationOutcome, MigrateError> {
    let mut tokens = Tokens::from_code(source);
    let report = migrate_tokens(&mut tokens, introspector, options)?;
    let output = if report.rewritten.is_empty() {
        source.to_owned()
    } else {
        tokens.generate_code()
    };
    Ok(MigrationOutcome {
        changed: output != source,
        output,
        report,
    })
}

/// Reusable entry point for migrating many files against one introspector.
///
/// The introspector is probed once on construction, so a broken schema is
/// reported before any file is touched.
pub struct Migrator<'a> {
    introspector: &'a (dyn TypeIntrospector + Sync),
    options: CatalogOptions,
}

impl<'a> Migrator<'a> {
    pub fn new(
        introspector: &'a (dyn TypeIntrospector + Sync),
        options: CatalogOptions,
    ) -> Result<Self, MigrateError> {
        introspector.probe()?;
        Ok(Self {
            introspector,
            options,
        })
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    pub fn migrate_source(&self, source: &str) -> Result<MigrationOutcome, MigrateError> {
        migrate_source(source, self.introspector, &self.options)
    }
}
