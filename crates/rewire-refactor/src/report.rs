use std::fmt;

use serde::Serialize;

use crate::imports::RenamedImport;

/// Why a call site was left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Unknown method, missing next-gen method, or a builtin first parameter.
    UnresolvedRequest,
    TooManyArguments,
    /// A spread or named argument.
    UnsupportedArgument,
    /// The call already passes a request object of the expected type.
    AlreadyMigrated,
    /// No line break precedes the call and the file has no imports.
    NoAnchor,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::UnresolvedRequest => "request type could not be resolved",
            SkipReason::TooManyArguments => "more arguments than the legacy method declares",
            SkipReason::UnsupportedArgument => "spread or named argument",
            SkipReason::AlreadyMigrated => "already passes a request object",
            SkipReason::NoAnchor => "no insertion point",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewrittenCall {
    pub variable: String,
    pub method: String,
    /// Request FQN.
    pub request: String,
    pub request_variable: String,
    /// 1-based line of the client variable in the original text.
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedCall {
    pub variable: String,
    pub method: String,
    pub reason: SkipReason,
    pub line: usize,
}

/// What happened to one file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub rewritten: Vec<RewrittenCall>,
    pub skipped: Vec<SkippedCall>,
    pub renamed_imports: Vec<RenamedImport>,
    pub added_imports: Vec<String>,
}

impl MigrationReport {
    /// True when nothing was rewritten or skipped.
    pub fn is_empty(&self) -> bool {
        self.rewritten.is_empty() && self.skipped.is_empty()
    }
}

/// Result of [`crate::migrate_source`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub output: String,
    pub changed: bool,
    pub report: MigrationReport,
}
