use std::collections::{HashMap, HashSet};

use rewire_syntax::{TokenKind, Tokens};

/// Allocates request variable names, unique within one file.
///
/// The first request of a given type is named after the type (`$createDlpJobRequest`),
/// later ones get a running suffix starting at 2 (`$createDlpJobRequest2`).
/// Counts only ever grow, and names that already occur in the file are
/// skipped.
#[derive(Clone, Debug, Default)]
pub struct RequestVariableCounter {
    counts: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl RequestVariableCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter that avoids every variable already present in `tokens`.
    pub fn for_tokens(tokens: &Tokens) -> Self {
        let mut counter = Self::new();
        counter.taken.extend(
            tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Variable)
                .map(|t| t.text.clone()),
        );
        counter
    }

    pub fn next_name(&mut self, short_name: &str) -> String {
        let base = format!("${}", lcfirst(short_name));
        let count = self.counts.entry(short_name.to_owned()).or_insert(0);
        loop {
            *count += 1;
            let candidate = if *count == 1 {
                base.clone()
            } else {
                format!("{base}{count}")
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

pub(crate) fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
