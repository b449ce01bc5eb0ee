use rewire_syntax::{Token, Tokens};
use thiserror::Error;

/// A half-open token index range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "invalid range: {start}..{end}");
        Self { start, end }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Whether `index` lies strictly inside the range (not on its boundaries).
    pub fn strictly_contains(self, index: usize) -> bool {
        self.start < index && index < self.end
    }
}

/// A single edit against the original token snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenEdit {
    pub range: TokenRange,
    pub replacement: Vec<Token>,
}

impl TokenEdit {
    pub fn insert(index: usize, tokens: Vec<Token>) -> Self {
        Self {
            range: TokenRange::new(index, index),
            replacement: tokens,
        }
    }

    pub fn replace(range: TokenRange, tokens: Vec<Token>) -> Self {
        Self {
            range,
            replacement: tokens,
        }
    }
}

/// Edits planned against one immutable token snapshot.
///
/// Edits are kept in planning order until [`TokenEditSet::normalize`] sorts
/// them. Insertions at the same index keep their planning order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenEditSet {
    edits: Vec<TokenEdit>,
}

impl TokenEditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: TokenEdit) {
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn edits(&self) -> &[TokenEdit] {
        &self.edits
    }

    /// Sort edits, merge same-position insertions and validate non-overlap.
    pub fn normalize(&mut self) -> Result<(), EditError> {
        // Stable: same-position insertions stay in planning order.
        self.edits
            .sort_by(|a, b| a.range.start.cmp(&b.range.start).then(a.range.end.cmp(&b.range.end)));

        let mut merged: Vec<TokenEdit> = Vec::with_capacity(self.edits.len());
        for edit in self.edits.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.range == edit.range && last.range.is_empty() {
                    last.replacement.extend(edit.replacement);
                    continue;
                }
                if last.range == edit.range && last.replacement == edit.replacement {
                    continue;
                }
            }
            merged.push(edit);
        }
        self.edits = merged;

        let mut prev: Option<TokenRange> = None;
        for edit in &self.edits {
            if let Some(prev_range) = prev {
                if edit.range.start < prev_range.end {
                    return Err(EditError::OverlappingEdits {
                        first: prev_range,
                        second: edit.range,
                    });
                }
            }
            prev = Some(edit.range);
        }

        Ok(())
    }

    /// Normalizes the set and applies it to `tokens`, last edit first, so that
    /// every planned index stays valid while earlier edits are pending.
    pub fn apply(mut self, tokens: &mut Tokens) -> Result<(), EditError> {
        self.normalize()?;
        let len = tokens.len();
        if let Some(edit) = self.edits.iter().find(|edit| edit.range.end > len) {
            return Err(EditError::OutOfBounds {
                range: edit.range,
                len,
            });
        }
        for edit in self.edits.into_iter().rev() {
            if edit.range.is_empty() {
                tokens.insert_at(edit.range.start, edit.replacement);
            } else {
                tokens.override_range(edit.range.start..edit.range.end, edit.replacement);
            }
        }
        Ok(())
    }
}

impl Extend<TokenEdit> for TokenEditSet {
    fn extend<I: IntoIterator<Item = TokenEdit>>(&mut self, iter: I) {
        self.edits.extend(iter);
    }
}

impl FromIterator<TokenEdit> for TokenEditSet {
    fn from_iter<I: IntoIterator<Item = TokenEdit>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("overlapping edits: {first:?} overlaps {second:?}")]
    OverlappingEdits { first: TokenRange, second: TokenRange },
    #[error("token edit range {range:?} is outside the token sequence (len={len})")]
    OutOfBounds { range: TokenRange, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rewire_syntax::TokenKind;

    fn var(name: &str) -> Token {
        Token::variable(name)
    }

    #[test]
    fn same_position_inserts_keep_planning_order() {
        let mut tokens = Tokens::from_code("<?php $a;");
        let mut set = TokenEditSet::new();
        set.push(TokenEdit::insert(2, vec![var("$x"), Token::whitespace(" ")]));
        set.push(TokenEdit::insert(2, vec![var("$y"), Token::whitespace(" ")]));
        set.apply(&mut tokens).unwrap();
        assert_eq!(tokens.generate_code(), "<?php $x $y $a;");
    }

    #[test]
    fn edits_apply_back_to_front_against_original_indices() {
        let mut tokens = Tokens::from_code("<?php f($a); g($b);");
        let a = tokens.find_kind(TokenKind::Variable, 0, tokens.len()).unwrap();
        let b = tokens.find_kind(TokenKind::Variable, a + 1, tokens.len()).unwrap();
        let set: TokenEditSet = [
            TokenEdit::replace(TokenRange::new(a, a + 1), vec![var("$first"), Token::whitespace(" "), var("$more")]),
            TokenEdit::replace(TokenRange::new(b, b + 1), vec![var("$second")]),
            TokenEdit::insert(2, vec![var("$c"), Token::new(TokenKind::Semicolon, ";"), Token::whitespace(" ")]),
        ]
        .into_iter()
        .collect();
        set.apply(&mut tokens).unwrap();
        assert_eq!(tokens.generate_code(), "<?php $c; f($first $more); g($second);");
    }

    #[test]
    fn insert_at_replace_start_precedes_replacement() {
        let mut tokens = Tokens::from_code("<?php $a;");
        let mut set = TokenEditSet::new();
        set.push(TokenEdit::replace(TokenRange::new(2, 3), vec![var("$b")]));
        set.push(TokenEdit::insert(2, vec![var("$x")]));
        set.apply(&mut tokens).unwrap();
        assert_eq!(tokens.generate_code(), "<?php $x$b;");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let mut set = TokenEditSet::new();
        set.push(TokenEdit::replace(TokenRange::new(2, 6), vec![]));
        set.push(TokenEdit::insert(4, vec![var("$x")]));
        assert_eq!(
            set.normalize(),
            Err(EditError::OverlappingEdits {
                first: TokenRange::new(2, 6),
                second: TokenRange::new(4, 4),
            })
        );
    }

    #[test]
    fn out_of_bounds_edits_are_rejected() {
        let mut tokens = Tokens::from_code("<?php $a;");
        let mut set = TokenEditSet::new();
        set.push(TokenEdit::replace(TokenRange::new(3, 10), Vec::new()));
        assert!(matches!(
            set.apply(&mut tokens),
            Err(EditError::OutOfBounds { len: 4, .. })
        ));
        assert_eq!(tokens.generate_code(), "<?php $a;");
    }
}
