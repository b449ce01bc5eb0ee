use std::ops::{Index, Range};

use serde::Serialize;

use crate::lexer::lex;
use crate::token::{Token, TokenKind};

/// Ordered, mutable token sequence for a single file.
///
/// Indices are plain positions into the sequence; any insertion or overwrite
/// shifts the indices of every token after the edited range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tokens {
    tokens: Vec<Token>,
}

impl Tokens {
    pub fn from_code(code: &str) -> Self {
        Self { tokens: lex(code) }
    }

    pub fn from_vec(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Serializes the sequence back into source text.
    pub fn generate_code(&self) -> String {
        let len = self.tokens.iter().map(|t| t.text.len()).sum();
        let mut out = String::with_capacity(len);
        for token in &self.tokens {
            out.push_str(&token.text);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Index of the first meaningful token strictly after `index`.
    pub fn next_meaningful(&self, index: usize) -> Option<usize> {
        (index + 1..self.tokens.len()).find(|&i| self.tokens[i].is_meaningful())
    }

    /// Index of the last meaningful token strictly before `index`.
    pub fn prev_meaningful(&self, index: usize) -> Option<usize> {
        (0..index.min(self.tokens.len()))
            .rev()
            .find(|&i| self.tokens[i].is_meaningful())
    }

    /// Index of the bracket closing the block opened at `open`.
    ///
    /// Returns `None` when `open` is not an opening bracket or the block is
    /// unterminated.
    pub fn find_block_end(&self, open: usize) -> Option<usize> {
        let first = self.tokens.get(open)?;
        if !first.kind.is_opening_bracket() {
            return None;
        }
        let mut depth = 0usize;
        for (offset, token) in self.tokens[open..].iter().enumerate() {
            if token.kind.is_opening_bracket() {
                depth += 1;
            } else if token.kind.is_closing_bracket() {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
        }
        None
    }

    /// Index of the bracket opening the block closed at `close`.
    pub fn find_block_start(&self, close: usize) -> Option<usize> {
        let last = self.tokens.get(close)?;
        if !last.kind.is_closing_bracket() {
            return None;
        }
        let mut depth = 0usize;
        for index in (0..=close).rev() {
            let kind = self.tokens[index].kind;
            if kind.is_closing_bracket() {
                depth += 1;
            } else if kind.is_opening_bracket() {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
        }
        None
    }

    /// First index in `start..end` holding a token of `kind`.
    pub fn find_kind(&self, kind: TokenKind, start: usize, end: usize) -> Option<usize> {
        let end = end.min(self.tokens.len());
        (start..end).find(|&i| self.tokens[i].kind == kind)
    }

    /// Inserts `tokens` before `index`. Tokens previously at `index` and after
    /// move right by the number of inserted tokens.
    pub fn insert_at(&mut self, index: usize, tokens: impl IntoIterator<Item = Token>) {
        let index = index.min(self.tokens.len());
        self.tokens.splice(index..index, tokens);
    }

    /// Replaces the tokens in `range` with `tokens`.
    pub fn override_range(&mut self, range: Range<usize>, tokens: impl IntoIterator<Item = Token>) {
        let end = range.end.min(self.tokens.len());
        let start = range.start.min(end);
        self.tokens.splice(start..end, tokens);
    }

    /// Whether the bracket at `index` opens an array literal.
    ///
    /// Recognizes short `[...]` literals (as opposed to `$a[...]` index access)
    /// and the long `array(...)` form.
    pub fn is_array_literal_open(&self, index: usize) -> bool {
        let Some(token) = self.tokens.get(index) else {
            return false;
        };
        let prev = self.prev_meaningful(index).map(|i| &self.tokens[i]);
        match token.kind {
            TokenKind::OpenParen => prev.is_some_and(|t| t.is_keyword("array")),
            TokenKind::OpenBracket => !prev.is_some_and(|t| {
                matches!(
                    t.kind,
                    TokenKind::Variable
                        | TokenKind::Ident
                        | TokenKind::QualifiedName
                        | TokenKind::CloseParen
                        | TokenKind::CloseBracket
                        | TokenKind::CloseBrace
                        | TokenKind::ConstantString
                        | TokenKind::InterpolatedString
                        | TokenKind::Heredoc
                )
            }),
            _ => false,
        }
    }

    /// Line-break style used by the file: `"\r\n"` when the first line break
    /// is a CRLF, `"\n"` otherwise.
    pub fn line_ending(&self) -> &'static str {
        for token in &self.tokens {
            if let Some(pos) = token.text.find('\n') {
                return if token.text[..pos].ends_with('\r') {
                    "\r\n"
                } else {
                    "\n"
                };
            }
        }
        "\n"
    }
}

impl Index<usize> for Tokens {
    type Output = Token;

    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a Tokens {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl From<Vec<Token>> for Tokens {
    fn from(tokens: Vec<Token>) -> Self {
        Self::from_vec(tokens)
    }
}
