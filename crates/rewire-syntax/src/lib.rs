//! Token-level view of PHP source.
//!
//! This crate provides the lossless lexer used by the rewriting engine and the
//! [`Tokens`] sequence service it edits:
//! - [`lex`]: splits source text into [`Token`]s. Concatenating the token texts
//!   always reproduces the input byte for byte, including malformed input.
//! - [`Tokens`]: an ordered token sequence with meaningful-token navigation,
//!   balanced-bracket matching, and in-place insertion/overwrite.

mod lexer;
mod token;
mod tokens;

pub use lexer::{lex, lex_fragment, Lexer};
pub use token::{is_keyword, Token, TokenKind};
pub use tokens::Tokens;

#[cfg(test)]
mod tests;
