//! Lossless PHP lexer.
//!
//! Every byte of the input ends up in exactly one token, so concatenating the
//! token texts reproduces the source. Malformed input (unterminated strings or
//! comments) never fails: the offending construct simply runs to end of input.

use crate::token::{is_keyword, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Html,
    Php,
}

/// Streaming PHP lexer over a borrowed source string.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    offset: usize,
    mode: Mode,
    last_meaningful: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            offset: 0,
            mode: Mode::Html,
            last_meaningful: None,
        }
    }

    /// Lexer for a code fragment that is already inside `<?php` (no open tag
    /// expected).
    pub fn fragment(src: &'a str) -> Self {
        Self {
            mode: Mode::Php,
            ..Self::new(src)
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.offset + ahead).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes
            .get(self.offset..)
            .is_some_and(|rest| rest.starts_with(s.as_bytes()))
    }

    fn starts_with_ignore_case(&self, s: &str) -> bool {
        self.bytes
            .get(self.offset..self.offset + s.len())
            .is_some_and(|rest| rest.eq_ignore_ascii_case(s.as_bytes()))
    }

    fn emit(&mut self, kind: TokenKind, start: usize) -> Token {
        if !kind.is_trivia() {
            self.last_meaningful = Some(kind);
        }
        Token::new(kind, &self.src[start..self.offset])
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        match self.mode {
            Mode::Html => Some(self.lex_html()),
            Mode::Php => Some(self.lex_php()),
        }
    }

    /// Length of an opening tag at the current offset, if any.
    fn open_tag_len(&self) -> Option<(TokenKind, usize)> {
        if !self.starts_with("<?") {
            return None;
        }
        if self.starts_with("<?=") {
            return Some((TokenKind::OpenTagWithEcho, 3));
        }
        if self.starts_with_ignore_case("<?php") {
            let after = self.peek(5);
            if after.is_none() || after.is_some_and(|b| b.is_ascii_whitespace()) {
                return Some((TokenKind::OpenTag, 5));
            }
            return None;
        }
        match self.peek(2) {
            None => Some((TokenKind::OpenTag, 2)),
            Some(b) if b.is_ascii_whitespace() => Some((TokenKind::OpenTag, 2)),
            _ => None,
        }
    }

    fn lex_html(&mut self) -> Token {
        let start = self.offset;
        if let Some((kind, len)) = self.open_tag_len() {
            self.offset += len;
            self.mode = Mode::Php;
            return self.emit(kind, start);
        }
        while self.offset < self.bytes.len() {
            if self.open_tag_len().is_some() {
                break;
            }
            self.offset += 1;
        }
        self.emit(TokenKind::InlineHtml, start)
    }

    fn lex_php(&mut self) -> Token {
        let start = self.offset;
        let b = self.bytes[self.offset];

        if b.is_ascii_whitespace() {
            while self.peek(0).is_some_and(|b| b.is_ascii_whitespace()) {
                self.offset += 1;
            }
            return self.emit(TokenKind::Whitespace, start);
        }

        if self.starts_with("?>") {
            self.offset += 2;
            self.mode = Mode::Html;
            return self.emit(TokenKind::CloseTag, start);
        }

        if self.starts_with("#[") {
            self.offset += 2;
            return self.emit(TokenKind::OpenAttribute, start);
        }

        if b == b'#' || self.starts_with("//") {
            self.skip_line_comment();
            return self.emit(TokenKind::Comment, start);
        }

        if self.starts_with("/*") {
            let is_doc = self.starts_with("/**")
                && self.peek(3).is_some_and(|b| b.is_ascii_whitespace());
            self.skip_block_comment();
            let kind = if is_doc {
                TokenKind::DocComment
            } else {
                TokenKind::Comment
            };
            return self.emit(kind, start);
        }

        if b == b'$' && self.peek(1).is_some_and(is_ident_start) {
            self.offset += 1;
            self.skip_ident();
            return self.emit(TokenKind::Variable, start);
        }

        if (b == b'b' || b == b'B') && matches!(self.peek(1), Some(b'\'' | b'"')) {
            self.offset += 1;
            let kind = self.lex_quoted();
            return self.emit(kind, start);
        }

        if is_ident_start(b) || (b == b'\\' && self.peek(1).is_some_and(is_ident_start)) {
            return self.lex_name(start);
        }

        if b.is_ascii_digit() || (b == b'.' && self.peek(1).is_some_and(|b| b.is_ascii_digit())) {
            self.skip_number();
            return self.emit(TokenKind::Number, start);
        }

        if b == b'\'' || b == b'"' || b == b'`' {
            let kind = self.lex_quoted();
            return self.emit(kind, start);
        }

        if self.starts_with("<<<") && self.try_heredoc() {
            return self.emit(TokenKind::Heredoc, start);
        }

        let (kind, len) = operator_at(&self.bytes[self.offset..]);
        self.offset += len;
        self.emit(kind, start)
    }

    fn lex_name(&mut self, start: usize) -> Token {
        if self.bytes[self.offset] == b'\\' {
            self.offset += 1;
        }
        self.skip_ident();
        while self.peek(0) == Some(b'\\') && self.peek(1).is_some_and(is_ident_start) {
            self.offset += 1;
            self.skip_ident();
        }
        let text = &self.src[start..self.offset];
        let kind = if text.contains('\\') {
            TokenKind::QualifiedName
        } else if is_keyword(text) && !self.last_meaningful.is_some_and(TokenKind::is_chain_operator)
        {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        self.emit(kind, start)
    }

    fn skip_ident(&mut self) {
        while self.peek(0).is_some_and(is_ident_continue) {
            self.offset += 1;
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' || self.starts_with("?>") {
                break;
            }
            self.offset += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.offset += 2;
        while self.offset < self.bytes.len() {
            if self.starts_with("*/") {
                self.offset += 2;
                return;
            }
            self.offset += 1;
        }
    }

    fn skip_number(&mut self) {
        if self.starts_with("0x") || self.starts_with("0X") || self.starts_with("0b")
            || self.starts_with("0B")
        {
            self.offset += 2;
            while self
                .peek(0)
                .is_some_and(|b| b.is_ascii_hexdigit() || b == b'_')
            {
                self.offset += 1;
            }
            return;
        }
        while self.peek(0).is_some_and(|b| b.is_ascii_digit() || b == b'_') {
            self.offset += 1;
        }
        if self.peek(0) == Some(b'.') && self.peek(1) != Some(b'.') {
            self.offset += 1;
            while self.peek(0).is_some_and(|b| b.is_ascii_digit() || b == b'_') {
                self.offset += 1;
            }
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek(1), Some(b'+' | b'-')));
            if self.peek(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                self.offset += 1 + sign;
                while self.peek(0).is_some_and(|b| b.is_ascii_digit()) {
                    self.offset += 1;
                }
            }
        }
    }

    /// Consumes a quoted string starting at the opening quote and classifies
    /// it as constant or interpolated.
    fn lex_quoted(&mut self) -> TokenKind {
        let quote = self.bytes[self.offset];
        self.offset += 1;
        let mut interpolated = quote == b'`';
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => {
                    self.offset += 2;
                }
                _ if b == quote => {
                    self.offset += 1;
                    break;
                }
                b'$' if quote != b'\'' => {
                    if self.peek(1).is_some_and(|b| is_ident_start(b) || b == b'{') {
                        interpolated = true;
                    }
                    self.offset += 1;
                }
                b'{' if quote != b'\'' && self.peek(1) == Some(b'$') => {
                    interpolated = true;
                    self.skip_embedded_expression();
                }
                _ => self.offset += 1,
            }
        }
        self.offset = self.offset.min(self.bytes.len());
        if interpolated {
            TokenKind::InterpolatedString
        } else {
            TokenKind::ConstantString
        }
    }

    /// Skips a `{$...}` interpolation, honoring nested braces and strings.
    fn skip_embedded_expression(&mut self) {
        let mut depth = 0usize;
        while let Some(b) = self.peek(0) {
            match b {
                b'{' => {
                    depth += 1;
                    self.offset += 1;
                }
                b'}' => {
                    self.offset += 1;
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                b'\'' | b'"' => {
                    self.lex_quoted();
                }
                _ => self.offset += 1,
            }
        }
    }

    /// Consumes a heredoc/nowdoc if one starts at the current offset.
    fn try_heredoc(&mut self) -> bool {
        let rest = &self.src[self.offset + 3..];
        let trimmed = rest.trim_start_matches([' ', '\t']);
        let mut label_src = trimmed;
        let mut quote = None;
        if let Some(q) = label_src.chars().next().filter(|c| *c == '\'' || *c == '"') {
            quote = Some(q);
            label_src = &label_src[1..];
        }
        let label_len = label_src
            .bytes()
            .take_while(|b| is_ident_continue(*b))
            .count();
        if label_len == 0 || !label_src.as_bytes().first().copied().is_some_and(is_ident_start) {
            return false;
        }
        let label = &label_src[..label_len];
        let mut after_label = &label_src[label_len..];
        if let Some(q) = quote {
            match after_label.strip_prefix(q) {
                Some(stripped) => after_label = stripped,
                None => return false,
            }
        }
        let Some(body_offset) = after_label
            .strip_prefix("\r\n")
            .or_else(|| after_label.strip_prefix('\n'))
            .map(|body| self.src.len() - body.len())
        else {
            return false;
        };

        let mut line_start = body_offset;
        loop {
            let line_end = self.src[line_start..]
                .find('\n')
                .map(|p| line_start + p)
                .unwrap_or(self.src.len());
            let line = &self.src[line_start..line_end];
            let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
            let candidate = &line[indent..];
            if let Some(after) = candidate.strip_prefix(label) {
                if !after.bytes().next().is_some_and(is_ident_continue) {
                    self.offset = line_start + indent + label.len();
                    return true;
                }
            }
            if line_end >= self.src.len() {
                self.offset = self.src.len();
                return true;
            }
            line_start = line_end + 1;
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Tokenizes `text`.
pub fn lex(text: &str) -> Vec<Token> {
    Lexer::new(text).collect()
}

/// Tokenizes a PHP code fragment such as `use Foo\Bar;`.
pub fn lex_fragment(text: &str) -> Vec<Token> {
    Lexer::fragment(text).collect()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

const OPERATORS_3: &[&str] = &["===", "!==", "<=>", "**=", "...", "<<=", ">>=", "??=", "?->"];
const OPERATORS_2: &[&str] = &[
    "->", "::", "=>", "==", "!=", "<>", "<=", ">=", "&&", "||", "??", "++", "--", "+=", "-=", "*=",
    "/=", ".=", "%=", "&=", "|=", "^=", "**", "<<", ">>",
];

fn operator_at(rest: &[u8]) -> (TokenKind, usize) {
    for op in OPERATORS_3 {
        if rest.starts_with(op.as_bytes()) {
            let kind = match *op {
                "..." => TokenKind::Ellipsis,
                "?->" => TokenKind::NullsafeObjectOperator,
                _ => TokenKind::Punct,
            };
            return (kind, 3);
        }
    }
    for op in OPERATORS_2 {
        if rest.starts_with(op.as_bytes()) {
            let kind = match *op {
                "->" => TokenKind::ObjectOperator,
                "::" => TokenKind::DoubleColon,
                "=>" => TokenKind::DoubleArrow,
                _ => TokenKind::Punct,
            };
            return (kind, 2);
        }
    }
    let kind = match rest[0] {
        b'(' => TokenKind::OpenParen,
        b')' => TokenKind::CloseParen,
        b'[' => TokenKind::OpenBracket,
        b']' => TokenKind::CloseBracket,
        b'{' => TokenKind::OpenBrace,
        b'}' => TokenKind::CloseBrace,
        b',' => TokenKind::Comma,
        b';' => TokenKind::Semicolon,
        b'=' => TokenKind::Assign,
        _ => TokenKind::Punct,
    };
    (kind, 1)
}
