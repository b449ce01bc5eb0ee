use serde::Serialize;

/// Lexical category of a PHP token.
///
/// The set is deliberately coarse: the rewriting engine only needs to tell
/// trivia from meaningful tokens, recognize brackets and access operators, and
/// know which literals are opaque. Operators without a dedicated kind are
/// reported as [`TokenKind::Punct`] and distinguished by their text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TokenKind {
    // --- Host text & tags ---
    InlineHtml,
    OpenTag,
    OpenTagWithEcho,
    CloseTag,

    // --- Trivia ---
    Whitespace,
    Comment,
    DocComment,

    // --- Names ---
    Variable,
    Ident,
    QualifiedName,
    Keyword,

    // --- Literals ---
    ConstantString,
    InterpolatedString,
    Heredoc,
    Number,

    // --- Access operators ---
    ObjectOperator,
    NullsafeObjectOperator,
    DoubleColon,
    DoubleArrow,
    Ellipsis,

    // --- Separators ---
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenAttribute,
    Comma,
    Semicolon,
    Assign,

    /// Any other operator (`+`, `===`, `??=`, `&`, ...).
    Punct,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }

    pub fn is_open_tag(self) -> bool {
        matches!(self, TokenKind::OpenTag | TokenKind::OpenTagWithEcho)
    }

    pub fn is_opening_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::OpenParen
                | TokenKind::OpenBracket
                | TokenKind::OpenBrace
                | TokenKind::OpenAttribute
        )
    }

    pub fn is_closing_bracket(self) -> bool {
        matches!(
            self,
            TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace
        )
    }

    /// `->`, `?->` and `::`.
    pub fn is_chain_operator(self) -> bool {
        matches!(
            self,
            TokenKind::ObjectOperator | TokenKind::NullsafeObjectOperator | TokenKind::DoubleColon
        )
    }

    pub fn is_string_literal(self) -> bool {
        matches!(
            self,
            TokenKind::ConstantString | TokenKind::InterpolatedString | TokenKind::Heredoc
        )
    }

    /// Names that may spell a class reference (`Foo`, `Foo\Bar`, `\Foo\Bar`).
    pub fn is_name(self) -> bool {
        matches!(self, TokenKind::Ident | TokenKind::QualifiedName)
    }
}

/// A single lexical unit: its kind and its exact source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn whitespace(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Whitespace, text)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(TokenKind::Variable, name)
    }

    /// Builds a name token, choosing [`TokenKind::QualifiedName`] when the
    /// name contains a namespace separator.
    pub fn name(name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = if name.contains('\\') {
            TokenKind::QualifiedName
        } else {
            TokenKind::Ident
        };
        Self::new(kind, name)
    }

    pub fn keyword(word: impl Into<String>) -> Self {
        Self::new(TokenKind::Keyword, word)
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }

    pub fn is_meaningful(&self) -> bool {
        !self.kind.is_trivia()
    }

    /// Case-insensitive keyword check (PHP keywords are case-insensitive).
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_punct(&self, op: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == op
    }

    pub fn contains_newline(&self) -> bool {
        self.text.contains('\n')
    }

    /// Literal string value of a [`TokenKind::ConstantString`] without its
    /// quotes. Escape sequences are left untouched.
    pub fn string_value(&self) -> Option<&str> {
        if self.kind != TokenKind::ConstantString {
            return None;
        }
        let text = self.text.as_str();
        // `b'...'` binary string prefix.
        let text = text
            .strip_prefix('b')
            .or_else(|| text.strip_prefix('B'))
            .unwrap_or(text);
        let quote = text.chars().next()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        text.strip_prefix(quote)?.strip_suffix(quote)
    }
}

const KEYWORDS: &[&str] = &[
    "abstract",
    "and",
    "array",
    "as",
    "break",
    "callable",
    "case",
    "catch",
    "class",
    "clone",
    "const",
    "continue",
    "declare",
    "default",
    "do",
    "echo",
    "else",
    "elseif",
    "empty",
    "enddeclare",
    "endfor",
    "endforeach",
    "endif",
    "endswitch",
    "endwhile",
    "enum",
    "extends",
    "final",
    "finally",
    "fn",
    "for",
    "foreach",
    "function",
    "global",
    "goto",
    "if",
    "implements",
    "include",
    "include_once",
    "instanceof",
    "insteadof",
    "interface",
    "isset",
    "list",
    "match",
    "namespace",
    "new",
    "or",
    "print",
    "private",
    "protected",
    "public",
    "readonly",
    "require",
    "require_once",
    "return",
    "static",
    "switch",
    "throw",
    "trait",
    "try",
    "unset",
    "use",
    "var",
    "while",
    "xor",
    "yield",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}
