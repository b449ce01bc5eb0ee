use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use rewire_syntax::{lex_fragment, Token, TokenKind, Tokens};
use serde::Serialize;

use crate::catalog::short_name;
use crate::edit::{TokenEdit, TokenRange};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Class,
    Function,
    Const,
}

/// One imported name from a top-level `use` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    /// Fully qualified name without a leading `\`. For group uses, the
    /// statement text after the kind keyword.
    pub name: String,
    pub alias: Option<String>,
    /// Index of the name token, for in-place renames.
    pub name_index: Option<usize>,
    /// Original statement text for group uses (`use A\{B, C};`), which are
    /// kept verbatim.
    pub verbatim: Option<String>,
    /// Tokens of the whole statement, including an attached trailing comment.
    pub statement: Range<usize>,
    pub leading_comments: Vec<String>,
    pub trailing_comment: Option<String>,
}

impl Import {
    /// The name the import introduces into the file.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| short_name(&self.name))
    }

    pub fn is_group(&self) -> bool {
        self.verbatim.is_some()
    }

    fn render(&self) -> String {
        let mut out = match &self.verbatim {
            Some(text) => text.clone(),
            None => {
                let keyword = match self.kind {
                    ImportKind::Class => "",
                    ImportKind::Function => "function ",
                    ImportKind::Const => "const ",
                };
                match &self.alias {
                    Some(alias) => format!("use {keyword}{} as {alias};", self.name),
                    None => format!("use {keyword}{};", self.name),
                }
            }
        };
        if let Some(comment) = &self.trailing_comment {
            out.push(' ');
            out.push_str(comment);
        }
        out
    }

    fn dedup_key(&self) -> (ImportKind, String, Option<String>, Option<String>) {
        (
            self.kind,
            self.name.clone(),
            self.alias.clone(),
            self.verbatim.clone(),
        )
    }
}

/// The contiguous run of imports that ends at the last import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportBlock {
    pub range: Range<usize>,
    /// Indent of the block's first line, reused for every rendered line.
    pub indent: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportTable {
    imports: Vec<Import>,
    block: Option<ImportBlock>,
}

impl ImportTable {
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn block(&self) -> Option<&ImportBlock> {
        self.block.as_ref()
    }

    /// Position just after the last import, where code may be inserted.
    pub fn insertion_index(&self) -> Option<usize> {
        self.block.as_ref().map(|block| block.range.end)
    }

    /// Whether `index` lies strictly inside the import block.
    pub fn block_strictly_contains(&self, index: usize) -> bool {
        self.block.as_ref().is_some_and(|block| {
            TokenRange::new(block.range.start, block.range.end).strictly_contains(index)
        })
    }

    /// Plain class imports (no group uses).
    pub fn class_imports(&self) -> impl Iterator<Item = &Import> {
        self.imports
            .iter()
            .filter(|import| import.kind == ImportKind::Class && !import.is_group())
    }
}

/// Parses top-level `use` statements.
///
/// Statements inside class or function bodies (trait uses) and closure `use`
/// clauses are ignored; braced namespace blocks are treated as top level.
pub fn parse_imports(tokens: &Tokens) -> ImportTable {
    let mut imports = Vec::new();
    // One entry per open brace: whether it opened a namespace block.
    let mut braces: Vec<bool> = Vec::new();
    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        match token.kind {
            TokenKind::OpenBrace => braces.push(opens_namespace(tokens, index)),
            TokenKind::CloseBrace => {
                braces.pop();
            }
            TokenKind::Keyword
                if token.is_keyword("use")
                    && braces.iter().all(|is_namespace| *is_namespace)
                    && at_statement_start(tokens, index) =>
            {
                if let Some((parsed, next)) = parse_use_statement(tokens, index) {
                    imports.extend(parsed);
                    index = next;
                    continue;
                }
            }
            _ => {}
        }
        index += 1;
    }

    let block = import_block(tokens, &mut imports);
    ImportTable { imports, block }
}

fn opens_namespace(tokens: &Tokens, brace: usize) -> bool {
    let Some(prev) = tokens.prev_meaningful(brace) else {
        return false;
    };
    if tokens[prev].is_keyword("namespace") {
        return true;
    }
    tokens[prev].kind.is_name()
        && tokens
            .prev_meaningful(prev)
            .is_some_and(|before| tokens[before].is_keyword("namespace"))
}

fn at_statement_start(tokens: &Tokens, index: usize) -> bool {
    match tokens.prev_meaningful(index) {
        None => true,
        Some(prev) => matches!(
            tokens[prev].kind,
            TokenKind::Semicolon
                | TokenKind::OpenBrace
                | TokenKind::CloseBrace
                | TokenKind::OpenTag
                | TokenKind::CloseTag
        ),
    }
}

fn text_of(tokens: &Tokens, range: Range<usize>) -> String {
    range.map(|i| tokens[i].text.as_str()).collect()
}

/// A comment on the same line right after `index - 1`, if any.
fn same_line_comment(tokens: &Tokens, index: usize) -> Option<usize> {
    let token = tokens.get(index)?;
    match token.kind {
        TokenKind::Comment => Some(index),
        TokenKind::Whitespace if !token.contains_newline() => tokens
            .get(index + 1)
            .filter(|next| next.kind == TokenKind::Comment)
            .map(|_| index + 1),
        _ => None,
    }
}

fn parse_use_statement(tokens: &Tokens, use_index: usize) -> Option<(Vec<Import>, usize)> {
    let semicolon = tokens.find_kind(TokenKind::Semicolon, use_index + 1, tokens.len())?;
    let mut cursor = tokens.next_meaningful(use_index)?;
    if tokens[cursor].kind == TokenKind::OpenParen {
        return None;
    }
    let kind = if tokens[cursor].is_keyword("function") {
        cursor = tokens.next_meaningful(cursor)?;
        ImportKind::Function
    } else if tokens[cursor].is_keyword("const") {
        cursor = tokens.next_meaningful(cursor)?;
        ImportKind::Const
    } else {
        ImportKind::Class
    };

    let mut end = semicolon + 1;
    let mut trailing_comment = None;
    if let Some(comment) = same_line_comment(tokens, end) {
        trailing_comment = Some(tokens[comment].text.clone());
        end = comment + 1;
    }
    let statement = use_index..end;

    let items = if tokens.find_kind(TokenKind::OpenBrace, cursor, semicolon).is_some() {
        None
    } else {
        parse_use_items(tokens, cursor, semicolon)
    };

    let mut imports = match items {
        Some(items) => items
            .into_iter()
            .map(|(name_index, alias)| Import {
                kind,
                name: tokens[name_index].text.trim_start_matches('\\').to_owned(),
                alias,
                name_index: Some(name_index),
                verbatim: None,
                statement: statement.clone(),
                leading_comments: Vec::new(),
                trailing_comment: None,
            })
            .collect::<Vec<_>>(),
        None => vec![Import {
            kind,
            name: text_of(tokens, cursor..semicolon)
                .trim()
                .trim_start_matches('\\')
                .to_owned(),
            alias: None,
            name_index: None,
            verbatim: Some(text_of(tokens, use_index..semicolon + 1)),
            statement: statement.clone(),
            leading_comments: Vec::new(),
            trailing_comment: None,
        }],
    };
    if let Some(last) = imports.last_mut() {
        last.trailing_comment = trailing_comment;
    }
    Some((imports, end))
}

/// Parses `Name [as Alias] (, Name [as Alias])*` between `start` and `end`.
fn parse_use_items(
    tokens: &Tokens,
    start: usize,
    end: usize,
) -> Option<Vec<(usize, Option<String>)>> {
    let meaningful: Vec<usize> = (start..end).filter(|&i| tokens[i].is_meaningful()).collect();
    let mut items = Vec::new();
    for item in meaningful.split(|&i| tokens[i].kind == TokenKind::Comma) {
        match item {
            [name] if tokens[*name].kind.is_name() => items.push((*name, None)),
            [name, as_kw, alias]
                if tokens[*name].kind.is_name()
                    && tokens[*as_kw].is_keyword("as")
                    && matches!(tokens[*alias].kind, TokenKind::Ident | TokenKind::Keyword) =>
            {
                items.push((*name, Some(tokens[*alias].text.clone())));
            }
            _ => return None,
        }
    }
    (!items.is_empty()).then_some(items)
}

/// Finds the import block and attaches comments between its statements to the
/// following import.
fn import_block(tokens: &Tokens, imports: &mut [Import]) -> Option<ImportBlock> {
    let last = imports.last()?;
    let end = last.statement.end;
    let mut first = imports.len() - 1;
    while first > 0 {
        let prev = &imports[first - 1];
        let current = &imports[first];
        if prev.statement == current.statement {
            first -= 1;
            continue;
        }
        let gap = prev.statement.end..current.statement.start;
        if !gap.clone().all(|i| tokens[i].is_trivia()) {
            break;
        }
        let comments: Vec<String> = gap
            .filter(|&i| {
                matches!(
                    tokens[i].kind,
                    TokenKind::Comment | TokenKind::DocComment
                )
            })
            .map(|i| tokens[i].text.clone())
            .collect();
        imports[first].leading_comments = comments;
        first -= 1;
    }
    // Statements sharing a range only carry comments on their first item.
    let start = imports[first].statement.start;

    let indent = start
        .checked_sub(1)
        .and_then(|i| tokens.get(i))
        .filter(|t| t.kind == TokenKind::Whitespace)
        .and_then(|t| t.text.rsplit_once('\n').map(|(_, after)| after.to_owned()))
        .unwrap_or_default();

    Some(ImportBlock {
        range: start..end,
        indent,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenamedImport {
    pub from: String,
    pub to: String,
}

/// Import edits produced by [`consolidate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportChanges {
    pub edits: Vec<TokenEdit>,
    pub renamed: Vec<RenamedImport>,
    pub added: Vec<String>,
}

/// Renames legacy client imports, adds missing request imports and reorders
/// the import block.
///
/// `renames` maps lowercased legacy FQNs to their replacements; `requests`
/// lists request FQNs in first-use order. Files without imports are left
/// untouched.
pub fn consolidate(
    tokens: &Tokens,
    table: &ImportTable,
    renames: &BTreeMap<String, String>,
    requests: &[String],
) -> ImportChanges {
    let mut changes = ImportChanges::default();
    let Some(block) = table.block() else {
        return changes;
    };

    let mut entries: Vec<Import> = Vec::new();
    for import in table.imports() {
        let rename = (import.kind == ImportKind::Class && !import.is_group())
            .then(|| renames.get(&import.name.to_ascii_lowercase()))
            .flatten();
        let in_block = import.statement.start >= block.range.start;
        if let Some(new_name) = rename {
            changes.renamed.push(RenamedImport {
                from: import.name.clone(),
                to: new_name.clone(),
            });
            if !in_block {
                if let Some(name_index) = import.name_index {
                    changes.edits.push(TokenEdit::replace(
                        TokenRange::new(name_index, name_index + 1),
                        vec![Token::name(new_name.as_str())],
                    ));
                }
            }
        }
        if in_block {
            let mut entry = import.clone();
            if let Some(new_name) = rename {
                entry.name = new_name.clone();
            }
            entries.push(entry);
        }
    }

    for fqn in requests {
        let imported = entries
            .iter()
            .chain(table.imports())
            .any(|import| {
                import.kind == ImportKind::Class
                    && !import.is_group()
                    && import.name.eq_ignore_ascii_case(fqn)
            });
        if imported {
            continue;
        }
        changes.added.push(fqn.clone());
        entries.push(Import {
            kind: ImportKind::Class,
            name: fqn.clone(),
            alias: None,
            name_index: None,
            verbatim: None,
            statement: block.range.end..block.range.end,
            leading_comments: Vec::new(),
            trailing_comment: None,
        });
    }

    entries.sort_by_cached_key(|import| (import.kind, import.name.to_ascii_lowercase()));
    let mut seen = HashSet::new();
    entries.retain(|import| seen.insert(import.dedup_key()));

    let line_break = tokens.line_ending();
    let mut lines: Vec<String> = Vec::new();
    for entry in &entries {
        lines.extend(entry.leading_comments.iter().cloned());
        lines.push(entry.render());
    }
    let separator = format!("{line_break}{}", block.indent);
    let rendered = lines.join(&separator);

    if rendered != text_of(tokens, block.range.clone()) {
        changes.edits.push(TokenEdit::replace(
            TokenRange::new(block.range.start, block.range.end),
            lex_fragment(&rendered),
        ));
    }
    changes
}
