//! Plans the rewrite of each eligible client call.
//!
//! A rewritten call gets two edits against the original snapshot: the request
//! construction inserted on its own line before the enclosing statement, and
//! the argument list replaced by the request variable.

use std::collections::HashMap;
use std::ops::Range;

use rewire_syntax::{Token, TokenKind, Tokens};

use crate::bindings::{is_declaration_site, Bindings, ClientBinding};
use crate::catalog::{ParameterRole, RequestTypeDescriptor};
use crate::counter::ucfirst;
use crate::edit::{TokenEdit, TokenRange};
use crate::imports::ImportTable;
use crate::report::{RewrittenCall, SkipReason, SkippedCall};
use crate::segment::{
    segment_arguments, trim_trivia, ArgumentGroup, ArgumentShape, SegmentedCall,
};
use crate::session::MigrationSession;

const SETTER_INDENT: &str = "    ";

/// Everything planned for one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Synthesis {
    pub edits: Vec<TokenEdit>,
    /// Request FQNs referenced by short name, in first-use order.
    pub used_requests: Vec<String>,
    pub rewritten: Vec<RewrittenCall>,
    pub skipped: Vec<SkippedCall>,
}

/// Scans `tokens` once, left to right, and plans a rewrite for every call on a
/// tracked client binding.
pub fn rewrite(
    tokens: &Tokens,
    session: &mut MigrationSession<'_>,
    bindings: &Bindings,
    imports: &ImportTable,
) -> Synthesis {
    let mut planner = Planner::new(tokens, session, imports);
    let mut synthesis = Synthesis::default();

    let mut index = 0;
    while index < tokens.len() {
        let Some((binding, name_index, call)) = call_site(tokens, bindings, index) else {
            index += 1;
            continue;
        };
        let method = tokens[name_index].text.clone();
        let line = planner.lines[index];
        match planner.plan(index, binding, &method, &call) {
            Ok(planned) => {
                tracing::debug!(
                    target: "rewire.refactor",
                    variable = %binding.variable,
                    method = %method,
                    request = %planned.request.fqn,
                    line,
                    "rewrote call"
                );
                if planned.import_request && !synthesis.used_requests.contains(&planned.request.fqn) {
                    synthesis.used_requests.push(planned.request.fqn.clone());
                }
                synthesis.edits.extend(planned.edits);
                synthesis.rewritten.push(RewrittenCall {
                    variable: binding.variable.clone(),
                    method,
                    request: planned.request.fqn,
                    request_variable: planned.variable,
                    line,
                });
                index = call.close + 1;
            }
            Err(reason) => {
                tracing::debug!(
                    target: "rewire.refactor",
                    variable = %binding.variable,
                    method = %method,
                    line,
                    %reason,
                    "skipped call"
                );
                synthesis.skipped.push(SkippedCall {
                    variable: binding.variable.clone(),
                    method,
                    reason,
                    line,
                });
                index = name_index + 1;
            }
        }
    }
    synthesis
}

/// Matches `$client->method(` at `index`.
fn call_site<'b>(
    tokens: &Tokens,
    bindings: &'b Bindings,
    index: usize,
) -> Option<(&'b ClientBinding, usize, SegmentedCall)> {
    let token = &tokens[index];
    if token.kind != TokenKind::Variable {
        return None;
    }
    let binding = bindings.get(&token.text)?;
    if is_declaration_site(tokens, index) {
        return None;
    }
    if let Some(prev) = tokens.prev_meaningful(index) {
        if tokens[prev].kind.is_chain_operator() {
            return None;
        }
    }
    let arrow = tokens.next_meaningful(index)?;
    if tokens[arrow].kind != TokenKind::ObjectOperator {
        return None;
    }
    let name_index = tokens.next_meaningful(arrow)?;
    if tokens[name_index].kind != TokenKind::Ident {
        return None;
    }
    let call = segment_arguments(tokens, name_index)?;
    Some((binding, name_index, call))
}

struct PlannedCall {
    request: RequestTypeDescriptor,
    variable: String,
    /// False when the construction had to spell the FQN.
    import_request: bool,
    edits: Vec<TokenEdit>,
}

struct Anchor {
    index: usize,
    indent: String,
    line_break: &'static str,
    /// Emit a blank line before the construction.
    separated: bool,
}

struct Setter {
    name: String,
    value: Vec<Token>,
}

struct Planner<'t, 's, 'a> {
    tokens: &'t Tokens,
    session: &'s mut MigrationSession<'a>,
    imports: &'t ImportTable,
    /// Lowercased short names already bound to a class in this file.
    claimed: HashMap<String, String>,
    /// 1-based line of every token.
    lines: Vec<usize>,
}

impl<'t, 's, 'a> Planner<'t, 's, 'a> {
    fn new(
        tokens: &'t Tokens,
        session: &'s mut MigrationSession<'a>,
        imports: &'t ImportTable,
    ) -> Self {
        let claimed = imports
            .class_imports()
            .map(|import| (import.local_name().to_ascii_lowercase(), import.name.clone()))
            .collect();
        let mut lines = Vec::with_capacity(tokens.len());
        let mut line = 1;
        for token in tokens {
            lines.push(line);
            line += token.text.matches('\n').count();
        }
        Self {
            tokens,
            session,
            imports,
            claimed,
            lines,
        }
    }

    fn plan(
        &mut self,
        var_index: usize,
        binding: &ClientBinding,
        method: &str,
        call: &SegmentedCall,
    ) -> Result<PlannedCall, SkipReason> {
        let request = self
            .session
            .catalog
            .resolve_request(&binding.client, method)
            .ok_or(SkipReason::UnresolvedRequest)?;
        if call.groups.len() > request.parameters.len() {
            return Err(SkipReason::TooManyArguments);
        }
        if call
            .groups
            .iter()
            .any(|group| group.shape != ArgumentShape::Positional)
        {
            return Err(SkipReason::UnsupportedArgument);
        }
        if self.already_migrated(call, &request) {
            return Err(SkipReason::AlreadyMigrated);
        }
        let anchor = self.anchor(var_index).ok_or(SkipReason::NoAnchor)?;

        let variable = self.session.counter.next_name(&request.short_name);
        let setters = self.setters(call, &request);
        let (type_token, import_request) = self.request_type_token(&request);

        let construction = construction_tokens(&anchor, &variable, type_token, setters);
        let edits = vec![
            TokenEdit::insert(anchor.index, construction),
            TokenEdit::replace(
                TokenRange::new(call.open + 1, call.close),
                vec![Token::variable(variable.as_str())],
            ),
        ];
        Ok(PlannedCall {
            request,
            variable,
            import_request,
            edits,
        })
    }

    /// A single variable argument that was assigned `new Short(...)` of the
    /// expected request type.
    fn already_migrated(&self, call: &SegmentedCall, request: &RequestTypeDescriptor) -> bool {
        let tokens = self.tokens;
        let [group] = call.groups.as_slice() else {
            return false;
        };
        let range = group.trimmed(tokens);
        if range.len() != 1 || tokens[range.start].kind != TokenKind::Variable {
            return false;
        }
        let Some(mut value) = assigned_value(tokens, &tokens[range.start].text, range.start) else {
            return false;
        };
        if tokens[value].kind == TokenKind::OpenParen {
            let Some(next) = tokens.next_meaningful(value) else {
                return false;
            };
            value = next;
        }
        if !tokens[value].is_keyword("new") {
            return false;
        }
        tokens
            .next_meaningful(value)
            .filter(|&name| tokens[name].kind.is_name())
            .is_some_and(|name| {
                crate::catalog::short_name(tokens[name].text.trim_start_matches('\\'))
                    .eq_ignore_ascii_case(&request.short_name)
            })
    }

    fn anchor(&mut self, var_index: usize) -> Option<Anchor> {
        let tokens = self.tokens;
        let start = statement_start(tokens, var_index);
        if let Some(ws) = line_break_before(tokens, start) {
            if !self.imports.block_strictly_contains(ws) {
                let text = &tokens[ws].text;
                let indent = text
                    .rsplit_once('\n')
                    .map(|(_, after)| after.to_owned())
                    .unwrap_or_default();
                let line_break = if text.contains("\r\n") { "\r\n" } else { "\n" };
                return Some(Anchor {
                    index: ws,
                    indent,
                    line_break,
                    separated: false,
                });
            }
        }

        let index = self.imports.insertion_index()?;
        if index > var_index {
            return None;
        }
        let separated = !self.session.fallback_used;
        self.session.fallback_used = true;
        Some(Anchor {
            index,
            indent: String::new(),
            line_break: tokens.line_ending(),
            separated,
        })
    }

    fn setters(&self, call: &SegmentedCall, request: &RequestTypeDescriptor) -> Vec<Setter> {
        let prefix = &self.session.catalog.options().setter_prefix;
        let mut setters = Vec::new();
        for (group, parameter) in call.groups.iter().zip(&request.parameters) {
            match parameter.role {
                ParameterRole::Named => setters.push(Setter {
                    name: format!("{prefix}{}", ucfirst(&parameter.name)),
                    value: self.tokens.as_slice()[group.trimmed(self.tokens)].to_vec(),
                }),
                ParameterRole::Options => {
                    setters.extend(
                        self.option_setters(group)
                            .into_iter()
                            .map(|(key, value)| Setter {
                                name: format!("{prefix}{}", ucfirst(&key)),
                                value,
                            }),
                    );
                }
            }
        }
        setters
    }

    /// Setters for the catch-all options argument, as `(key, value tokens)`.
    fn option_setters(&self, group: &ArgumentGroup) -> Vec<(String, Vec<Token>)> {
        let tokens = self.tokens;
        let range = group.trimmed(tokens);
        if range.is_empty() {
            return Vec::new();
        }

        if let Some((open, close)) = array_literal_bounds(tokens, range.start) {
            if close + 1 == range.end {
                return literal_pairs(tokens, open, close)
                    .into_iter()
                    .map(|pair| (pair.key, tokens.as_slice()[pair.value].to_vec()))
                    .collect();
            }
        }

        if range.len() == 1 && tokens[range.start].kind == TokenKind::Variable {
            let variable = &tokens[range.start];
            let literal = assigned_array_literal(tokens, &variable.text, range.start);
            if let Some((open, close)) = literal {
                return literal_pairs(tokens, open, close)
                    .into_iter()
                    .map(|pair| {
                        let access = vec![
                            variable.clone(),
                            Token::new(TokenKind::OpenBracket, "["),
                            tokens[pair.key_index].clone(),
                            Token::new(TokenKind::CloseBracket, "]"),
                        ];
                        (pair.key, access)
                    })
                    .collect();
            }
            tracing::trace!(
                target: "rewire.refactor",
                variable = %variable.text,
                "options variable has no literal array assignment"
            );
        }
        Vec::new()
    }

    /// The request class as written in the construction, and whether it
    /// needs an import.
    fn request_type_token(&mut self, request: &RequestTypeDescriptor) -> (Token, bool) {
        let key = request.short_name.to_ascii_lowercase();
        match self.claimed.get(&key) {
            Some(fqn) if !fqn.eq_ignore_ascii_case(&request.fqn) => {
                tracing::debug!(
                    target: "rewire.refactor",
                    request = %request.fqn,
                    conflicting = %fqn,
                    "request short name already imported; using fully qualified name"
                );
                (Token::name(format!("\\{}", request.fqn)), false)
            }
            Some(_) => (Token::name(request.short_name.as_str()), true),
            None => {
                self.claimed.insert(key, request.fqn.clone());
                (Token::name(request.short_name.as_str()), true)
            }
        }
    }
}

fn construction_tokens(
    anchor: &Anchor,
    variable: &str,
    type_token: Token,
    setters: Vec<Setter>,
) -> Vec<Token> {
    let line_break = anchor.line_break;
    let mut lead = String::new();
    if anchor.separated {
        lead.push_str(line_break);
    }
    lead.push_str(line_break);
    lead.push_str(&anchor.indent);

    let mut out = vec![
        Token::whitespace(lead),
        Token::variable(variable),
        Token::whitespace(" "),
        Token::new(TokenKind::Assign, "="),
        Token::whitespace(" "),
    ];
    let new_expression = [
        Token::keyword("new"),
        Token::whitespace(" "),
        type_token,
        Token::new(TokenKind::OpenParen, "("),
        Token::new(TokenKind::CloseParen, ")"),
    ];
    if setters.is_empty() {
        out.extend(new_expression);
    } else {
        out.push(Token::new(TokenKind::OpenParen, "("));
        out.extend(new_expression);
        out.push(Token::new(TokenKind::CloseParen, ")"));
        let setter_lead = format!("{line_break}{}{SETTER_INDENT}", anchor.indent);
        for setter in setters {
            out.push(Token::whitespace(setter_lead.as_str()));
            out.push(Token::new(TokenKind::ObjectOperator, "->"));
            out.push(Token::new(TokenKind::Ident, setter.name));
            out.push(Token::new(TokenKind::OpenParen, "("));
            out.extend(setter.value);
            out.push(Token::new(TokenKind::CloseParen, ")"));
        }
    }
    out.push(Token::new(TokenKind::Semicolon, ";"));
    out
}

/// First token of the statement containing `index`.
///
/// Walks back over balanced `(...)`/`[...]` groups and stops at `;`, braces,
/// tags or inline text.
fn statement_start(tokens: &Tokens, index: usize) -> usize {
    let mut start = index;
    let mut cursor = index;
    while let Some(prev) = tokens.prev_meaningful(cursor) {
        let kind = tokens[prev].kind;
        match kind {
            TokenKind::Semicolon
            | TokenKind::OpenBrace
            | TokenKind::CloseBrace
            | TokenKind::CloseTag
            | TokenKind::InlineHtml => break,
            _ if kind.is_open_tag() => break,
            TokenKind::CloseParen | TokenKind::CloseBracket => {
                let Some(open) = tokens.find_block_start(prev) else {
                    break;
                };
                start = open;
                cursor = open;
            }
            _ => {
                start = prev;
                cursor = prev;
            }
        }
    }
    start
}

/// Nearest whitespace token containing a line break before `start`, jumping
/// over bracketed blocks. `None` when an open tag or the first token comes
/// first.
fn line_break_before(tokens: &Tokens, start: usize) -> Option<usize> {
    let mut index = start;
    while index > 0 {
        index -= 1;
        let token = &tokens[index];
        if token.kind == TokenKind::Whitespace && token.contains_newline() {
            return Some(index);
        }
        if token.kind.is_open_tag() {
            return None;
        }
        if token.kind.is_closing_bracket() {
            if let Some(open) = tokens.find_block_start(index) {
                index = open;
            }
        }
    }
    None
}

/// First value tokens of the plain assignments `$var = ...` before `before`,
/// nearest first. Property and static assignments do not count.
fn assignments<'t>(
    tokens: &'t Tokens,
    variable: &'t str,
    before: usize,
) -> impl Iterator<Item = usize> + 't {
    (0..before).rev().filter_map(move |index| {
        let token = &tokens[index];
        if token.kind != TokenKind::Variable || token.text != variable {
            return None;
        }
        let assign = tokens.next_meaningful(index)?;
        if tokens[assign].kind != TokenKind::Assign {
            return None;
        }
        if tokens
            .prev_meaningful(index)
            .is_some_and(|prev| tokens[prev].kind.is_chain_operator())
        {
            return None;
        }
        tokens.next_meaningful(assign)
    })
}

/// Index of the first value token of the nearest assignment to `variable`.
fn assigned_value(tokens: &Tokens, variable: &str, before: usize) -> Option<usize> {
    assignments(tokens, variable, before).next()
}

/// Bracket bounds of the nearest assignment of an inline array literal to
/// `variable`. Assignments of any other value are passed over.
fn assigned_array_literal(
    tokens: &Tokens,
    variable: &str,
    before: usize,
) -> Option<(usize, usize)> {
    assignments(tokens, variable, before).find_map(|value| array_literal_bounds(tokens, value))
}

/// For an inline array literal starting at `index` (`[` or `array(`), the
/// indices of its opening and closing brackets.
fn array_literal_bounds(tokens: &Tokens, index: usize) -> Option<(usize, usize)> {
    let token = &tokens[index];
    let open = if token.kind == TokenKind::OpenBracket && tokens.is_array_literal_open(index) {
        index
    } else if token.is_keyword("array") {
        let paren = tokens.next_meaningful(index)?;
        if tokens[paren].kind != TokenKind::OpenParen {
            return None;
        }
        paren
    } else {
        return None;
    };
    let close = tokens.find_block_end(open)?;
    Some((open, close))
}

/// A `'key' => value` entry of an array literal.
struct LiteralPair {
    key: String,
    key_index: usize,
    /// Value tokens without surrounding trivia.
    value: Range<usize>,
}

/// Top-level pairs of the array literal between `open` and `close`.
///
/// Entries without a key, with a non-literal key, or with a key that is not a
/// valid setter suffix are ignored.
fn literal_pairs(tokens: &Tokens, open: usize, close: usize) -> Vec<LiteralPair> {
    let mut pairs = Vec::new();
    let mut element_start = open + 1;
    let mut index = open + 1;
    while index <= close {
        if index == close || tokens[index].kind == TokenKind::Comma {
            if let Some(pair) = literal_pair(tokens, element_start..index) {
                pairs.push(pair);
            }
            element_start = index + 1;
            index += 1;
            continue;
        }
        index = if tokens[index].kind.is_opening_bracket() {
            tokens
                .find_block_end(index)
                .map_or(close, |end| (end + 1).min(close))
        } else {
            index + 1
        };
    }
    pairs
}

fn literal_pair(tokens: &Tokens, element: Range<usize>) -> Option<LiteralPair> {
    let element = trim_trivia(tokens, element);
    let mut arrow = None;
    let mut index = element.start;
    while index < element.end {
        let token = &tokens[index];
        if token.kind == TokenKind::DoubleArrow {
            arrow = Some(index);
            break;
        }
        index = if token.kind.is_opening_bracket() {
            tokens
                .find_block_end(index)
                .map_or(element.end, |end| end + 1)
        } else {
            index + 1
        };
    }
    let arrow = arrow?;

    let key_range = trim_trivia(tokens, element.start..arrow);
    if key_range.len() != 1 {
        return None;
    }
    let key = tokens[key_range.start].string_value()?;
    if !is_identifier(key) {
        return None;
    }
    let value = trim_trivia(tokens, arrow + 1..element.end);
    (!value.is_empty()).then(|| LiteralPair {
        key: key.to_owned(),
        key_index: key_range.start,
        value,
    })
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
