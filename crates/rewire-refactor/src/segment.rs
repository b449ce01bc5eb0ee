use std::ops::Range;

use rewire_syntax::{TokenKind, Tokens};

/// Chains longer than this are treated as ending early; the outer loop still
/// keeps the argument intact because commas only split at the top level.
const MAX_CHAIN_DEPTH: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgumentShape {
    Positional,
    /// `...$args`
    Spread,
    /// `name: $value`
    Named,
}

/// One top-level argument of a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentGroup {
    /// Token indices of the argument, including leading trivia.
    pub range: Range<usize>,
    pub shape: ArgumentShape,
}

impl ArgumentGroup {
    /// The argument range without leading or trailing trivia.
    pub fn trimmed(&self, tokens: &Tokens) -> Range<usize> {
        trim_trivia(tokens, self.range.clone())
    }
}

/// A call's argument list split at top-level commas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentedCall {
    pub open: usize,
    pub close: usize,
    pub groups: Vec<ArgumentGroup>,
}

/// Splits the argument list of the call whose method name sits at
/// `method_name_index`.
///
/// Returns `None` if the name is not followed by `(` or the parenthesis is
/// never closed.
pub fn segment_arguments(tokens: &Tokens, method_name_index: usize) -> Option<SegmentedCall> {
    let open = tokens.next_meaningful(method_name_index)?;
    if tokens[open].kind != TokenKind::OpenParen {
        return None;
    }
    let close = tokens.find_block_end(open)?;

    let mut groups = Vec::new();
    let mut group_start = open + 1;
    let mut index = open + 1;
    while index < close {
        let token = &tokens[index];
        if token.kind == TokenKind::Comma {
            push_group(tokens, &mut groups, group_start..index);
            index += 1;
            group_start = index;
            continue;
        }
        index = skip_operand(tokens, index, close, 0);
    }
    push_group(tokens, &mut groups, group_start..close);

    Some(SegmentedCall {
        open,
        close,
        groups,
    })
}

fn push_group(tokens: &Tokens, groups: &mut Vec<ArgumentGroup>, range: Range<usize>) {
    let trimmed = trim_trivia(tokens, range.clone());
    if trimmed.is_empty() {
        // Trailing comma (or an empty argument list).
        return;
    }
    let first = &tokens[trimmed.start];
    let shape = if first.kind == TokenKind::Ellipsis {
        ArgumentShape::Spread
    } else if (first.kind == TokenKind::Ident || first.kind == TokenKind::Keyword)
        && tokens
            .next_meaningful(trimmed.start)
            .is_some_and(|next| tokens[next].is_punct(":"))
    {
        ArgumentShape::Named
    } else {
        ArgumentShape::Positional
    };
    groups.push(ArgumentGroup { range, shape });
}

/// Consumes one token or bracketed block starting at `index`, then any
/// member/static access chain that follows it. Returns the next index to scan.
fn skip_operand(tokens: &Tokens, index: usize, limit: usize, depth: usize) -> usize {
    let next = if tokens[index].kind.is_opening_bracket() {
        match tokens.find_block_end(index) {
            Some(end) if end < limit => end + 1,
            _ => limit,
        }
    } else {
        index + 1
    };
    skip_chain(tokens, next, limit, depth)
}

/// Continues an argument across `->`, `?->` and `::` access chains.
fn skip_chain(tokens: &Tokens, index: usize, limit: usize, depth: usize) -> usize {
    if depth >= MAX_CHAIN_DEPTH || index >= limit {
        return index.min(limit);
    }
    let Some(op) = next_meaningful_before(tokens, index, limit) else {
        return index;
    };
    if !tokens[op].kind.is_chain_operator() {
        return index;
    }
    let Some(member) = tokens.next_meaningful(op).filter(|&m| m < limit) else {
        return limit;
    };
    skip_operand(tokens, member, limit, depth + 1)
}

fn next_meaningful_before(tokens: &Tokens, index: usize, limit: usize) -> Option<usize> {
    (index..limit).find(|&i| tokens[i].is_meaningful())
}

/// Narrows `range` to exclude leading and trailing trivia.
pub fn trim_trivia(tokens: &Tokens, range: Range<usize>) -> Range<usize> {
    let mut start = range.start;
    let mut end = range.end;
    while start < end && tokens[start].is_trivia() {
        start += 1;
    }
    while end > start && tokens[end - 1].is_trivia() {
        end -= 1;
    }
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segment(code: &str) -> (Tokens, SegmentedCall) {
        let tokens = Tokens::from_code(code);
        let name = tokens
            .iter()
            .position(|t| t.text == "f")
            .expect("call name");
        let call = segment_arguments(&tokens, name).expect("segmented call");
        (tokens, call)
    }

    fn group_texts(tokens: &Tokens, call: &SegmentedCall) -> Vec<String> {
        call.groups
            .iter()
            .map(|g| {
                g.trimmed(tokens)
                    .map(|i| tokens[i].text.as_str())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn nested_calls_and_member_chains_stay_intact() {
        let (tokens, call) = segment("<?php f(a, g(b, c), $x->y()->z);");
        assert_eq!(
            group_texts(&tokens, &call),
            vec!["a", "g(b, c)", "$x->y()->z"]
        );
        assert_eq!(tokens[call.open].kind, TokenKind::OpenParen);
        assert_eq!(tokens[call.close].kind, TokenKind::CloseParen);
    }

    #[test]
    fn strings_and_arrays_do_not_leak_separators() {
        let (tokens, call) = segment(
            "<?php f('a,b', \"x {$y[',']} z\", ['k' => [1, 2]], <<<EOT\n,\nEOT, Foo::bar(1, 2)->baz[3]);",
        );
        assert_eq!(call.groups.len(), 5);
        assert_eq!(group_texts(&tokens, &call)[4], "Foo::bar(1, 2)->baz[3]");
    }

    #[test]
    fn trailing_comma_does_not_create_group() {
        let (tokens, call) = segment("<?php f(\n    $a,\n    $b,\n);");
        assert_eq!(group_texts(&tokens, &call), vec!["$a", "$b"]);
        // Leading trivia belongs to the group.
        assert_eq!(tokens[call.groups[0].range.start].kind, TokenKind::Whitespace);
    }

    #[test]
    fn empty_argument_list() {
        let (_, call) = segment("<?php f( );");
        assert!(call.groups.is_empty());
    }

    #[test]
    fn spread_and_named_arguments_are_classified() {
        let (_, call) = segment("<?php f($a, ...$rest, name: $v, $b ? $c : $d);");
        let shapes: Vec<ArgumentShape> = call.groups.iter().map(|g| g.shape).collect();
        assert_eq!(
            shapes,
            vec![
                ArgumentShape::Positional,
                ArgumentShape::Spread,
                ArgumentShape::Named,
                ArgumentShape::Positional,
            ]
        );
    }

    #[test]
    fn not_a_call() {
        let tokens = Tokens::from_code("<?php $x->f; $y->f(1");
        let first = tokens.iter().position(|t| t.text == "f").unwrap();
        assert_eq!(segment_arguments(&tokens, first), None);
        let second = tokens.iter().rposition(|t| t.text == "f").unwrap();
        assert_eq!(segment_arguments(&tokens, second), None);
    }
}
