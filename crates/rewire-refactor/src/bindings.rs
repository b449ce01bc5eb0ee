use std::collections::BTreeMap;

use rewire_syntax::{TokenKind, Tokens};

use crate::catalog::ClientType;

/// A variable known to hold a cataloged client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientBinding {
    pub variable: String,
    pub client: ClientType,
    /// Index of the declaring variable token.
    pub declaration: usize,
}

/// Cataloged clients keyed by the lowercased local name they are imported as.
pub type CatalogNames = BTreeMap<String, ClientType>;

/// Client bindings keyed by variable name (including the `$`).
pub type Bindings = BTreeMap<String, ClientBinding>;

/// Collects variables bound to cataloged clients in one left-to-right pass.
///
/// Recognized declarations:
/// - `$x = new T(` and `$x = (new T(`
/// - typed parameters `T $x` and `?T $x` following `(` or `,`
///
/// The last declaration of a variable wins.
pub fn collect_bindings(tokens: &Tokens, clients: &CatalogNames) -> Bindings {
    let mut bindings = Bindings::new();
    for index in 0..tokens.len() {
        if tokens[index].kind != TokenKind::Variable {
            continue;
        }
        let declared = constructed_type(tokens, index).or_else(|| hinted_type(tokens, index));
        let Some(type_index) = declared else {
            continue;
        };
        let Some(client) = clients.get(&tokens[type_index].text.to_ascii_lowercase()) else {
            continue;
        };
        let variable = tokens[index].text.clone();
        tracing::trace!(
            target: "rewire.refactor",
            variable = %variable,
            client = %client.legacy,
            "tracked client binding"
        );
        bindings.insert(
            variable.clone(),
            ClientBinding {
                variable,
                client: client.clone(),
                declaration: index,
            },
        );
    }
    bindings
}

/// Whether the variable at `index` is being declared rather than used.
pub fn is_declaration_site(tokens: &Tokens, index: usize) -> bool {
    tokens
        .get(index)
        .is_some_and(|t| t.kind == TokenKind::Variable)
        && (constructed_type(tokens, index).is_some() || hinted_type(tokens, index).is_some())
}

/// For `$x = new T(` / `$x = (new T(`, the index of `T`.
fn constructed_type(tokens: &Tokens, var: usize) -> Option<usize> {
    let assign = tokens.next_meaningful(var)?;
    if tokens[assign].kind != TokenKind::Assign {
        return None;
    }
    if let Some(prev) = tokens.prev_meaningful(var) {
        if tokens[prev].kind.is_chain_operator() {
            return None;
        }
    }
    let mut next = tokens.next_meaningful(assign)?;
    if tokens[next].kind == TokenKind::OpenParen {
        next = tokens.next_meaningful(next)?;
    }
    if !tokens[next].is_keyword("new") {
        return None;
    }
    let type_index = tokens.next_meaningful(next)?;
    if !tokens[type_index].kind.is_name() {
        return None;
    }
    let open = tokens.next_meaningful(type_index)?;
    (tokens[open].kind == TokenKind::OpenParen).then_some(type_index)
}

/// For a typed parameter `T $x` / `?T $x` after `(` or `,`, the index of `T`.
fn hinted_type(tokens: &Tokens, var: usize) -> Option<usize> {
    let type_index = tokens.prev_meaningful(var)?;
    if !tokens[type_index].kind.is_name() {
        return None;
    }
    let mut before = tokens.prev_meaningful(type_index)?;
    if tokens[before].is_punct("?") {
        before = tokens.prev_meaningful(before)?;
    }
    matches!(tokens[before].kind, TokenKind::OpenParen | TokenKind::Comma).then_some(type_index)
}
