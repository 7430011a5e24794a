//! Grouping of a flat lexeme stream into a token tree
//!
//! Passes, applied to every parenthesised level from the inside out:
//! 1. parentheses: `( ... )` becomes a Parenthesis group
//! 2. functions: a name directly followed by a Parenthesis group
//! 3. identifiers: dotted names with an optional alias
//! 4. identifier lists: comma-separated identifiers and literals
//! 5. where clauses: `WHERE` up to the next clause or set operation
//!
//! Statements are split on `;` before grouping, and each statement's type is
//! detected from its first keyword.

use super::keywords;
use super::lexer::Lexeme;
use super::token_tree::{GroupKind, NodeId, StatementType, TokenKind, TokenTree};

/// Build one Statement group per `;`-terminated chunk of `lexemes`
pub fn parse_statements(tree: &mut TokenTree, lexemes: Vec<Lexeme>) -> Vec<NodeId> {
    split_statements(lexemes)
        .into_iter()
        .map(|chunk| build_statement(tree, chunk))
        .collect()
}

/// Split on `;`; the semicolon stays with the statement it terminates
fn split_statements(lexemes: Vec<Lexeme>) -> Vec<Vec<Lexeme>> {
    let mut statements = Vec::new();
    let mut current = Vec::new();

    for lexeme in lexemes {
        let terminates = lexeme.kind == TokenKind::Punctuation && lexeme.text == ";";
        current.push(lexeme);
        if terminates {
            statements.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        statements.push(current);
    }

    statements
}

fn build_statement(tree: &mut TokenTree, chunk: Vec<Lexeme>) -> NodeId {
    let leaves = chunk
        .into_iter()
        .map(|lexeme| tree.push_token(lexeme.kind, lexeme.text))
        .collect();

    let children = group_parentheses(tree, leaves);
    let statement_type = detect_statement_type(tree, &children);
    log::trace!("Grouped {} statement with {} top-level tokens", statement_type, children.len());

    tree.push_group(GroupKind::Statement(statement_type), children)
}

/// Statement type from the first significant token. For a `WITH` statement
/// the first DML keyword after the CTE definitions decides.
pub fn detect_statement_type(tree: &TokenTree, children: &[NodeId]) -> StatementType {
    let mut significant = children
        .iter()
        .copied()
        .filter(|&id| !tree.is_whitespace(id));

    let Some(first) = significant.next() else {
        return StatementType::Unknown;
    };
    if !tree.is_keyword(first) {
        return StatementType::Unknown;
    }

    if tree.is_keyword_text(first, "WITH") {
        return significant
            .filter(|&id| tree.is_keyword(id))
            .filter_map(|id| StatementType::from_keyword(tree.text(id)))
            .find(|statement_type| statement_type.is_dml())
            .unwrap_or(StatementType::Unknown);
    }

    StatementType::from_keyword(tree.text(first)).unwrap_or(StatementType::Unknown)
}

fn group_parentheses(tree: &mut TokenTree, leaves: Vec<NodeId>) -> Vec<NodeId> {
    let mut root = Vec::new();
    let mut open: Vec<Vec<NodeId>> = Vec::new();

    for id in leaves {
        if tree.is_punctuation(id, "(") {
            open.push(vec![id]);
            continue;
        }

        let closing = tree.is_punctuation(id, ")");
        match open.pop() {
            Some(mut frame) if closing => {
                let inner = frame.split_off(1);
                frame.extend(group_sequence(tree, inner));
                frame.push(id);
                let group = tree.push_group(GroupKind::Parenthesis, frame);
                open.last_mut().unwrap_or(&mut root).push(group);
            }
            Some(mut frame) => {
                frame.push(id);
                open.push(frame);
            }
            None => root.push(id),
        }
    }

    // Unbalanced "(" leaves its tokens ungrouped
    for frame in open {
        root.extend(frame);
    }

    group_sequence(tree, root)
}

fn group_sequence(tree: &mut TokenTree, items: Vec<NodeId>) -> Vec<NodeId> {
    let items = group_functions(tree, items);
    let items = group_identifiers(tree, items);
    let items = group_identifier_lists(tree, items);
    group_where(tree, items)
}

fn group_functions(tree: &mut TokenTree, items: Vec<NodeId>) -> Vec<NodeId> {
    let mut grouped = Vec::with_capacity(items.len());
    let mut iter = items.into_iter().peekable();

    while let Some(id) = iter.next() {
        if tree.token_kind(id) == Some(TokenKind::Name) {
            if let Some(&next) = iter.peek() {
                if tree.group_kind(next) == Some(GroupKind::Parenthesis) {
                    iter.next();
                    grouped.push(tree.push_group(GroupKind::Function, vec![id, next]));
                    continue;
                }
            }
        }
        grouped.push(id);
    }

    grouped
}

/// What an identifier can start with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierBase {
    /// Names and function calls are identifiers on their own
    Name,
    /// Subqueries and literals only become identifiers when aliased
    Parenthesis,
    Literal,
}

impl IdentifierBase {
    fn of(tree: &TokenTree, id: NodeId) -> Option<Self> {
        match (tree.token_kind(id), tree.group_kind(id)) {
            (Some(TokenKind::Name), _) | (_, Some(GroupKind::Function)) => Some(Self::Name),
            (_, Some(GroupKind::Parenthesis)) => Some(Self::Parenthesis),
            (Some(TokenKind::Integer), _)
            | (Some(TokenKind::Float), _)
            | (Some(TokenKind::StringLiteral), _) => Some(Self::Literal),
            _ => None,
        }
    }
}

fn group_identifiers(tree: &mut TokenTree, items: Vec<NodeId>) -> Vec<NodeId> {
    let mut grouped = Vec::with_capacity(items.len());
    let mut pos = 0;

    while pos < items.len() {
        match identifier_end(tree, &items, pos) {
            Some(end) => {
                let children = items[pos..end].to_vec();
                grouped.push(tree.push_group(GroupKind::Identifier, children));
                pos = end;
            }
            None => {
                grouped.push(items[pos]);
                pos += 1;
            }
        }
    }

    grouped
}

fn identifier_end(tree: &TokenTree, items: &[NodeId], start: usize) -> Option<usize> {
    let base = IdentifierBase::of(tree, items[start])?;
    let mut end = start + 1;

    if base == IdentifierBase::Name {
        while end + 1 < items.len()
            && tree.is_punctuation(items[end], ".")
            && is_name_segment(tree, items[end + 1])
        {
            end += 2;
        }
    }

    match alias_end(tree, items, end, base) {
        Some(alias_end) => Some(alias_end),
        None if base == IdentifierBase::Name => Some(end),
        None => None,
    }
}

fn is_name_segment(tree: &TokenTree, id: NodeId) -> bool {
    matches!(
        tree.token_kind(id),
        Some(TokenKind::Name) | Some(TokenKind::Wildcard)
    ) || tree.group_kind(id) == Some(GroupKind::Function)
}

/// End of an alias clause starting at `end`, if there is one:
/// `x AS alias`, `x alias`, `(subquery)alias`, or the CTE form `x AS (subquery)`.
fn alias_end(
    tree: &TokenTree,
    items: &[NodeId],
    end: usize,
    base: IdentifierBase,
) -> Option<usize> {
    let pos = skip_whitespace(tree, items, end);
    let &candidate = items.get(pos)?;

    if tree.is_keyword_text(candidate, "AS") {
        let target = skip_whitespace(tree, items, pos + 1);
        let &aliased = items.get(target)?;
        let cte_body = base == IdentifierBase::Name
            && tree.group_kind(aliased) == Some(GroupKind::Parenthesis);
        if tree.token_kind(aliased) == Some(TokenKind::Name) || cte_body {
            return Some(target + 1);
        }
        return None;
    }

    let separated = pos > end || base == IdentifierBase::Parenthesis;
    if separated && tree.token_kind(candidate) == Some(TokenKind::Name) {
        return Some(pos + 1);
    }

    None
}

fn skip_whitespace(tree: &TokenTree, items: &[NodeId], mut pos: usize) -> usize {
    while pos < items.len() && tree.is_whitespace(items[pos]) {
        pos += 1;
    }
    pos
}

fn group_identifier_lists(tree: &mut TokenTree, items: Vec<NodeId>) -> Vec<NodeId> {
    let mut grouped = Vec::with_capacity(items.len());
    let mut pos = 0;

    while pos < items.len() {
        let end = if is_list_member(tree, items[pos]) {
            list_end(tree, &items, pos)
        } else {
            pos + 1
        };

        if end > pos + 1 {
            let children = items[pos..end].to_vec();
            grouped.push(tree.push_group(GroupKind::IdentifierList, children));
        } else {
            grouped.push(items[pos]);
        }
        pos = end;
    }

    grouped
}

/// Exclusive end of the list that starts with the member at `start`
fn list_end(tree: &TokenTree, items: &[NodeId], start: usize) -> usize {
    let mut end = start + 1;

    loop {
        let comma = skip_whitespace(tree, items, end);
        if !items
            .get(comma)
            .is_some_and(|&id| tree.is_punctuation(id, ","))
        {
            break;
        }
        let next = skip_whitespace(tree, items, comma + 1);
        match items.get(next) {
            Some(&id) if is_list_member(tree, id) => end = next + 1,
            _ => break,
        }
    }

    end
}

fn is_list_member(tree: &TokenTree, id: NodeId) -> bool {
    match tree.group_kind(id) {
        Some(GroupKind::Identifier) | Some(GroupKind::Function) | Some(GroupKind::Parenthesis) => {
            true
        }
        Some(_) => false,
        None => {
            matches!(
                tree.token_kind(id),
                Some(TokenKind::Name)
                    | Some(TokenKind::Integer)
                    | Some(TokenKind::Float)
                    | Some(TokenKind::StringLiteral)
                    | Some(TokenKind::Wildcard)
            ) || tree.is_keyword_text(id, "NULL")
        }
    }
}

/// Wrap each `WHERE ...` run in a Where group. The group ends before the
/// next clause keyword, set operation or `;`, leaving those at this level.
fn group_where(tree: &mut TokenTree, items: Vec<NodeId>) -> Vec<NodeId> {
    let mut grouped = Vec::with_capacity(items.len());
    let mut pos = 0;

    while pos < items.len() {
        if !tree.is_keyword_text(items[pos], "WHERE") {
            grouped.push(items[pos]);
            pos += 1;
            continue;
        }

        let end = items[pos + 1..]
            .iter()
            .position(|&id| closes_where(tree, id))
            .map_or(items.len(), |offset| pos + 1 + offset);
        let children = items[pos..end].to_vec();
        grouped.push(tree.push_group(GroupKind::Where, children));
        pos = end;
    }

    grouped
}

fn closes_where(tree: &TokenTree, id: NodeId) -> bool {
    tree.is_punctuation(id, ";")
        || (tree.is_keyword(id) && keywords::closes_where(tree.text(id)))
}
