//! Tests for statement splitting and token grouping

use super::super::grouping::parse_statements;
use super::super::lexer::lex;
use super::super::token_tree::{GroupKind, NodeId, StatementType, TokenKind, TokenTree};
use pretty_assertions::assert_eq;
use sqlparser::dialect::GenericDialect;

fn parse(sql: &str) -> (TokenTree, Vec<NodeId>) {
    let mut tree = TokenTree::new();
    let lexemes = lex(sql, &GenericDialect {}).unwrap();
    let statements = parse_statements(&mut tree, lexemes);
    (tree, statements)
}

/// First descendant (depth first) of `kind`
fn find_group(tree: &TokenTree, id: NodeId, kind: GroupKind) -> Option<NodeId> {
    for &child in tree.children(id) {
        if tree.group_kind(child) == Some(kind) {
            return Some(child);
        }
        if let Some(found) = find_group(tree, child, kind) {
            return Some(found);
        }
    }
    None
}

#[test]
fn test_statements_split_on_semicolon() {
    let (tree, statements) = parse("SELECT 1; SELECT 2");
    assert_eq!(statements.len(), 2);
    assert_eq!(tree.render(statements[0]), "SELECT 1;");
    assert_eq!(tree.render(statements[1]), " SELECT 2");
}

#[test]
fn test_statement_text_round_trips() {
    let sql = "SELECT a.x AS y, count(*) FROM (SELECT * FROM t) sub -- trailing\n";
    let (tree, statements) = parse(sql);
    assert_eq!(statements.len(), 1);
    assert_eq!(tree.text(statements[0]), sql);
}

#[test]
fn test_statement_types() {
    let sql = "SELECT 1; INSERT INTO t VALUES (1); WITH c AS (SELECT 1) DELETE FROM t";
    let (tree, statements) = parse(sql);
    let types: Vec<GroupKind> = statements
        .iter()
        .filter_map(|&statement| tree.group_kind(statement))
        .collect();
    assert_eq!(
        types,
        vec![
            GroupKind::Statement(StatementType::Select),
            GroupKind::Statement(StatementType::Insert),
            GroupKind::Statement(StatementType::Delete),
        ]
    );
}

#[test]
fn test_qualified_identifier_with_alias() {
    let (tree, statements) = parse("SELECT * FROM sales.orders AS o");
    let identifier = find_group(&tree, statements[0], GroupKind::Identifier).unwrap();

    assert_eq!(tree.text(identifier), "sales.orders AS o");
    assert_eq!(tree.alias(identifier).as_deref(), Some("o"));
    assert_eq!(tree.real_name(identifier).as_deref(), Some("orders"));
}

#[test]
fn test_implicit_alias() {
    let (tree, statements) = parse("SELECT * FROM orders o");
    let identifier = find_group(&tree, statements[0], GroupKind::Identifier).unwrap();

    assert_eq!(tree.alias(identifier).as_deref(), Some("o"));
    assert_eq!(tree.real_name(identifier).as_deref(), Some("orders"));
}

#[test]
fn test_unaliased_identifier_has_no_alias() {
    let (tree, statements) = parse("SELECT * FROM orders WHERE id = 1");
    let identifier = find_group(&tree, statements[0], GroupKind::Identifier).unwrap();

    assert_eq!(tree.text(identifier), "orders");
    assert_eq!(tree.alias(identifier), None);
}

#[test]
fn test_subquery_becomes_aliased_identifier() {
    let (tree, statements) = parse("SELECT * FROM (SELECT * FROM t) AS sub");
    let identifier = find_group(&tree, statements[0], GroupKind::Identifier).unwrap();

    let first = tree.children(identifier)[0];
    assert_eq!(tree.group_kind(first), Some(GroupKind::Parenthesis));
    assert_eq!(tree.alias(identifier).as_deref(), Some("sub"));
}

#[test]
fn test_cte_definition_is_one_identifier() {
    let (tree, statements) = parse("WITH recent AS (SELECT 1) SELECT * FROM recent");
    let identifier = find_group(&tree, statements[0], GroupKind::Identifier).unwrap();

    assert_eq!(tree.text(identifier), "recent AS (SELECT 1)");
    assert_eq!(tree.alias(identifier), None);
    assert_eq!(tree.token_kind(tree.children(identifier)[0]), Some(TokenKind::Name));
}

#[test]
fn test_function_call_grouping() {
    let (tree, statements) = parse("SELECT count(id) FROM t");
    let function = find_group(&tree, statements[0], GroupKind::Function).unwrap();

    assert_eq!(tree.text(function), "count(id)");
    let parenthesis = tree.children(function)[1];
    assert_eq!(tree.group_kind(parenthesis), Some(GroupKind::Parenthesis));
}

#[test]
fn test_identifier_list_members() {
    let (tree, statements) = parse("SELECT a, b.c, 1 FROM t");
    let list = find_group(&tree, statements[0], GroupKind::IdentifierList).unwrap();

    let members: Vec<&str> = tree
        .members(list)
        .into_iter()
        .map(|member| tree.text(member))
        .collect();
    assert_eq!(members, vec!["a", "b.c", "1"]);
}

#[test]
fn test_unbalanced_parenthesis_is_left_flat() {
    let (tree, statements) = parse("SELECT (1");
    assert_eq!(find_group(&tree, statements[0], GroupKind::Parenthesis), None);
    assert_eq!(tree.text(statements[0]), "SELECT (1");
}

#[test]
fn test_nested_parentheses() {
    let (tree, statements) = parse("SELECT ((1))");
    let outer = find_group(&tree, statements[0], GroupKind::Parenthesis).unwrap();
    let inner = find_group(&tree, outer, GroupKind::Parenthesis).unwrap();
    assert_eq!(tree.text(outer), "((1))");
    assert_eq!(tree.text(inner), "(1)");
}

#[test]
fn test_where_clause_is_grouped() {
    let sql = "SELECT * FROM t WHERE a = 1 AND b IN (1, 2) ORDER BY a LIMIT 3";
    let (tree, statements) = parse(sql);
    let where_clause = find_group(&tree, statements[0], GroupKind::Where).unwrap();

    assert_eq!(tree.text(where_clause), "WHERE a = 1 AND b IN (1, 2) ");
    assert!(tree.children(statements[0]).contains(&where_clause));
    let limit = tree
        .children(statements[0])
        .iter()
        .any(|&id| tree.is_keyword_text(id, "LIMIT"));
    assert!(limit);
}

#[test]
fn test_where_clause_stops_at_set_operation() {
    let (tree, statements) = parse("SELECT * FROM a WHERE x = 1 UNION  ALL SELECT * FROM b;");
    let where_clause = find_group(&tree, statements[0], GroupKind::Where).unwrap();

    assert_eq!(tree.text(where_clause), "WHERE x = 1 ");
    let last = *tree.children(statements[0]).last().unwrap();
    assert!(tree.is_punctuation(last, ";"));
}
