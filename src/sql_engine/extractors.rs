//! Table, limit and statement-type extraction from SQL text

use log::debug;
use sqlparser::dialect::{dialect_from_str, Dialect};
use std::collections::HashSet;

use super::error::{ExtractError, Result};
use super::grouping;
use super::keywords::{self, ON_KEYWORD};
use super::lexer;
use super::token_tree::{GroupKind, NodeId, NodeKind, StatementType, TokenKind, TokenTree};

/// How qualified table references are turned into names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    /// `schema.table`; a third segment is ignored
    #[default]
    Base,
    /// `catalog.schema.table` when three segments are present
    CatalogAware,
}

/// Options for building an [`Extractor`]
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub flavor: Flavor,
    /// sqlparser dialect name, e.g. `generic`, `duckdb`, `mysql`, `hive`
    pub dialect: String,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            flavor: Flavor::Base,
            dialect: "generic".to_string(),
        }
    }
}

impl ExtractorOptions {
    pub fn catalog_aware() -> Self {
        Self {
            flavor: Flavor::CatalogAware,
            ..Self::default()
        }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }
}

/// Extracts referenced tables, the LIMIT clause and the statement type from
/// one SQL input (possibly several `;`-separated statements).
///
/// All extraction happens in the constructor. The only later mutation is
/// [`Extractor::get_query_with_new_limit`], which rewrites tokens in place.
#[derive(Debug, Clone)]
pub struct Extractor {
    sql: String,
    flavor: Flavor,
    tree: TokenTree,
    statements: Vec<NodeId>,
    table_names: HashSet<String>,
    alias_names: HashSet<String>,
    limit: Option<u64>,
}

impl Extractor {
    /// Build an extractor with the base flavor and the generic dialect
    pub fn new(sql: &str) -> Result<Self> {
        Self::with_options(sql, &ExtractorOptions::default())
    }

    /// Build an extractor that keeps three-segment `catalog.schema.table` names
    pub fn catalog_aware(sql: &str) -> Result<Self> {
        Self::with_options(sql, &ExtractorOptions::catalog_aware())
    }

    pub fn with_options(sql_statement: &str, options: &ExtractorOptions) -> Result<Self> {
        let dialect = resolve_dialect(&options.dialect)?;
        let sql = lexer::normalize_keywords(sql_statement, dialect.as_ref())?;

        let mut tree = TokenTree::new();
        let lexemes = lexer::lex(strip_sql(&sql), dialect.as_ref())?;
        let statements = grouping::parse_statements(&mut tree, lexemes);

        let mut walker = TableWalker::new(&tree, options.flavor);
        let mut limit = None;
        for &statement in &statements {
            walker.extract_from_token(statement)?;
            // Each statement overwrites the previous one's limit
            limit = extract_limit_from_statement(&tree, statement)?;
        }
        let TableWalker {
            table_names,
            alias_names,
            ..
        } = walker;

        let table_names: HashSet<String> = table_names.difference(&alias_names).cloned().collect();

        debug!(
            "Extracted {} table(s), {} alias(es), limit {:?} from {} statement(s)",
            table_names.len(),
            alias_names.len(),
            limit,
            statements.len()
        );

        Ok(Self {
            sql,
            flavor: options.flavor,
            tree,
            statements,
            table_names,
            alias_names,
            limit,
        })
    }

    /// Unique table names referenced by the input, aliases excluded
    pub fn tables(&self) -> &HashSet<String> {
        &self.table_names
    }

    /// Names recognised as aliases of subqueries or table functions
    pub fn aliases(&self) -> &HashSet<String> {
        &self.alias_names
    }

    /// LIMIT of the last statement in the input
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// The keyword-normalized SQL text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// [`Extractor::sql`] without leading/trailing whitespace and semicolons
    pub fn stripped(&self) -> &str {
        strip_sql(&self.sql)
    }

    /// Type of the first statement
    pub fn statement_type(&self) -> StatementType {
        match self
            .statements
            .first()
            .and_then(|&statement| self.tree.group_kind(statement))
        {
            Some(GroupKind::Statement(statement_type)) => statement_type,
            _ => StatementType::Unknown,
        }
    }

    pub fn is_select(&self) -> bool {
        self.statement_type() == StatementType::Select
    }

    pub fn is_explain(&self) -> bool {
        self.stripped().to_uppercase().starts_with("EXPLAIN")
    }

    pub fn is_readonly(&self) -> bool {
        self.is_select() || self.is_explain()
    }

    /// Text of every non-empty statement, stripped of whitespace and semicolons
    pub fn get_statements(&self) -> Vec<String> {
        self.statements
            .iter()
            .map(|&statement| self.tree.render(statement))
            .filter_map(|sql| {
                let stripped = strip_sql(&sql);
                (!stripped.is_empty()).then(|| stripped.to_string())
            })
            .collect()
    }

    /// Return the first statement with its LIMIT replaced by `new_limit`, or
    /// the whole input with a LIMIT appended when there is none.
    ///
    /// Tokens are rewritten in place, so repeated calls build on each other.
    pub fn get_query_with_new_limit(&mut self, new_limit: u64) -> Result<String> {
        if self.limit.is_none() {
            return Ok(format!("{} LIMIT {}", self.sql, new_limit));
        }

        let statement = *self
            .statements
            .first()
            .ok_or(ExtractError::MissingLimitClause)?;
        let position =
            limit_position(&self.tree, statement).ok_or(ExtractError::MissingLimitClause)?;
        let value = limit_value_token(&self.tree, statement, position)?;

        match self.tree.kind(value) {
            NodeKind::Token(TokenKind::Integer) => {
                self.tree.set_text(value, new_limit.to_string());
            }
            NodeKind::Group(GroupKind::IdentifierList) => {
                let offset = self
                    .tree
                    .members(value)
                    .first()
                    .map(|&member| self.tree.text(member).to_string())
                    .unwrap_or_default();
                self.tree.set_text(value, format!("{}, {}", offset, new_limit));
            }
            _ => {}
        }

        Ok(self.tree.render(statement))
    }

    /// Wrap the query in `CREATE TABLE <name> AS`, optionally dropping the
    /// table first
    pub fn as_create_table(&self, table_name: &str, overwrite: bool) -> String {
        let mut exec_sql = String::new();
        if overwrite {
            exec_sql.push_str(&format!("DROP TABLE IF EXISTS {};\n", table_name));
        }
        exec_sql.push_str(&format!("CREATE TABLE {} AS \n{}", table_name, self.stripped()));
        exec_sql
    }

    /// Table written by the first statement (`INSERT INTO t`, `CREATE TABLE t`,
    /// `UPDATE t`, `DELETE FROM t`, `MERGE INTO t`)
    pub fn target_table(&self) -> Option<String> {
        let target_keywords: &[&str] = match self.statement_type() {
            StatementType::Insert | StatementType::Replace | StatementType::Merge => {
                &["INTO", "OVERWRITE"]
            }
            StatementType::Create => &["TABLE", "VIEW"],
            StatementType::Update => &["UPDATE"],
            StatementType::Delete => &["FROM"],
            _ => return None,
        };

        let tree = &self.tree;
        let children = tree.children(*self.statements.first()?);
        let position = children.iter().position(|&item| {
            target_keywords
                .iter()
                .any(|keyword| tree.is_keyword_text(item, keyword))
        })?;

        let candidate = children[position + 1..].iter().copied().find(|&item| {
            let modifier = ["TABLE", "IF", "NOT", "EXISTS"]
                .iter()
                .any(|keyword| tree.is_keyword_text(item, keyword));
            !tree.is_whitespace(item) && !modifier
        })?;

        if tree.group_kind(candidate) != Some(GroupKind::Identifier) {
            return None;
        }
        target_name(tree, candidate, self.flavor)
    }
}

/// Recursive table-reference walk, collecting table and alias names
struct TableWalker<'a> {
    tree: &'a TokenTree,
    flavor: Flavor,
    table_names: HashSet<String>,
    alias_names: HashSet<String>,
}

impl<'a> TableWalker<'a> {
    fn new(tree: &'a TokenTree, flavor: Flavor) -> Self {
        Self {
            tree,
            flavor,
            table_names: HashSet::new(),
            alias_names: HashSet::new(),
        }
    }

    fn extract_from_token(&mut self, token: NodeId) -> Result<()> {
        let tree = self.tree;
        let mut table_name_preceding_token = false;

        for &item in tree.children(token) {
            match tree.kind(item) {
                NodeKind::Group(GroupKind::Identifier) => {
                    if table_name_preceding_token {
                        self.process_identifier(item)?;
                    }
                }
                NodeKind::Group(GroupKind::IdentifierList) => {
                    if table_name_preceding_token {
                        for member in tree.members(item) {
                            if tree.group_kind(member) == Some(GroupKind::Identifier) {
                                self.process_identifier(member)?;
                            }
                        }
                    }
                }
                // Parentheses, functions, where clauses and statements may hold a nested FROM
                NodeKind::Group(_) => self.extract_from_token(item)?,
                NodeKind::Token(TokenKind::Keyword) => {
                    let value = tree.text(item).to_uppercase();
                    if keywords::precedes_table_name(&value) {
                        table_name_preceding_token = true;
                        continue;
                    }
                    if !table_name_preceding_token {
                        continue;
                    }
                    if keywords::is_result_operation(&value) || value == ON_KEYWORD {
                        table_name_preceding_token = false;
                        continue;
                    }
                    // FROM clause is over
                    break;
                }
                NodeKind::Token(TokenKind::Punctuation)
                    if table_name_preceding_token && tree.text(item) == "," =>
                {
                    break;
                }
                NodeKind::Token(_) => {}
            }
        }

        Ok(())
    }

    fn process_identifier(&mut self, identifier: NodeId) -> Result<()> {
        let tree = self.tree;

        if !tree.text(identifier).contains('(') {
            if let Some(name) = full_name(tree, identifier, self.flavor)? {
                debug!("Found table reference: {}", name);
                self.table_names.insert(name);
            }
            return Ok(());
        }

        if let Some(alias) = tree.alias(identifier) {
            debug!("Found alias: {}", alias);
            self.alias_names.insert(alias);
        }
        // Aliases the grouping did not attach, e.g. `name AS (subquery)`
        if let Some(&first) = tree.children(identifier).first() {
            if tree.token_kind(first) == Some(TokenKind::Name) {
                self.alias_names.insert(tree.text(first).to_string());
            }
        }

        self.extract_from_token(identifier)
    }
}

/// Qualified name of a table reference.
///
/// `a.b` resolves to `"a.b"`; with [`Flavor::CatalogAware`], `a.b.c` resolves
/// to `"a.b.c"`. An unqualified reference resolves to its real name, ignoring
/// any alias. Returns `Ok(None)` for references without a name (literals).
pub fn full_name(tree: &TokenTree, identifier: NodeId, flavor: Flavor) -> Result<Option<String>> {
    let tokens = tree.children(identifier);
    let qualified = tokens.len() > 1 && tree.text(tokens[1]) == ".";
    if !qualified {
        return Ok(tree.real_name(identifier));
    }

    let segment = |index: usize| {
        tokens
            .get(index)
            .map(|&token| tree.text(token))
            .ok_or_else(|| ExtractError::MalformedIdentifier {
                text: tree.text(identifier).to_string(),
                index,
            })
    };

    let schema_table = format!("{}.{}", segment(0)?, segment(2)?);
    if flavor == Flavor::Base || tokens.len() == 3 {
        return Ok(Some(schema_table));
    }
    if tree.is_whitespace(tokens[3]) {
        return Ok(Some(schema_table));
    }

    Ok(Some(format!("{}.{}", schema_table, segment(4)?)))
}

/// Name of a write target; a column list `t(a, b)` resolves to `t`
fn target_name(tree: &TokenTree, identifier: NodeId, flavor: Flavor) -> Option<String> {
    if !tree.text(identifier).contains('(') {
        return full_name(tree, identifier, flavor).ok().flatten();
    }

    let mut name = String::new();
    for &child in tree.children(identifier) {
        if tree.is_whitespace(child) {
            break;
        }
        match tree.group_kind(child) {
            Some(GroupKind::Function) => {
                if let Some(&function_name) = tree.children(child).first() {
                    name.push_str(tree.text(function_name));
                }
                break;
            }
            Some(_) => break,
            None => name.push_str(tree.text(child)),
        }
    }

    (!name.is_empty()).then_some(name)
}

fn limit_position(tree: &TokenTree, statement: NodeId) -> Option<usize> {
    tree.children(statement)
        .iter()
        .position(|&item| tree.is_keyword(item) && tree.text(item).to_lowercase() == "limit")
}

/// The token two positions after the LIMIT keyword
fn limit_value_token(tree: &TokenTree, statement: NodeId, position: usize) -> Result<NodeId> {
    tree.children(statement)
        .get(position + 2)
        .copied()
        .ok_or(ExtractError::MissingLimitValue { position })
}

/// LIMIT value among a statement's direct children, if there is one
pub fn extract_limit_from_statement(tree: &TokenTree, statement: NodeId) -> Result<Option<u64>> {
    let Some(position) = limit_position(tree, statement) else {
        return Ok(None);
    };
    let token = limit_value_token(tree, statement, position)?;

    match tree.kind(token) {
        NodeKind::Token(TokenKind::Integer) => parse_limit(tree.text(token)).map(Some),
        // `LIMIT offset, count`
        NodeKind::Group(GroupKind::IdentifierList) => {
            let count = tree
                .members(token)
                .get(1)
                .copied()
                .ok_or(ExtractError::MissingLimitValue { position })?;
            parse_limit(tree.text(count)).map(Some)
        }
        _ => Ok(None),
    }
}

fn parse_limit(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ExtractError::InvalidLimitValue {
            value: value.to_string(),
        })
}

fn resolve_dialect(name: &str) -> Result<Box<dyn Dialect>> {
    dialect_from_str(name).ok_or_else(|| ExtractError::UnknownDialect {
        name: name.to_string(),
    })
}

/// Strip leading/trailing spaces, tabs, newlines and semicolons
pub fn strip_sql(sql: &str) -> &str {
    sql.trim_matches(|ch| matches!(ch, ' ' | '\t' | '\n' | ';'))
}
