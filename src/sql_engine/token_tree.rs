//! Arena-backed token tree produced by the lexer and the grouping pass
//!
//! Every token and group lives in one `Vec<Node>` owned by a [`TokenTree`] and
//! is addressed by a [`NodeId`]. A group's text is the concatenation of its
//! children's text at the time the group is built; overwriting a node's text
//! later (LIMIT rewrite) does not propagate to the groups that contain it.

use serde::Serialize;
use std::fmt;

/// Index of a node inside its [`TokenTree`]
pub type NodeId = usize;

/// Classification of a leaf token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Name,
    Integer,
    Float,
    StringLiteral,
    Punctuation,
    Operator,
    Wildcard,
    Whitespace,
    Comment,
}

/// Classification of a composite group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Statement(StatementType),
    Parenthesis,
    Function,
    Identifier,
    IdentifierList,
    Where,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Token(TokenKind),
    Group(GroupKind),
}

/// Detected type of a statement, taken from its leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Replace,
    Create,
    Drop,
    Alter,
    Truncate,
    Unknown,
}

impl StatementType {
    /// Map a leading keyword to a statement type
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let statement_type = match keyword.to_uppercase().as_str() {
            "SELECT" => Self::Select,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "MERGE" => Self::Merge,
            "REPLACE" => Self::Replace,
            "CREATE" => Self::Create,
            "DROP" => Self::Drop,
            "ALTER" => Self::Alter,
            "TRUNCATE" => Self::Truncate,
            _ => return None,
        };
        Some(statement_type)
    }

    /// True for the data-manipulation types a CTE can lead into
    pub fn is_dml(self) -> bool {
        matches!(
            self,
            Self::Select | Self::Insert | Self::Update | Self::Delete | Self::Merge | Self::Replace
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Merge => "MERGE",
            Self::Replace => "REPLACE",
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Alter => "ALTER",
            Self::Truncate => "TRUNCATE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    text: String,
    children: Vec<NodeId>,
}

/// Owner of every node of every statement parsed from one input
#[derive(Debug, Clone, Default)]
pub struct TokenTree {
    nodes: Vec<Node>,
}

impl TokenTree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a leaf token
    pub fn push_token(&mut self, kind: TokenKind, text: impl Into<String>) -> NodeId {
        self.nodes.push(Node {
            kind: NodeKind::Token(kind),
            text: text.into(),
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Add a group over existing nodes; its text is computed now
    pub fn push_group(&mut self, kind: GroupKind, children: Vec<NodeId>) -> NodeId {
        let text = children.iter().map(|&child| self.text(child)).collect();
        self.nodes.push(Node {
            kind: NodeKind::Group(kind),
            text,
            children,
        });
        self.nodes.len() - 1
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn token_kind(&self, id: NodeId) -> Option<TokenKind> {
        match self.kind(id) {
            NodeKind::Token(kind) => Some(kind),
            NodeKind::Group(_) => None,
        }
    }

    pub fn group_kind(&self, id: NodeId) -> Option<GroupKind> {
        match self.kind(id) {
            NodeKind::Group(kind) => Some(kind),
            NodeKind::Token(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id].text
    }

    /// Overwrite the text of a node in place
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id].text = text.into();
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn is_keyword(&self, id: NodeId) -> bool {
        self.token_kind(id) == Some(TokenKind::Keyword)
    }

    /// Keyword comparison, ignoring case
    pub fn is_keyword_text(&self, id: NodeId, keyword: &str) -> bool {
        self.is_keyword(id) && self.text(id).eq_ignore_ascii_case(keyword)
    }

    /// Whitespace and comments
    pub fn is_whitespace(&self, id: NodeId) -> bool {
        matches!(
            self.token_kind(id),
            Some(TokenKind::Whitespace) | Some(TokenKind::Comment)
        )
    }

    pub fn is_punctuation(&self, id: NodeId, value: &str) -> bool {
        self.token_kind(id) == Some(TokenKind::Punctuation) && self.text(id) == value
    }

    /// Concatenate the current text of a group's direct children.
    /// For a leaf this is its own text.
    pub fn render(&self, id: NodeId) -> String {
        let children = self.children(id);
        if children.is_empty() {
            return self.text(id).to_string();
        }
        children.iter().map(|&child| self.text(child)).collect()
    }

    /// Children that are neither whitespace, comments nor separating commas
    pub fn members(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| !self.is_whitespace(child) && !self.is_punctuation(child, ","))
            .collect()
    }

    /// Alias of an Identifier group: the name after `AS`, or a trailing name
    /// separated from the reference by whitespace or a closing parenthesis.
    pub fn alias(&self, id: NodeId) -> Option<String> {
        let children = self.children(id);

        if let Some(as_pos) = children
            .iter()
            .position(|&child| self.is_keyword_text(child, "AS"))
        {
            return children[as_pos + 1..]
                .iter()
                .copied()
                .find(|&child| !self.is_whitespace(child))
                .filter(|&child| self.token_kind(child) == Some(TokenKind::Name))
                .map(|child| unquote(self.text(child)).to_string());
        }

        let (&last, rest) = children.split_last()?;
        let &previous = rest.last()?;
        if self.token_kind(last) != Some(TokenKind::Name) {
            return None;
        }
        if self.is_whitespace(previous) || self.group_kind(previous) == Some(GroupKind::Parenthesis)
        {
            return Some(unquote(self.text(last)).to_string());
        }
        None
    }

    /// Underlying object name of an Identifier: the last name segment before
    /// any alias, with quotes removed.
    pub fn real_name(&self, id: NodeId) -> Option<String> {
        let mut name = None;
        for &child in self.children(id) {
            if self.is_whitespace(child) || self.is_keyword_text(child, "AS") {
                break;
            }
            match self.kind(child) {
                NodeKind::Token(TokenKind::Name) => name = Some(unquote(self.text(child))),
                NodeKind::Group(GroupKind::Function) => {
                    name = self
                        .children(child)
                        .first()
                        .map(|&function_name| unquote(self.text(function_name)));
                }
                NodeKind::Group(GroupKind::Parenthesis) => break,
                _ => {}
            }
        }
        name.map(str::to_string)
    }
}

/// Strip one pair of identifier quotes (`"x"`, `` `x` ``, `[x]`)
pub fn unquote(text: &str) -> &str {
    let mut chars = text.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return text;
    };
    let matched = matches!((first, last), ('"', '"') | ('`', '`') | ('[', ']'));
    if matched {
        &text[first.len_utf8()..text.len() - last.len_utf8()]
    } else {
        text
    }
}
