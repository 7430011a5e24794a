//! Lexing on top of the sqlparser tokenizer
//!
//! sqlparser produces a flat token stream with one token per whitespace
//! character. This module classifies those tokens, merges whitespace runs
//! and multi-word keywords (`LEFT OUTER JOIN`, `GROUP BY`) and exposes the
//! keyword-case normalization applied before extraction.

use sqlparser::dialect::Dialect;
use sqlparser::tokenizer::{Location, Span, Token, Tokenizer, Whitespace};

use super::error::Result;
use super::keywords::{self, COMPOUND_KEYWORDS};
use super::token_tree::TokenKind;

/// A classified leaf token with its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub text: String,
}

impl Lexeme {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }
}

/// Tokenize SQL into classified lexemes.
///
/// Concatenating the text of the returned lexemes reproduces the input.
/// Lexeme text is sliced from `sql` by token span, so `\r\n` survives.
pub fn lex(sql: &str, dialect: &dyn Dialect) -> Result<Vec<Lexeme>> {
    let tokens = Tokenizer::new(dialect, sql)
        .with_unescape(false)
        .tokenize_with_location()?;
    let source = SourceText::new(sql);

    let mut lexemes: Vec<Lexeme> = tokens
        .iter()
        .filter(|token| !matches!(token.token, Token::EOF))
        .map(|token| {
            let text = source
                .slice(token.span)
                .map_or_else(|| token.token.to_string(), str::to_string);
            classify(&token.token, text)
        })
        .collect();
    demote_qualified_keywords(&mut lexemes);

    Ok(merge_compound_keywords(merge_whitespace(lexemes)))
}

/// Uppercase every keyword, leaving names, literals and layout untouched
pub fn normalize_keywords(sql: &str, dialect: &dyn Dialect) -> Result<String> {
    let lexemes = lex(sql, dialect)?;

    Ok(lexemes
        .iter()
        .map(|lexeme| match lexeme.kind {
            TokenKind::Keyword => lexeme.text.to_uppercase(),
            _ => lexeme.text.clone(),
        })
        .collect())
}

/// Byte offsets of line starts, for mapping tokenizer locations back to text
struct SourceText<'a> {
    sql: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceText<'a> {
    fn new(sql: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(sql.match_indices('\n').map(|(pos, _)| pos + 1))
            .collect();
        Self { sql, line_starts }
    }

    /// Locations count lines from 1 and columns in chars from 1
    fn offset(&self, location: Location) -> Option<usize> {
        let line = usize::try_from(location.line).ok()?.checked_sub(1)?;
        let column = usize::try_from(location.column).ok()?.checked_sub(1)?;
        let start = *self.line_starts.get(line)?;
        self.sql[start..]
            .char_indices()
            .map(|(pos, _)| start + pos)
            .chain(std::iter::once(self.sql.len()))
            .nth(column)
    }

    fn slice(&self, span: Span) -> Option<&'a str> {
        let start = self.offset(span.start)?;
        let end = self.offset(span.end)?;
        self.sql.get(start..end)
    }
}

fn classify(token: &Token, text: String) -> Lexeme {
    let kind = match token {
        Token::Word(word) => {
            if word.quote_style.is_none() && keywords::is_keyword(&word.value) {
                TokenKind::Keyword
            } else {
                TokenKind::Name
            }
        }
        Token::Number(value, _) => {
            if value.chars().all(|ch| ch.is_ascii_digit()) {
                TokenKind::Integer
            } else {
                TokenKind::Float
            }
        }
        Token::SingleQuotedString(_)
        | Token::DoubleQuotedString(_)
        | Token::NationalStringLiteral(_)
        | Token::EscapedStringLiteral(_)
        | Token::HexStringLiteral(_)
        | Token::DollarQuotedString(_) => TokenKind::StringLiteral,
        Token::Comma
        | Token::Period
        | Token::SemiColon
        | Token::LParen
        | Token::RParen
        | Token::LBracket
        | Token::RBracket
        | Token::LBrace
        | Token::RBrace
        | Token::Colon
        | Token::DoubleColon => TokenKind::Punctuation,
        Token::Mul => TokenKind::Wildcard,
        Token::Whitespace(Whitespace::SingleLineComment { .. })
        | Token::Whitespace(Whitespace::MultiLineComment(_)) => TokenKind::Comment,
        Token::Whitespace(_) => TokenKind::Whitespace,
        _ => TokenKind::Operator,
    };
    Lexeme::new(kind, text)
}

/// A word right after `.` is always a name segment (`t.desc`, `s.order`)
fn demote_qualified_keywords(lexemes: &mut [Lexeme]) {
    for pos in 1..lexemes.len() {
        let previous = &lexemes[pos - 1];
        let after_dot = previous.kind == TokenKind::Punctuation && previous.text == ".";
        if after_dot && lexemes[pos].kind == TokenKind::Keyword {
            lexemes[pos].kind = TokenKind::Name;
        }
    }
}

fn merge_whitespace(lexemes: Vec<Lexeme>) -> Vec<Lexeme> {
    let mut merged: Vec<Lexeme> = Vec::with_capacity(lexemes.len());

    for lexeme in lexemes {
        match merged.last_mut() {
            Some(previous)
                if previous.kind == TokenKind::Whitespace
                    && lexeme.kind == TokenKind::Whitespace =>
            {
                previous.text.push_str(&lexeme.text);
            }
            _ => merged.push(lexeme),
        }
    }

    merged
}

fn merge_compound_keywords(lexemes: Vec<Lexeme>) -> Vec<Lexeme> {
    let mut merged = Vec::with_capacity(lexemes.len());
    let mut pos = 0;

    while pos < lexemes.len() {
        match match_compound(&lexemes, pos) {
            Some(end) => {
                let text: String = lexemes[pos..end].iter().map(|l| l.text.as_str()).collect();
                merged.push(Lexeme::new(TokenKind::Keyword, text));
                pos = end;
            }
            None => {
                merged.push(lexemes[pos].clone());
                pos += 1;
            }
        }
    }

    merged
}

/// End position (exclusive) of a compound keyword starting at `start`.
/// Words must be separated by exactly one whitespace lexeme.
fn match_compound(lexemes: &[Lexeme], start: usize) -> Option<usize> {
    COMPOUND_KEYWORDS.iter().find_map(|words| {
        let mut pos = start;
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                if lexemes.get(pos)?.kind != TokenKind::Whitespace {
                    return None;
                }
                pos += 1;
            }
            if !lexemes.get(pos)?.is_keyword(word) {
                return None;
            }
            pos += 1;
        }
        Some(pos)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::GenericDialect;

    #[test]
    fn test_lex_round_trips_source_text() {
        let sql = "select a.x, 'it''s' from  t\n-- note\nwhere y = 1.5";
        let lexemes = lex(sql, &GenericDialect {}).unwrap();
        let text: String = lexemes.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(text, sql);
    }

    #[test]
    fn test_lex_keeps_crlf_line_endings() {
        let sql = "SELECT *\r\nFROM t\r\n";
        let lexemes = lex(sql, &GenericDialect {}).unwrap();
        assert_eq!(lexemes[3], Lexeme::new(TokenKind::Whitespace, "\r\n"));
        let text: String = lexemes.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(text, sql);
    }

    #[test]
    fn test_whitespace_runs_are_merged() {
        let lexemes = lex("SELECT  \n 1", &GenericDialect {}).unwrap();
        assert_eq!(lexemes.len(), 3);
        assert_eq!(lexemes[1], Lexeme::new(TokenKind::Whitespace, "  \n "));
        assert_eq!(lexemes[2].kind, TokenKind::Integer);
    }

    #[test]
    fn test_compound_keywords_keep_inner_whitespace() {
        let lexemes = lex("a left  outer join b", &GenericDialect {}).unwrap();
        let keyword = lexemes
            .iter()
            .find(|l| l.kind == TokenKind::Keyword)
            .unwrap();
        assert_eq!(keyword.text, "left  outer join");
    }

    #[test]
    fn test_keyword_after_dot_is_a_name() {
        let lexemes = lex("t.desc", &GenericDialect {}).unwrap();
        assert_eq!(lexemes[2], Lexeme::new(TokenKind::Name, "desc"));
    }

    #[test]
    fn test_quoted_keyword_is_a_name() {
        let lexemes = lex("\"select\"", &GenericDialect {}).unwrap();
        assert_eq!(lexemes[0].kind, TokenKind::Name);
    }

    #[test]
    fn test_normalize_keywords() {
        let sql = "select date, name from t left join u on t.id = u.id limit 3";
        let normalized = normalize_keywords(sql, &GenericDialect {}).unwrap();
        assert_eq!(
            normalized,
            "SELECT date, name FROM t LEFT JOIN u ON t.id = u.id LIMIT 3"
        );
    }
}
