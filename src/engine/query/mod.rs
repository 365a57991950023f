mod lexer;
mod parser;

use std::fmt;

use thiserror::Error;

/// Which filter input the query text came from. Both dialects share one
/// grammar and identical semantics; the dialect only decides the vocabulary
/// used when reporting errors back to the matching input field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// Link/attribute filter.
    Links,
    /// Node/group filter.
    Nodes,
}

impl Dialect {
    fn noun(self) -> &'static str {
        match self {
            Self::Links => "attribute",
            Self::Nodes => "group",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{dialect} filter: unexpected {found}, expected {expected}")]
    UnexpectedToken {
        dialect: Dialect,
        found: String,
        expected: &'static str,
    },
    #[error("{dialect} filter: incomplete statement")]
    Incomplete { dialect: Dialect },
    #[error("{dialect} filter: unterminated quoted string")]
    UnterminatedString { dialect: Dialect },
    #[error("{dialect} filter: {found} is not a valid count")]
    BadNumber { dialect: Dialect, found: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
    Le,
    Ge,
    Gt,
}

impl CmpOp {
    fn holds(self, count: usize, bound: usize) -> bool {
        match self {
            Self::Eq => count == bound,
            Self::Lt => count < bound,
            Self::Le => count <= bound,
            Self::Ge => count >= bound,
            Self::Gt => count > bound,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Gt => ">",
        })
    }
}

/// One disjunct of a term. Tokens are kept case-preserved; matching is
/// case-insensitive substring containment.
#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    Token(String),
    Set(Vec<String>),
    NotToken(String),
    NotSet(Vec<String>),
    Count(CmpOp, usize),
}

impl Atom {
    fn matches(&self, values: &[String]) -> bool {
        match self {
            Self::Token(token) => contains_token(values, token),
            Self::Set(tokens) => tokens.iter().all(|token| contains_token(values, token)),
            Self::NotToken(token) => !contains_token(values, token),
            Self::NotSet(tokens) => !tokens.iter().any(|token| contains_token(values, token)),
            Self::Count(op, bound) => op.holds(values.len(), *bound),
        }
    }
}

fn contains_token(values: &[String], token: &str) -> bool {
    let token = token.to_lowercase();
    values
        .iter()
        .any(|value| value.to_lowercase().contains(&token))
}

/// Disjunction of atoms: satisfied when any atom matches.
#[derive(Clone, Debug, PartialEq)]
pub struct Term(pub Vec<Atom>);

/// Conjunction of terms. An empty expression is the always-true filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterExpr {
    terms: Vec<Term>,
}

impl FilterExpr {
    pub fn always_true() -> Self {
        Self::default()
    }

    pub fn is_always_true(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, values: &[String]) -> bool {
        self.terms
            .iter()
            .all(|term| term.0.iter().any(|atom| atom.matches(values)))
    }

    pub(crate) fn from_terms(terms: Vec<Term>) -> Self {
        Self { terms }
    }
}

/// Parse user-entered filter text into a `FilterExpr`. Blank input yields the
/// always-true expression.
pub fn parse_filter(text: &str, dialect: Dialect) -> Result<FilterExpr, ParseError> {
    let tokens = lexer::tokenize(text, dialect)?;
    parser::parse_tokens(tokens, dialect)
}
