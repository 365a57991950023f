use super::lexer::Token;
use super::{Atom, CmpOp, Dialect, FilterExpr, ParseError, Term};

/// What the contents of a parenthesized group have turned out to be. A group
/// is either a set (`(a b)`, every member must match) or a disjunction
/// (`(a or b)`, folded into the surrounding term); mixing the two separator
/// styles is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GroupStyle {
    Undecided,
    Set,
    Disjunction,
}

/// Parser states. Each state accepts a fixed set of token classes; anything
/// else is reported with the offending token and the classes that were
/// expected. `AfterAtom` is the only accepting state besides empty input.
enum State {
    ExpectFactor,
    AfterNot,
    AfterOp(CmpOp),
    AfterAtom,
    GroupWord {
        negated: bool,
        items: Vec<String>,
        style: GroupStyle,
    },
    GroupSep {
        negated: bool,
        items: Vec<String>,
        style: GroupStyle,
    },
}

pub(super) fn parse_tokens(tokens: Vec<Token>, dialect: Dialect) -> Result<FilterExpr, ParseError> {
    if tokens.is_empty() {
        return Ok(FilterExpr::always_true());
    }

    let mut terms: Vec<Term> = Vec::new();
    let mut current: Vec<Atom> = Vec::new();
    let mut state = State::ExpectFactor;

    for token in tokens {
        state = step(state, token, dialect, &mut terms, &mut current)?;
    }

    match state {
        State::AfterAtom => {
            terms.push(Term(current));
            Ok(FilterExpr::from_terms(terms))
        }
        _ => Err(ParseError::Incomplete { dialect }),
    }
}

fn step(
    state: State,
    token: Token,
    dialect: Dialect,
    terms: &mut Vec<Term>,
    current: &mut Vec<Atom>,
) -> Result<State, ParseError> {
    match state {
        State::ExpectFactor => match token {
            Token::Word(word) => {
                current.push(Atom::Token(word));
                Ok(State::AfterAtom)
            }
            Token::Not => Ok(State::AfterNot),
            Token::Open => Ok(State::GroupWord {
                negated: false,
                items: Vec::new(),
                style: GroupStyle::Undecided,
            }),
            Token::Op(op) => Ok(State::AfterOp(op)),
            other => Err(unexpected(
                dialect,
                &other,
                "a string, 'not', '(' or a comparison operator",
            )),
        },
        State::AfterNot => match token {
            Token::Word(word) => {
                current.push(Atom::NotToken(word));
                Ok(State::AfterAtom)
            }
            Token::Open => Ok(State::GroupWord {
                negated: true,
                items: Vec::new(),
                style: GroupStyle::Undecided,
            }),
            other => Err(unexpected(dialect, &other, "a string or '(' after 'not'")),
        },
        State::AfterOp(op) => match token {
            Token::Number(bound) => {
                current.push(Atom::Count(op, bound));
                Ok(State::AfterAtom)
            }
            Token::Word(word) => Err(ParseError::BadNumber {
                dialect,
                found: format!("'{word}'"),
            }),
            other => Err(unexpected(dialect, &other, "a number")),
        },
        State::AfterAtom => match token {
            Token::And => {
                terms.push(Term(std::mem::take(current)));
                Ok(State::ExpectFactor)
            }
            Token::Or => Ok(State::ExpectFactor),
            other => Err(unexpected(dialect, &other, "'and', 'or' or end of input")),
        },
        State::GroupWord {
            negated,
            mut items,
            style,
        } => match token {
            Token::Word(word) => {
                items.push(word);
                Ok(State::GroupSep {
                    negated,
                    items,
                    style,
                })
            }
            other => Err(unexpected(dialect, &other, "a string inside parentheses")),
        },
        State::GroupSep {
            negated,
            mut items,
            style,
        } => match token {
            Token::Word(word) if style != GroupStyle::Disjunction => {
                items.push(word);
                Ok(State::GroupSep {
                    negated,
                    items,
                    style: GroupStyle::Set,
                })
            }
            Token::Or if negated => Err(unexpected(
                dialect,
                &Token::Or,
                "a string or ')' in a negated set",
            )),
            Token::Or if style != GroupStyle::Set => Ok(State::GroupWord {
                negated,
                items,
                style: GroupStyle::Disjunction,
            }),
            Token::Close => {
                close_group(negated, items, style, current);
                Ok(State::AfterAtom)
            }
            other => {
                let expected = match style {
                    GroupStyle::Disjunction => "'or' or ')'",
                    GroupStyle::Set => "a string or ')'",
                    GroupStyle::Undecided => "a string, 'or' or ')'",
                };
                Err(unexpected(dialect, &other, expected))
            }
        },
    }
}

fn close_group(negated: bool, mut items: Vec<String>, style: GroupStyle, current: &mut Vec<Atom>) {
    if negated {
        if items.len() == 1 {
            current.push(Atom::NotToken(items.remove(0)));
        } else {
            current.push(Atom::NotSet(items));
        }
        return;
    }

    match style {
        GroupStyle::Disjunction => {
            current.extend(items.into_iter().map(Atom::Token));
        }
        GroupStyle::Set | GroupStyle::Undecided => {
            if items.len() == 1 {
                current.push(Atom::Token(items.remove(0)));
            } else {
                current.push(Atom::Set(items));
            }
        }
    }
}

fn unexpected(dialect: Dialect, token: &Token, expected: &'static str) -> ParseError {
    ParseError::UnexpectedToken {
        dialect,
        found: token.describe(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_filter;
    use super::*;

    fn parse(text: &str) -> Result<FilterExpr, ParseError> {
        parse_filter(text, Dialect::Links)
    }

    #[test]
    fn test_or_group_folds_into_term() {
        let expr = parse("(a or b) and c").unwrap();
        // First term carries two disjuncts, second the lone token.
        assert!(expr.matches(&["a x".to_owned(), "c x".to_owned()]));
        assert!(expr.matches(&["b x".to_owned(), "c x".to_owned()]));
        assert!(!expr.matches(&["a x".to_owned()]));
    }

    #[test]
    fn test_mixed_group_separators_rejected() {
        assert!(matches!(
            parse("(a b or c)"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse("(a or b c)"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_or_in_negated_set_rejected() {
        assert!(matches!(
            parse("not (a or b)"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(
            parse("()"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_word_after_count_rejected() {
        assert!(matches!(
            parse(">= two"),
            Err(ParseError::BadNumber { .. })
        ));
    }

    #[test]
    fn test_trailing_or_incomplete() {
        assert!(matches!(
            parse("a or"),
            Err(ParseError::Incomplete { .. })
        ));
    }

    #[test]
    fn test_error_reports_offender_and_expected() {
        let error = parse("a a").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("'a'"));
        assert!(message.contains("'and', 'or' or end of input"));
    }

    #[test]
    fn test_double_not_rejected() {
        assert!(matches!(
            parse("not not a"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }
}
