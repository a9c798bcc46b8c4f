//! Policy parser.
//!
//! Parses GC policies in the form accepted by `cbt setgcpolicy`:
//! - `maxage=5d` - drop cells older than five days
//! - `maxversions=2` - drop all but the two newest versions
//! - `a and b` / `a && b` - intersection
//! - `a or b` / `a || b` - union
//! - `( ... )` - grouping
//!
//! `and` binds tighter than `or`, and a chain of the same operator becomes a
//! single composite (`a or b or c` is one union of three rules).

use super::duration::parse_duration;
use crate::gc::{DEFAULT_MAX_DEPTH, validate};
use crate::models::GcRule;
use crate::{Error, Result};
use std::str::FromStr;

/// Parses a policy string using the default depth limit.
///
/// # Errors
///
/// Returns [`Error::PolicyParse`] for text that does not follow the grammar,
/// and [`Error::Structural`] or [`Error::DepthExceeded`] if the parsed tree
/// fails validation.
///
/// # Examples
///
/// ```
/// use cellgc::{GcRule, parse_policy};
///
/// let rule = parse_policy("maxversions=10 or (maxversions=2 and maxage=5d)")?;
/// assert_eq!(rule.kind(), "union");
/// assert_eq!(rule.depth(), 3);
/// # Ok::<(), cellgc::Error>(())
/// ```
pub fn parse_policy(input: &str) -> Result<GcRule> {
    parse_policy_with_limit(input, DEFAULT_MAX_DEPTH)
}

/// Parses a policy string, rejecting nesting deeper than `max_depth`.
///
/// Parenthesis nesting is limited while parsing, and the finished tree is
/// validated against the same limit.
///
/// # Errors
///
/// See [`parse_policy`].
pub fn parse_policy_with_limit(input: &str, max_depth: usize) -> Result<GcRule> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        end: input.len(),
    };

    let rule = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(parse_error(
            token.offset,
            format!("unexpected {}", token.kind.describe()),
        ));
    }

    validate(&rule, max_depth)?;
    Ok(rule)
}

impl FromStr for GcRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_policy(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    LParen,
    RParen,
    And,
    Or,
    Eq,
    Word(String),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::And => "'and'".to_string(),
            Self::Or => "'or'".to_string(),
            Self::Eq => "'='".to_string(),
            Self::Word(word) => format!("'{word}'"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn parse_error(position: usize, message: impl Into<String>) -> Error {
    Error::PolicyParse {
        position,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let kind = match c {
            c if c.is_whitespace() => continue,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '=' => TokenKind::Eq,
            '&' | '|' => {
                if chars.next_if(|&(_, next)| next == c).is_none() {
                    return Err(parse_error(offset, format!("expected '{c}{c}'")));
                }
                if c == '&' {
                    TokenKind::And
                } else {
                    TokenKind::Or
                }
            },
            c if is_word_char(c) => {
                let mut end = offset + c.len_utf8();
                while let Some((next_offset, next)) =
                    chars.next_if(|&(_, next)| is_word_char(next))
                {
                    end = next_offset + next.len_utf8();
                }
                let word = &input[offset..end];
                if word.eq_ignore_ascii_case("and") {
                    TokenKind::And
                } else if word.eq_ignore_ascii_case("or") {
                    TokenKind::Or
                } else {
                    TokenKind::Word(word.to_string())
                }
            },
            other => {
                return Err(parse_error(
                    offset,
                    format!("unexpected character '{other}'"),
                ));
            },
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|token| token.kind == *kind) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn parse_or(&mut self) -> Result<GcRule> {
        let mut rules = vec![self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            rules.push(self.parse_and()?);
        }
        Ok(collapse(rules, GcRule::Union))
    }

    fn parse_and(&mut self) -> Result<GcRule> {
        let mut rules = vec![self.parse_atom()?];
        while self.eat(&TokenKind::And) {
            rules.push(self.parse_atom()?);
        }
        Ok(collapse(rules, GcRule::Intersection))
    }

    fn parse_atom(&mut self) -> Result<GcRule> {
        let Some(token) = self.next() else {
            return Err(parse_error(self.end, "expected a rule"));
        };

        match token.kind {
            TokenKind::LParen => {
                self.depth += 1;
                if self.depth > self.max_depth {
                    return Err(Error::DepthExceeded {
                        depth: self.depth,
                        limit: self.max_depth,
                    });
                }
                let rule = self.parse_or()?;
                if !self.eat(&TokenKind::RParen) {
                    let offset = self.peek().map_or(self.end, |t| t.offset);
                    return Err(parse_error(offset, "expected ')'"));
                }
                self.depth -= 1;
                Ok(rule)
            },
            TokenKind::Word(key) => self.parse_leaf(&key, token.offset),
            other => Err(parse_error(
                token.offset,
                format!("expected a rule, found {}", other.describe()),
            )),
        }
    }

    fn parse_leaf(&mut self, key: &str, offset: usize) -> Result<GcRule> {
        if !self.eat(&TokenKind::Eq) {
            let at = self.peek().map_or(self.end, |t| t.offset);
            return Err(parse_error(at, format!("expected '=' after '{key}'")));
        }
        let expected_at = self.peek().map_or(self.end, |t| t.offset);
        let Some(Token {
            kind: TokenKind::Word(value),
            offset: value_offset,
        }) = self.next()
        else {
            return Err(parse_error(
                expected_at,
                format!("missing value for '{key}'"),
            ));
        };

        match key.to_lowercase().as_str() {
            "maxage" | "max_age" => parse_duration(&value)
                .map(GcRule::MaxAge)
                .map_err(|e| parse_error(value_offset, e.to_string())),
            "maxversions" | "max_versions" => value
                .parse::<u32>()
                .map(GcRule::MaxVersions)
                .map_err(|_| {
                    parse_error(value_offset, format!("invalid version count '{value}'"))
                }),
            _ => Err(parse_error(offset, format!("unknown rule '{key}'"))),
        }
    }
}

/// Returns the single rule unchanged, or wraps several in a composite.
fn collapse(mut rules: Vec<GcRule>, composite: fn(Vec<GcRule>) -> GcRule) -> GcRule {
    if rules.len() == 1 {
        if let Some(rule) = rules.pop() {
            return rule;
        }
    }
    composite(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use test_case::test_case;

    #[test]
    fn test_parse_leaves() {
        assert_eq!(
            parse_policy("maxage=5d").unwrap(),
            GcRule::MaxAge(TimeDelta::days(5))
        );
        assert_eq!(
            parse_policy("maxversions=3").unwrap(),
            GcRule::MaxVersions(3)
        );
        assert_eq!(
            parse_policy("max_age = 12h").unwrap(),
            GcRule::MaxAge(TimeDelta::hours(12))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let rule = parse_policy("maxversions=10 or maxversions=2 and maxage=5d").unwrap();
        assert_eq!(
            rule,
            GcRule::Union(vec![
                GcRule::MaxVersions(10),
                GcRule::Intersection(vec![
                    GcRule::MaxVersions(2),
                    GcRule::MaxAge(TimeDelta::days(5)),
                ]),
            ])
        );
    }

    #[test]
    fn test_chain_flattens() {
        let rule = parse_policy("maxage=1d || maxage=2d || maxversions=4").unwrap();
        assert_eq!(rule.kind(), "union");
        assert_eq!(rule.children().len(), 3);
    }

    #[test]
    fn test_parentheses_group() {
        let rule = parse_policy("(maxage=1d or maxversions=2) and maxversions=1").unwrap();
        assert_eq!(
            rule,
            GcRule::Intersection(vec![
                GcRule::Union(vec![
                    GcRule::MaxAge(TimeDelta::days(1)),
                    GcRule::MaxVersions(2),
                ]),
                GcRule::MaxVersions(1),
            ])
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let upper = parse_policy("MAXAGE=5D AND MaxVersions=2").unwrap();
        let lower = parse_policy("maxage=5d and maxversions=2").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_from_str() {
        let rule: GcRule = "maxversions=1".parse().unwrap();
        assert_eq!(rule, GcRule::MaxVersions(1));
    }

    #[test_case("", 0; "empty input")]
    #[test_case("maxage", 6; "missing equals")]
    #[test_case("maxage=", 7; "missing value")]
    #[test_case("maxage=(", 7; "paren instead of value")]
    #[test_case("maxversions = and maxage=1d", 14; "operator instead of value")]
    #[test_case("maxage=5d or", 12; "dangling operator")]
    #[test_case("(maxage=5d", 10; "unclosed paren")]
    #[test_case("maxage=5d)", 9; "stray paren")]
    #[test_case("maxcells=5", 0; "unknown rule")]
    #[test_case("maxversions=many", 12; "bad count")]
    #[test_case("maxage=5y", 7; "bad duration")]
    #[test_case("maxage=5d & maxversions=1", 10; "single ampersand")]
    #[test_case("maxage=5d ; maxversions=1", 10; "bad character")]
    fn test_parse_errors(input: &str, position: usize) {
        match parse_policy(input).unwrap_err() {
            Error::PolicyParse { position: at, .. } => assert_eq!(at, position),
            other => panic!("expected a parse error, got {other}"),
        }
    }

    #[test]
    fn test_zero_versions_fails_validation() {
        let err = parse_policy("maxversions=0").unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn test_paren_depth_limit() {
        let input = format!("{}maxage=1d{}", "(".repeat(5), ")".repeat(5));
        assert!(parse_policy_with_limit(&input, 5).is_ok());

        let err = parse_policy_with_limit(&input, 4).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { depth: 5, limit: 4 }));
    }

    #[test]
    fn test_hostile_nesting_does_not_overflow() {
        let input = "(".repeat(100_000);
        let err = parse_policy(&input).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { .. }));
    }

    #[test]
    fn test_tree_depth_limit() {
        // Alternating operators nest one level per parenthesis.
        let rule = parse_policy_with_limit(
            "maxage=1d or (maxage=2d and (maxage=3d or maxversions=1))",
            3,
        );
        assert!(matches!(
            rule,
            Err(Error::DepthExceeded { depth: 4, limit: 3 })
        ));
    }

    #[test]
    fn test_display_round_trip() {
        let input = "maxversions=10 or (maxversions=2 and maxage=5d)";
        let rule = parse_policy(input).unwrap();
        assert_eq!(rule.to_string(), input);
        assert_eq!(parse_policy(&rule.to_string()).unwrap(), rule);
    }
}
