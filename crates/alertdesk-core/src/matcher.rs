//! Label matchers and the free-text matcher language.
//!
//! Operators type matchers as whitespace-separated tokens such as
//! `host=test job!=node env=~"prod|staging" alertname`. Each token is split on
//! the first operator found when testing them in the order `!=`, `=~`, `!~`,
//! `=`. A token with no operator is a bare alert name and becomes
//! `alertname="<token>"`. Parsing never fails.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Label every bare token is matched against.
pub const ALERTNAME_LABEL: &str = "alertname";

/// Comparison performed by a [`Matcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOp {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `=~`
    RegexMatch,
    /// `!~`
    RegexNotMatch,
}

impl MatchOp {
    /// Operators in the order tokens are tested against them.
    pub const PRECEDENCE: [Self; 4] = [
        Self::NotEqual,
        Self::RegexMatch,
        Self::RegexNotMatch,
        Self::Equal,
    ];

    /// Returns the operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::RegexMatch => "=~",
            Self::RegexNotMatch => "!~",
        }
    }

    /// Builds the operator from the wire mode flags.
    #[must_use]
    pub const fn from_mode(is_equal: bool, is_regex: bool) -> Self {
        match (is_equal, is_regex) {
            (true, false) => Self::Equal,
            (false, false) => Self::NotEqual,
            (true, true) => Self::RegexMatch,
            (false, true) => Self::RegexNotMatch,
        }
    }

    /// Parses an operator symbol.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::PRECEDENCE.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Whether the operator is a positive match.
    #[must_use]
    pub const fn is_equal(self) -> bool {
        matches!(self, Self::Equal | Self::RegexMatch)
    }

    /// Whether the value is a regular expression.
    #[must_use]
    pub const fn is_regex(self) -> bool {
        matches!(self, Self::RegexMatch | Self::RegexNotMatch)
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn default_is_equal() -> bool {
    true
}

/// A single label predicate, in the Alertmanager v2 wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    /// Label name.
    pub name: String,
    /// Value or regular expression.
    pub value: String,
    /// Whether `value` is a regular expression.
    #[serde(default)]
    pub is_regex: bool,
    /// Whether the match is positive.
    #[serde(default = "default_is_equal")]
    pub is_equal: bool,
}

impl Matcher {
    /// Creates a matcher from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_regex: op.is_regex(),
            is_equal: op.is_equal(),
        }
    }

    /// Creates an `=` matcher.
    #[must_use]
    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, MatchOp::Equal, value)
    }

    /// Returns the operator encoded by the mode flags.
    #[must_use]
    pub const fn op(&self) -> MatchOp {
        MatchOp::from_mode(self.is_equal, self.is_regex)
    }

    /// Renders the matcher as `name<op>"value"`, the form accepted by the
    /// Alertmanager `filter` parameter and by [`parse_matchers`].
    #[must_use]
    pub fn filter_expr(&self) -> String {
        let mut escaped = String::with_capacity(self.value.len());
        for c in self.value.chars() {
            if c == '"' || c == '\\' {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        format!("{}{}\"{}\"", self.name, self.op().symbol(), escaped)
    }

    /// Checks that a regex matcher compiles.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidRegex` if the value is not a valid regex.
    pub fn validate(&self) -> Result<()> {
        if self.is_regex {
            Regex::new(&format!("^(?:{})$", self.value)).map_err(|e| CoreError::InvalidRegex {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filter_expr())
    }
}

/// Parses a free-text matcher expression.
///
/// Returns an empty vector only when the input has no tokens at all.
#[must_use]
pub fn parse_matchers(input: &str) -> Vec<Matcher> {
    tokenize(input).iter().map(|t| parse_token(t)).collect()
}

/// Builds one `=` matcher per label, ordered by label name.
#[must_use]
pub fn matchers_from_labels(labels: &BTreeMap<String, String>) -> Vec<Matcher> {
    labels
        .iter()
        .map(|(name, value)| Matcher::equal(name, value))
        .collect()
}

/// Whether two matcher lists describe the same set, ignoring order.
#[must_use]
pub fn same_matchers(a: &[Matcher], b: &[Matcher]) -> bool {
    a.len() == b.len() && a.iter().all(|m| b.contains(m)) && b.iter().all(|m| a.contains(m))
}

/// Builds the Alertmanager alerts query for a set of matchers, asking for
/// silenced, inhibited and active alerts.
#[must_use]
pub fn filter_query(matchers: &[Matcher]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for matcher in matchers {
        query.append_pair("filter", &matcher.filter_expr());
    }
    query
        .append_pair("silenced", "true")
        .append_pair("inhibited", "true")
        .append_pair("active", "true");
    query.finish()
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_token(token: &str) -> Matcher {
    // Operators inside a quoted value never split the token.
    let head_end = token.find(['"', '\'']).unwrap_or(token.len());
    let head = &token[..head_end];

    for op in MatchOp::PRECEDENCE {
        if let Some(pos) = head.find(op.symbol()) {
            let name = token[..pos].trim();
            if name.is_empty() {
                break;
            }
            let value = unquote(&token[pos + op.symbol().len()..]);
            return Matcher::new(name, op, value);
        }
    }

    Matcher::equal(ALERTNAME_LABEL, unquote(token))
}

fn unquote(raw: &str) -> String {
    let mut chars = raw.chars();
    let (Some(first), Some(last)) = (chars.next(), raw.chars().last()) else {
        return raw.to_string();
    };
    if raw.len() < 2 || first != last || (first != '"' && first != '\'') {
        return raw.to_string();
    }

    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}
