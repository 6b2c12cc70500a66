//! Document path expressions.
//!
//! Matching rules address parts of a body with JSON-path-like expressions
//! (`$.items[*].name`, `$['odd key']`). Observed values are addressed with the
//! same type, using only concrete field and index tokens.

use crate::error::{ModelError, ModelResult};
use std::fmt;

/// A single step of a [`DocPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    /// The document root (`$`)
    Root,
    /// A named object field
    Field(String),
    /// A concrete array index
    Index(usize),
    /// Any field or index (`*`)
    Star,
    /// Any array index (`[*]`)
    StarIndex,
}

/// A parsed path expression together with its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    expr: String,
    tokens: Vec<PathToken>,
}

impl DocPath {
    /// The root path `$`.
    #[must_use]
    pub fn root() -> Self {
        Self {
            expr: "$".to_string(),
            tokens: vec![PathToken::Root],
        }
    }

    /// Parse a path expression.
    ///
    /// Expressions without a leading `$` are treated as relative to the root.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPath`] for unterminated brackets, empty
    /// field names or non-numeric indices.
    pub fn parse(expr: &str) -> ModelResult<Self> {
        let trimmed = expr.trim();
        let rest = match trimmed.strip_prefix('$') {
            Some(rest) => rest,
            None if trimmed.is_empty() => "",
            None => return Self::parse(&format!("$.{trimmed}")),
        };

        let mut tokens = vec![PathToken::Root];
        let chars: Vec<char> = rest.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
                        end += 1;
                    }
                    let name: String = chars[start..end].iter().collect();
                    if name.is_empty() {
                        return Err(ModelError::invalid_path(expr, "empty field name"));
                    }
                    tokens.push(if name == "*" {
                        PathToken::Star
                    } else {
                        PathToken::Field(name)
                    });
                    i = end;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| ModelError::invalid_path(expr, "unterminated '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    tokens.push(Self::bracket_token(expr, inner.trim())?);
                    i = close + 1;
                }
                other => {
                    return Err(ModelError::invalid_path(
                        expr,
                        format!("unexpected character '{other}'"),
                    ));
                }
            }
        }

        Ok(Self {
            expr: if trimmed.is_empty() { "$".to_string() } else { trimmed.to_string() },
            tokens,
        })
    }

    fn bracket_token(expr: &str, inner: &str) -> ModelResult<PathToken> {
        if inner == "*" {
            return Ok(PathToken::StarIndex);
        }
        let quoted = (inner.starts_with('\'') && inner.ends_with('\''))
            || (inner.starts_with('"') && inner.ends_with('"'));
        if quoted && inner.len() >= 2 {
            let name = &inner[1..inner.len() - 1];
            if name.is_empty() {
                return Err(ModelError::invalid_path(expr, "empty field name"));
            }
            return Ok(PathToken::Field(name.to_string()));
        }
        inner
            .parse::<usize>()
            .map(PathToken::Index)
            .map_err(|_| ModelError::invalid_path(expr, format!("invalid index '{inner}'")))
    }

    /// Append a field step.
    #[must_use]
    pub fn join(&self, field: &str) -> Self {
        let mut next = self.clone();
        let simple = !field.is_empty()
            && field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if simple {
            next.expr.push('.');
            next.expr.push_str(field);
        } else if field.contains('\'') {
            next.expr.push_str(&format!("[\"{field}\"]"));
        } else {
            next.expr.push_str(&format!("['{field}']"));
        }
        next.tokens.push(PathToken::Field(field.to_string()));
        next
    }

    /// Append a concrete index step.
    #[must_use]
    pub fn join_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.expr.push_str(&format!("[{index}]"));
        next.tokens.push(PathToken::Index(index));
        next
    }

    /// Append an any-index step (`[*]`).
    #[must_use]
    pub fn join_star_index(&self) -> Self {
        let mut next = self.clone();
        next.expr.push_str("[*]");
        next.tokens.push(PathToken::StarIndex);
        next
    }

    /// The path tokens, starting with [`PathToken::Root`].
    #[must_use]
    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    /// The textual expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tokens.len() == 1
    }

    /// How specifically this expression addresses `actual`.
    ///
    /// Returns `0` when the expression does not apply. An expression applies to
    /// a concrete path when each of its tokens matches the corresponding
    /// leading token of the concrete path, so rules cascade to descendants.
    /// Exact tokens weigh 2 and wildcards 1; the weight is their product.
    #[must_use]
    pub fn weight(&self, actual: &Self) -> usize {
        if self.tokens.len() > actual.tokens.len() {
            return 0;
        }
        self.tokens
            .iter()
            .zip(actual.tokens.iter())
            .map(|(rule, concrete)| match (rule, concrete) {
                (PathToken::Root, PathToken::Root) => 2,
                (PathToken::Field(a), PathToken::Field(b)) if a == b => 2,
                (PathToken::Index(a), PathToken::Index(b)) if a == b => 2,
                (PathToken::Star, PathToken::Field(_) | PathToken::Index(_))
                | (PathToken::StarIndex, PathToken::Index(_)) => 1,
                _ => 0,
            })
            .product()
    }
}

impl Default for DocPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(expr: &str) -> DocPath {
        DocPath::parse(expr).unwrap()
    }

    #[test]
    fn test_parse_tokens() {
        let parsed = path("$.animals[*].children[0]['first name']");
        assert_eq!(
            parsed.tokens(),
            &[
                PathToken::Root,
                PathToken::Field("animals".to_string()),
                PathToken::StarIndex,
                PathToken::Field("children".to_string()),
                PathToken::Index(0),
                PathToken::Field("first name".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_relative_and_star() {
        assert_eq!(path("value").tokens(), path("$.value").tokens());
        assert_eq!(path("$.*").tokens()[1], PathToken::Star);
        assert!(path("$").is_root());
    }

    #[test]
    fn test_parse_errors() {
        assert!(DocPath::parse("$.a[").is_err());
        assert!(DocPath::parse("$..a").is_err());
        assert!(DocPath::parse("$.a[x]").is_err());
        assert!(DocPath::parse("$a").is_err());
    }

    #[test]
    fn test_join_builds_expression() {
        let p = DocPath::root().join("items").join_index(2).join("odd key");
        assert_eq!(p.as_str(), "$.items[2]['odd key']");
        assert_eq!(p.tokens(), path("$.items[2]['odd key']").tokens());
    }

    #[test]
    fn test_weight_prefers_specific_paths() {
        let actual = path("$.animals[0].name");
        let exact = path("$.animals[0].name");
        let wildcard = path("$.animals[*].name");
        let prefix = path("$.animals");
        let other = path("$.plants");

        assert!(exact.weight(&actual) > wildcard.weight(&actual));
        assert!(wildcard.weight(&actual) > prefix.weight(&actual));
        assert!(prefix.weight(&actual) > 0);
        assert_eq!(other.weight(&actual), 0);
    }

    #[test]
    fn test_weight_longer_rule_never_applies() {
        assert_eq!(path("$.a.b").weight(&path("$.a")), 0);
    }

    #[test]
    fn test_star_index_only_matches_indices() {
        assert_eq!(path("$[*]").weight(&path("$.a")), 0);
        assert_eq!(path("$[*]").weight(&path("$[3]")), 2);
        assert_eq!(path("$.*").weight(&path("$[3]")), 2);
    }
}
