//! Matching rules.
//!
//! A rule overrides default equality for one part of a request or response.
//! Rules are grouped by [`Category`]; body rules are keyed by [`DocPath`]
//! expressions, header and query rules by name.

use crate::error::{ModelError, ModelResult};
use crate::path::DocPath;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

/// A single matcher kind and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchingRule {
    /// Exact equality, resetting any cascading type matcher
    Equality,
    /// Same JSON type, any value
    Type,
    /// Full match of the value's textual form against a regular expression
    Regex(String),
    /// Same type and, for arrays, at least `n` elements
    MinType(usize),
    /// Same type and, for arrays, at most `n` elements
    MaxType(usize),
    /// Same type and, for arrays, between `min` and `max` elements
    MinMaxType(usize, usize),
    /// The textual form contains the given string
    Include(String),
    /// An integer number
    Integer,
    /// A number with a fractional part
    Decimal,
    /// Any number
    Number,
    /// A JSON null
    Null,
    /// A boolean
    Boolean,
    /// A date in the given pattern (`yyyy-MM-dd` when absent)
    Date(Option<String>),
    /// A time of day in the given pattern (`HH:mm:ss` when absent)
    Time(Option<String>),
    /// A date and time in the given pattern (ISO 8601 when absent)
    Timestamp(Option<String>),
    /// Map values compared against the expected template, keys ignored
    Values,
    /// Every variant is matched by at least one element of the array
    ArrayContains(Vec<ArrayVariant>),
}

/// One variant of a [`MatchingRule::ArrayContains`] rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArrayVariant {
    /// Position of the variant's example in the expected array
    pub index: usize,
    /// Body rules for the variant, rooted at the array element
    pub rules: MatchingRules,
}

impl ArrayVariant {
    fn to_json(&self) -> Value {
        json!({ "index": self.index, "rules": self.rules.body_json(), "generators": {} })
    }

    fn from_json(position: usize, value: &Value) -> ModelResult<Self> {
        let index = match value.get("index") {
            None => position,
            Some(index) => index
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| ModelError::invalid_matcher("variant 'index' must be a non-negative integer"))?,
        };
        let mut rules = MatchingRules::default();
        if let Some(entries) = value.get("rules") {
            for (expr, list) in MatchingRules::entries(entries)? {
                rules.body.push((DocPath::parse(expr)?, RuleList::from_json(list)?));
            }
        }
        Ok(Self { index, rules })
    }
}

impl MatchingRule {
    /// Read a rule from its JSON form.
    ///
    /// Accepts both the pact document form (`{"match": "type", "min": 1}`) and
    /// the integration form (`{"pact:matcher:type": "regex", "regex": "..."}`).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidMatcher`] for unknown kinds or missing
    /// parameters.
    pub fn from_json(value: &Value) -> ModelResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| ModelError::invalid_matcher(format!("expected an object, got {value}")))?;
        let kind = obj
            .get("match")
            .or_else(|| obj.get("pact:matcher:type"))
            .and_then(Value::as_str);
        let min = Self::size_param(obj, "min")?;
        let max = Self::size_param(obj, "max")?;

        let regex = || {
            obj.get("regex")
                .and_then(Value::as_str)
                .map(|re| Self::Regex(re.to_string()))
                .ok_or_else(|| ModelError::invalid_matcher("regex matcher without a 'regex' string"))
        };

        match kind {
            Some("regex") => regex(),
            None if obj.contains_key("regex") => regex(),
            Some("type") | None => match (min, max) {
                (Some(min), Some(max)) => Ok(Self::MinMaxType(min, max)),
                (Some(min), None) => Ok(Self::MinType(min)),
                (None, Some(max)) => Ok(Self::MaxType(max)),
                (None, None) if kind.is_some() => Ok(Self::Type),
                (None, None) => Err(ModelError::invalid_matcher(format!(
                    "no matcher kind in {value}"
                ))),
            },
            Some("min") => min
                .map(Self::MinType)
                .ok_or_else(|| ModelError::invalid_matcher("min matcher without 'min'")),
            Some("max") => max
                .map(Self::MaxType)
                .ok_or_else(|| ModelError::invalid_matcher("max matcher without 'max'")),
            Some("equality") => Ok(Self::Equality),
            Some("include") => obj
                .get("value")
                .and_then(Value::as_str)
                .map(|s| Self::Include(s.to_string()))
                .ok_or_else(|| ModelError::invalid_matcher("include matcher without a 'value' string")),
            Some("integer") => Ok(Self::Integer),
            Some("decimal") => Ok(Self::Decimal),
            Some("number") => Ok(Self::Number),
            Some("null") => Ok(Self::Null),
            Some("boolean") => Ok(Self::Boolean),
            Some("date") => Ok(Self::Date(Self::format_param(obj))),
            Some("time") => Ok(Self::Time(Self::format_param(obj))),
            Some("timestamp" | "datetime") => Ok(Self::Timestamp(Self::format_param(obj))),
            Some("values") => Ok(Self::Values),
            Some("arrayContains") => match obj.get("variants") {
                Some(Value::Array(variants)) => variants
                    .iter()
                    .enumerate()
                    .map(|(i, variant)| ArrayVariant::from_json(i, variant))
                    .collect::<ModelResult<Vec<_>>>()
                    .map(Self::ArrayContains),
                _ => Err(ModelError::invalid_matcher("arrayContains matcher without a 'variants' array")),
            },
            Some(other) => Err(ModelError::invalid_matcher(format!(
                "unknown matcher kind '{other}'"
            ))),
        }
    }

    fn format_param(obj: &Map<String, Value>) -> Option<String> {
        obj.get("format").and_then(Value::as_str).map(str::to_string)
    }

    fn size_param(obj: &Map<String, Value>, key: &str) -> ModelResult<Option<usize>> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| ModelError::invalid_matcher(format!("'{key}' must be a non-negative integer"))),
        }
    }

    /// The pact document form of the rule.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Equality => json!({ "match": "equality" }),
            Self::Type => json!({ "match": "type" }),
            Self::Regex(re) => json!({ "match": "regex", "regex": re }),
            Self::MinType(min) => json!({ "match": "type", "min": min }),
            Self::MaxType(max) => json!({ "match": "type", "max": max }),
            Self::MinMaxType(min, max) => json!({ "match": "type", "min": min, "max": max }),
            Self::Include(value) => json!({ "match": "include", "value": value }),
            Self::Integer => json!({ "match": "integer" }),
            Self::Decimal => json!({ "match": "decimal" }),
            Self::Number => json!({ "match": "number" }),
            Self::Null => json!({ "match": "null" }),
            Self::Boolean => json!({ "match": "boolean" }),
            Self::Date(format) => Self::format_json("date", format.as_deref()),
            Self::Time(format) => Self::format_json("time", format.as_deref()),
            Self::Timestamp(format) => Self::format_json("timestamp", format.as_deref()),
            Self::Values => json!({ "match": "values" }),
            Self::ArrayContains(variants) => json!({
                "match": "arrayContains",
                "variants": variants.iter().map(ArrayVariant::to_json).collect::<Vec<_>>(),
            }),
        }
    }

    fn format_json(kind: &str, format: Option<&str>) -> Value {
        match format {
            Some(format) => json!({ "match": kind, "format": format }),
            None => json!({ "match": kind }),
        }
    }

    /// Whether this is one of the type matchers that relax array comparison
    /// to "every element is like the first expected element".
    #[must_use]
    pub const fn is_type_matcher(&self) -> bool {
        matches!(
            self,
            Self::Type | Self::MinType(_) | Self::MaxType(_) | Self::MinMaxType(_, _)
        )
    }

    /// Short name used in mismatch descriptions.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Equality => "equality",
            Self::Type => "type",
            Self::Regex(_) => "regex",
            Self::MinType(_) => "min-type",
            Self::MaxType(_) => "max-type",
            Self::MinMaxType(_, _) => "min-max-type",
            Self::Include(_) => "include",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Number => "number",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Values => "values",
            Self::ArrayContains(_) => "array-contains",
        }
    }
}

/// How the rules of a [`RuleList`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleLogic {
    /// Every rule must pass
    #[default]
    And,
    /// At least one rule must pass
    Or,
}

/// The rules attached to one key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleList {
    /// Rules in declaration order
    pub rules: Vec<MatchingRule>,
    /// Combination logic
    pub logic: RuleLogic,
}

impl RuleList {
    /// A list holding one rule.
    #[must_use]
    pub fn new(rule: MatchingRule) -> Self {
        Self {
            rules: vec![rule],
            logic: RuleLogic::And,
        }
    }

    /// Whether the list resets matching to plain equality.
    #[must_use]
    pub fn is_equality(&self) -> bool {
        !self.rules.is_empty() && self.rules.iter().all(|r| *r == MatchingRule::Equality)
    }

    /// Whether the list contains a type matcher.
    #[must_use]
    pub fn has_type_matcher(&self) -> bool {
        self.rules.iter().any(MatchingRule::is_type_matcher)
    }

    /// Whether the list compares map values while ignoring keys.
    #[must_use]
    pub fn has_values_matcher(&self) -> bool {
        self.rules.contains(&MatchingRule::Values)
    }

    /// The variants of the first `arrayContains` rule in the list.
    #[must_use]
    pub fn array_variants(&self) -> Option<&[ArrayVariant]> {
        self.rules.iter().find_map(|rule| match rule {
            MatchingRule::ArrayContains(variants) => Some(variants.as_slice()),
            _ => None,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "matchers": self.rules.iter().map(MatchingRule::to_json).collect::<Vec<_>>(),
            "combine": self.logic,
        })
    }

    fn from_json(value: &Value) -> ModelResult<Self> {
        match value.get("matchers") {
            Some(Value::Array(matchers)) => {
                let rules = matchers
                    .iter()
                    .map(MatchingRule::from_json)
                    .collect::<ModelResult<Vec<_>>>()?;
                let logic = match value.get("combine").and_then(Value::as_str) {
                    Some("OR") => RuleLogic::Or,
                    _ => RuleLogic::And,
                };
                Ok(Self { rules, logic })
            }
            Some(other) => Err(ModelError::invalid_matcher(format!(
                "'matchers' must be an array, got {other}"
            ))),
            None => MatchingRule::from_json(value).map(Self::new),
        }
    }
}

/// The part of a request or response a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// The request path
    Path,
    /// Query parameters, keyed by name
    Query,
    /// Headers, keyed by name
    Header,
    /// The body, keyed by path expression
    Body,
}

/// All rules of one request or response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingRules {
    body: Vec<(DocPath, RuleList)>,
    header: Vec<(String, RuleList)>,
    query: Vec<(String, RuleList)>,
    path: Option<RuleList>,
}

impl MatchingRules {
    /// Empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no rule is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.header.is_empty() && self.query.is_empty() && self.path.is_none()
    }

    /// Add a body rule. A rule for an already-declared expression joins that
    /// expression's list.
    pub fn add_body_rule(&mut self, path: DocPath, rule: MatchingRule) {
        match self.body.iter_mut().find(|(p, _)| p.as_str() == path.as_str()) {
            Some((_, list)) => list.rules.push(rule),
            None => self.body.push((path, RuleList::new(rule))),
        }
    }

    /// Add a header rule.
    pub fn add_header_rule(&mut self, name: &str, rule: MatchingRule) {
        Self::add_named(&mut self.header, name, rule);
    }

    /// Add a query parameter rule.
    pub fn add_query_rule(&mut self, name: &str, rule: MatchingRule) {
        Self::add_named(&mut self.query, name, rule);
    }

    /// Add a path rule.
    pub fn add_path_rule(&mut self, rule: MatchingRule) {
        self.path.get_or_insert_with(RuleList::default).rules.push(rule);
    }

    /// Add a rule to a category. `key` is a path expression for
    /// [`Category::Body`], a name for headers and query parameters, and
    /// ignored for [`Category::Path`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPath`] when a body key does not parse.
    pub fn add_rule(&mut self, category: Category, key: &str, rule: MatchingRule) -> ModelResult<()> {
        match category {
            Category::Body => self.add_body_rule(DocPath::parse(key)?, rule),
            Category::Header => self.add_header_rule(key, rule),
            Category::Query => self.add_query_rule(key, rule),
            Category::Path => self.add_path_rule(rule),
        }
        Ok(())
    }

    fn add_named(list: &mut Vec<(String, RuleList)>, name: &str, rule: MatchingRule) {
        match list.iter_mut().find(|(n, _)| n == name) {
            Some((_, rules)) => rules.rules.push(rule),
            None => list.push((name.to_string(), RuleList::new(rule))),
        }
    }

    /// The most specific body rules applying to `path`.
    ///
    /// Rules declared for an ancestor apply to descendants. The highest
    /// [`DocPath::weight`] wins; on a tie the later declaration wins.
    #[must_use]
    pub fn resolve_body(&self, path: &DocPath) -> Option<&RuleList> {
        let mut best: Option<(usize, &RuleList)> = None;
        for (rule_path, list) in &self.body {
            let weight = rule_path.weight(path);
            if weight == 0 {
                continue;
            }
            if best.is_none_or(|(w, _)| weight >= w) {
                best = Some((weight, list));
            }
        }
        best.map(|(_, list)| list)
    }

    /// Header rules for `name`: exact name first, then case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&RuleList> {
        self.header
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .or_else(|| self.header.iter().rev().find(|(n, _)| n.eq_ignore_ascii_case(name)))
            .map(|(_, list)| list)
    }

    /// Query rules for `name`.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&RuleList> {
        self.query.iter().rev().find(|(n, _)| n == name).map(|(_, list)| list)
    }

    /// Path rules.
    #[must_use]
    pub const fn path(&self) -> Option<&RuleList> {
        self.path.as_ref()
    }

    /// Body rule expressions in declaration order.
    pub fn body_paths(&self) -> impl Iterator<Item = &DocPath> {
        self.body.iter().map(|(path, _)| path)
    }

    /// The nested document form (`{"body": {...}, "header": {...}, ...}`).
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        if !self.body.is_empty() {
            out.insert("body".to_string(), self.body_json());
        }
        for (key, named) in [("header", &self.header), ("query", &self.query)] {
            if !named.is_empty() {
                let map: Map<String, Value> = named
                    .iter()
                    .map(|(name, list)| (name.clone(), list.to_json()))
                    .collect();
                out.insert(key.to_string(), Value::Object(map));
            }
        }
        if let Some(path) = &self.path {
            out.insert("path".to_string(), path.to_json());
        }
        Value::Object(out)
    }

    /// The body rules as a map from path expression to rule list.
    #[must_use]
    pub fn body_json(&self) -> Value {
        Value::Object(
            self.body
                .iter()
                .map(|(path, list)| (path.as_str().to_string(), list.to_json()))
                .collect(),
        )
    }

    /// Read either the nested form or the flat `"$.body.x"` form.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed rules or body expressions.
    pub fn from_json(value: &Value) -> ModelResult<Self> {
        let Some(obj) = value.as_object() else {
            return match value {
                Value::Null => Ok(Self::default()),
                other => Err(ModelError::invalid_matcher(format!(
                    "matchingRules must be an object, got {other}"
                ))),
            };
        };

        let mut rules = Self::default();
        if obj.keys().any(|k| k.starts_with('$')) {
            for (key, rule) in obj {
                rules.add_flat(key, rule)?;
            }
            return Ok(rules);
        }

        for (category, entries) in obj {
            match category.as_str() {
                "body" => {
                    for (expr, list) in Self::entries(entries)? {
                        rules.body.push((DocPath::parse(expr)?, RuleList::from_json(list)?));
                    }
                }
                "header" | "headers" => {
                    for (name, list) in Self::entries(entries)? {
                        rules.header.push((name.clone(), RuleList::from_json(list)?));
                    }
                }
                "query" => {
                    for (name, list) in Self::entries(entries)? {
                        rules.query.push((name.clone(), RuleList::from_json(list)?));
                    }
                }
                "path" => rules.path = Some(RuleList::from_json(entries)?),
                other => {
                    tracing::debug!(category = other, "ignoring unsupported matching rule category");
                }
            }
        }
        Ok(rules)
    }

    fn entries(value: &Value) -> ModelResult<&Map<String, Value>> {
        value
            .as_object()
            .ok_or_else(|| ModelError::invalid_matcher(format!("expected a rule map, got {value}")))
    }

    fn add_flat(&mut self, key: &str, rule: &Value) -> ModelResult<()> {
        let list = RuleList::from_json(rule)?;
        if key == "$.path" {
            self.path = Some(list);
        } else if key == "$.body" {
            self.body.push((DocPath::root(), list));
        } else if let Some(rest) = key.strip_prefix("$.body") {
            self.body.push((DocPath::parse(&format!("${rest}"))?, list));
        } else if let Some(name) = key
            .strip_prefix("$.headers.")
            .or_else(|| key.strip_prefix("$.header."))
        {
            self.header.push((Self::unquote(name), list));
        } else if let Some(name) = key.strip_prefix("$.query.") {
            self.query.push((Self::unquote(name), list));
        } else {
            tracing::debug!(key, "ignoring unsupported flat matching rule key");
        }
        Ok(())
    }

    fn unquote(name: &str) -> String {
        name.trim_start_matches("['")
            .trim_end_matches("']")
            .to_string()
    }
}

impl Serialize for MatchingRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MatchingRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}
