//! Pact document types.

use crate::error::ModelResult;
use crate::matching_rules::MatchingRules;
use crate::registry::is_json_content_type;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Specification version written for pacts built in the registry.
pub const DEFAULT_SPECIFICATION_VERSION: &str = "3.0.0";

/// Multi-valued, name-ordered string map used for headers and query parameters.
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// A Pact contract between consumer and provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pact {
    /// Consumer participant
    pub consumer: Participant,
    /// Provider participant
    pub provider: Participant,
    /// Contract interactions in declaration order
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    /// Contract metadata
    #[serde(default)]
    pub metadata: PactMetadata,
}

impl Pact {
    /// Create an empty pact between two participants.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: Participant::new(consumer),
            provider: Participant::new(provider),
            interactions: Vec::new(),
            metadata: PactMetadata::default(),
        }
    }

    /// Parse a pact document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError::InvalidPact`] for malformed JSON or a
    /// document missing its participants.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the pact as pretty-printed JSON with sorted keys.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError::InvalidPact`] if serialization fails.
    pub fn to_json_pretty(&self) -> ModelResult<String> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// File name the pact is written under. Path separators, `:` and
    /// leading dots in participant names become `_`, so the name never
    /// leaves the target directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.json",
            file_safe(&self.consumer.name),
            file_safe(&self.provider.name)
        )
    }

    /// The specification version of the document.
    #[must_use]
    pub fn specification_version(&self) -> &str {
        &self.metadata.pact_specification.version
    }
}

/// A participant in a contract (consumer or provider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// Participant name
    pub name: String,
}

impl Participant {
    /// Create a new participant.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A provider state declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderState {
    /// State name
    pub name: String,
    /// Optional parameters
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ProviderState {
    /// A state without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }
}

/// An interaction in a contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "InteractionDocument")]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// Interaction description
    pub description: String,
    /// Provider states (preconditions) in declaration order
    pub provider_states: Vec<ProviderState>,
    /// Expected request
    pub request: Request,
    /// Expected response
    pub response: Response,
}

impl Interaction {
    /// A new interaction expecting `GET /` and answering `200`.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            provider_states: Vec::new(),
            request: Request::default(),
            response: Response::default(),
        }
    }
}

/// Accepts both the v3 `providerStates` array and the v2 `providerState` string.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionDocument {
    #[serde(default)]
    description: String,
    #[serde(default)]
    provider_state: Option<String>,
    #[serde(default)]
    provider_states: Vec<ProviderState>,
    #[serde(default)]
    request: Request,
    #[serde(default)]
    response: Response,
}

impl From<InteractionDocument> for Interaction {
    fn from(doc: InteractionDocument) -> Self {
        let mut provider_states = doc.provider_states;
        if provider_states.is_empty() {
            if let Some(state) = doc.provider_state.filter(|s| !s.is_empty()) {
                provider_states.push(ProviderState::new(state));
            }
        }
        Self {
            description: doc.description,
            provider_states,
            request: doc.request,
            response: doc.response,
        }
    }
}

/// HTTP request in an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,
    /// Request path
    #[serde(default = "default_path")]
    pub path: String,
    /// Query parameters
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_query"
    )]
    pub query: MultiMap,
    /// Request headers
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        serialize_with = "serialize_headers",
        deserialize_with = "deserialize_headers"
    )]
    pub headers: MultiMap,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Matching rules
    #[serde(default, skip_serializing_if = "MatchingRules::is_empty")]
    pub matching_rules: MatchingRules,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: default_method(),
            path: default_path(),
            query: MultiMap::new(),
            headers: MultiMap::new(),
            body: None,
            matching_rules: MatchingRules::default(),
        }
    }
}

impl Request {
    /// The declared `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        content_type(&self.headers)
    }

    /// The body as sent on the wire. See [`encode_body`].
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.body.as_ref().map(|body| encode_body(body, self.content_type()))
    }
}

/// HTTP response in an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,
    /// Response headers
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        serialize_with = "serialize_headers",
        deserialize_with = "deserialize_headers"
    )]
    pub headers: MultiMap,
    /// Response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Matching rules
    #[serde(default, skip_serializing_if = "MatchingRules::is_empty")]
    pub matching_rules: MatchingRules,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: MultiMap::new(),
            body: None,
            matching_rules: MatchingRules::default(),
        }
    }
}

impl Response {
    /// The declared `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        content_type(&self.headers)
    }

    /// The body as sent on the wire. See [`encode_body`].
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.body.as_ref().map(|body| encode_body(body, self.content_type()))
    }
}

/// Encode a body for the wire. A string under a non-JSON (or absent)
/// content type is raw text; everything else is serialized JSON.
#[must_use]
pub fn encode_body(body: &Value, content_type: Option<&str>) -> String {
    match body {
        Value::String(text) if !content_type.is_some_and(is_json_content_type) => text.clone(),
        json => json.to_string(),
    }
}

/// Contract metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PactMetadata {
    /// Pact specification version
    #[serde(rename = "pactSpecification", alias = "pact-specification")]
    pub pact_specification: PactSpecification,
    /// Other metadata carried through unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Pact specification version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PactSpecification {
    /// Version string
    pub version: String,
}

impl Default for PactMetadata {
    fn default() -> Self {
        Self {
            pact_specification: PactSpecification {
                version: DEFAULT_SPECIFICATION_VERSION.to_string(),
            },
            extra: BTreeMap::new(),
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

const fn default_status() -> u16 {
    200
}

fn file_safe(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
        .collect();
    let dots = safe.len() - safe.trim_start_matches('.').len();
    safe.replace_range(..dots, &"_".repeat(dots));
    safe
}

fn content_type(headers: &MultiMap) -> Option<&str> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

/// Parse a v2 query string (`a=1&b=2&a=3`) into a [`MultiMap`].
#[must_use]
pub fn parse_query_string(query: &str) -> MultiMap {
    let mut out = MultiMap::new();
    for (name, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        out.entry(name.into_owned()).or_default().push(value.into_owned());
    }
    out
}

fn string_values(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn deserialize_query<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MultiMap, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(query) => Ok(parse_query_string(&query)),
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(name, values)| (name, string_values(values)))
            .collect()),
        Value::Null => Ok(MultiMap::new()),
        other => Err(serde::de::Error::custom(format!(
            "query must be a string or an object, got {other}"
        ))),
    }
}

fn serialize_headers<S: Serializer>(headers: &MultiMap, serializer: S) -> Result<S::Ok, S::Error> {
    let joined: BTreeMap<&str, String> = headers
        .iter()
        .map(|(name, values)| (name.as_str(), values.join(", ")))
        .collect();
    joined.serialize(serializer)
}

fn deserialize_headers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MultiMap, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(name, values)| (name, string_values(values)))
            .collect()),
        Value::Null => Ok(MultiMap::new()),
        other => Err(serde::de::Error::custom(format!(
            "headers must be an object, got {other}"
        ))),
    }
}
