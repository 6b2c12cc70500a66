//! Handle-based model registry.
//!
//! Pacts live in an arena indexed by [`PactHandle`]; interactions are
//! addressed by an [`InteractionHandle`] pairing the pact slot with the
//! interaction's position in that pact. Slot numbers start at 1 so the zero
//! value is always invalid. Removed pact slots are never reused, so a stale
//! handle can only miss, never alias a newer pact.

use crate::contract::{Interaction, Pact, ProviderState};
use crate::error::ModelResult;
use crate::integration_json::{extract_body, extract_text};
use crate::matching_rules::{Category, MatchingRules};
use serde_json::Value;
use tracing::{debug, warn};

/// Opaque reference to a pact in a [`ModelRegistry`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PactHandle {
    /// 1-based pact slot; 0 is invalid
    pub pact: u32,
}

impl PactHandle {
    /// The invalid handle.
    pub const INVALID: Self = Self { pact: 0 };

    /// Whether this is the invalid handle.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.pact == 0
    }
}

/// Opaque reference to an interaction in a [`ModelRegistry`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InteractionHandle {
    /// 1-based pact slot; 0 is invalid
    pub pact: u32,
    /// 1-based interaction position in the pact; 0 is invalid
    pub interaction: u32,
}

impl InteractionHandle {
    /// The invalid handle.
    pub const INVALID: Self = Self {
        pact: 0,
        interaction: 0,
    };

    /// Whether this is the invalid handle.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.pact == 0 || self.interaction == 0
    }

    /// The handle of the owning pact.
    #[must_use]
    pub const fn pact_handle(self) -> PactHandle {
        PactHandle { pact: self.pact }
    }
}

/// Which side of an interaction a setter addresses.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionPart {
    /// The expected request
    Request = 0,
    /// The expected response
    Response = 1,
}

/// Largest value position accepted by the indexed query and header setters.
pub const MAX_VALUE_INDEX: usize = 255;

/// Arena of pacts under construction.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    pacts: Vec<Option<Pact>>,
}

fn slot(id: u32) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

impl ModelRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live pacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pacts.iter().flatten().count()
    }

    /// Whether no pact is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a pact. Empty participant names yield [`PactHandle::INVALID`].
    pub fn new_pact(&mut self, consumer: &str, provider: &str) -> PactHandle {
        if consumer.is_empty() || provider.is_empty() {
            warn!(consumer, provider, "refusing pact with an empty participant name");
            return PactHandle::INVALID;
        }
        self.insert_pact(Pact::new(consumer, provider))
    }

    /// Register an existing pact document.
    pub fn insert_pact(&mut self, pact: Pact) -> PactHandle {
        let Ok(id) = u32::try_from(self.pacts.len() + 1) else {
            warn!("pact registry is full");
            return PactHandle::INVALID;
        };
        debug!(pact = id, consumer = %pact.consumer.name, provider = %pact.provider.name, "registered pact");
        self.pacts.push(Some(pact));
        PactHandle { pact: id }
    }

    /// Remove a pact, returning it.
    pub fn remove_pact(&mut self, handle: PactHandle) -> Option<Pact> {
        self.pacts.get_mut(slot(handle.pact)?)?.take()
    }

    /// Look up a pact.
    #[must_use]
    pub fn pact(&self, handle: PactHandle) -> Option<&Pact> {
        self.pacts.get(slot(handle.pact)?)?.as_ref()
    }

    /// Look up a pact for mutation.
    pub fn pact_mut(&mut self, handle: PactHandle) -> Option<&mut Pact> {
        self.pacts.get_mut(slot(handle.pact)?)?.as_mut()
    }

    /// Append an interaction to a pact.
    pub fn new_interaction(&mut self, pact: PactHandle, description: &str) -> InteractionHandle {
        let Some(target) = self.pact_mut(pact) else {
            return InteractionHandle::INVALID;
        };
        let Ok(id) = u32::try_from(target.interactions.len() + 1) else {
            return InteractionHandle::INVALID;
        };
        target.interactions.push(Interaction::new(description));
        InteractionHandle {
            pact: pact.pact,
            interaction: id,
        }
    }

    /// Look up an interaction. Handles whose interaction position is not
    /// owned by the referenced pact miss.
    #[must_use]
    pub fn interaction(&self, handle: InteractionHandle) -> Option<&Interaction> {
        self.pact(handle.pact_handle())?
            .interactions
            .get(slot(handle.interaction)?)
    }

    /// Look up an interaction for mutation.
    pub fn interaction_mut(&mut self, handle: InteractionHandle) -> Option<&mut Interaction> {
        let position = slot(handle.interaction)?;
        self.pact_mut(handle.pact_handle())?
            .interactions
            .get_mut(position)
    }

    fn update(
        &mut self,
        handle: InteractionHandle,
        f: impl FnOnce(&mut Interaction) -> bool,
    ) -> bool {
        match self.interaction_mut(handle) {
            Some(interaction) => f(interaction),
            None => {
                debug!(?handle, "ignoring update through an invalid interaction handle");
                false
            }
        }
    }

    /// Add a provider state.
    pub fn given(&mut self, handle: InteractionHandle, state: &str) -> bool {
        self.update(handle, |interaction| {
            interaction.provider_states.push(ProviderState::new(state));
            true
        })
    }

    /// Add a parameter to a provider state, declaring the state if needed.
    ///
    /// `value` is stored as JSON when it parses as JSON and as a string
    /// otherwise.
    pub fn given_with_param(
        &mut self,
        handle: InteractionHandle,
        state: &str,
        name: &str,
        value: &str,
    ) -> bool {
        self.update(handle, |interaction| {
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            let states = &mut interaction.provider_states;
            let index = match states.iter().rposition(|s| s.name == state) {
                Some(index) => index,
                None => {
                    states.push(ProviderState::new(state));
                    states.len() - 1
                }
            };
            states[index].params.insert(name.to_string(), value);
            true
        })
    }

    /// Set the interaction description.
    pub fn upon_receiving(&mut self, handle: InteractionHandle, description: &str) -> bool {
        self.update(handle, |interaction| {
            interaction.description = description.to_string();
            true
        })
    }

    /// Set the expected request method and path. The path may hold an
    /// embedded matcher.
    pub fn with_request(&mut self, handle: InteractionHandle, method: &str, path: &str) -> bool {
        self.update(handle, |interaction| {
            let request = &mut interaction.request;
            match extract_text(path, Category::Path, "", &mut request.matching_rules) {
                Ok(path) => {
                    request.method = method.to_ascii_uppercase();
                    request.path = path;
                    true
                }
                Err(err) => {
                    warn!(error = %err, "invalid path matcher");
                    false
                }
            }
        })
    }

    /// Set the value at `index` of a query parameter, padding earlier
    /// positions with empty strings. Indexes above [`MAX_VALUE_INDEX`] are
    /// rejected.
    pub fn with_query_parameter(
        &mut self,
        handle: InteractionHandle,
        name: &str,
        index: usize,
        value: &str,
    ) -> bool {
        if !index_in_range(name, index) {
            return false;
        }
        self.update(handle, |interaction| {
            let request = &mut interaction.request;
            match extract_text(value, Category::Query, name, &mut request.matching_rules) {
                Ok(value) => {
                    set_indexed(request.query.entry(name.to_string()).or_default(), index, value);
                    true
                }
                Err(err) => {
                    warn!(error = %err, name, "invalid query matcher");
                    false
                }
            }
        })
    }

    /// Set the value at `index` of a request or response header. Indexes
    /// above [`MAX_VALUE_INDEX`] are rejected.
    pub fn with_header(
        &mut self,
        handle: InteractionHandle,
        part: InteractionPart,
        name: &str,
        index: usize,
        value: &str,
    ) -> bool {
        if !index_in_range(name, index) {
            return false;
        }
        self.update(handle, |interaction| {
            let (headers, rules) = match part {
                InteractionPart::Request => (
                    &mut interaction.request.headers,
                    &mut interaction.request.matching_rules,
                ),
                InteractionPart::Response => (
                    &mut interaction.response.headers,
                    &mut interaction.response.matching_rules,
                ),
            };
            match extract_text(value, Category::Header, name, rules) {
                Ok(value) => {
                    set_indexed(headers.entry(name.to_string()).or_default(), index, value);
                    true
                }
                Err(err) => {
                    warn!(error = %err, name, "invalid header matcher");
                    false
                }
            }
        })
    }

    /// Set a request or response body.
    ///
    /// JSON bodies (by content type, or any body when the content type is
    /// empty and the text parses as JSON) may embed matchers; other bodies
    /// are stored as text. The content type is recorded as a header unless
    /// one is already declared.
    pub fn with_body(
        &mut self,
        handle: InteractionHandle,
        part: InteractionPart,
        content_type: &str,
        body: &str,
    ) -> bool {
        self.update(handle, |interaction| {
            let (headers, rules, target) = match part {
                InteractionPart::Request => (
                    &mut interaction.request.headers,
                    &mut interaction.request.matching_rules,
                    &mut interaction.request.body,
                ),
                InteractionPart::Response => (
                    &mut interaction.response.headers,
                    &mut interaction.response.matching_rules,
                    &mut interaction.response.body,
                ),
            };
            match parse_body(content_type, body, rules) {
                Ok(value) => *target = value,
                Err(err) => {
                    warn!(error = %err, content_type, "rejecting body");
                    return false;
                }
            }

            let has_content_type = headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
            let structured = matches!(target, Some(Value::Object(_) | Value::Array(_)));
            let content_type = if content_type.is_empty() && structured {
                "application/json"
            } else {
                content_type
            };
            if !has_content_type && !content_type.is_empty() {
                headers.insert("Content-Type".to_string(), vec![content_type.to_string()]);
            }
            true
        })
    }

    /// Set the expected response status.
    pub fn response_status(&mut self, handle: InteractionHandle, status: u16) -> bool {
        self.update(handle, |interaction| {
            interaction.response.status = status;
            true
        })
    }
}

/// Whether a content type denotes a JSON body.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn parse_body(content_type: &str, body: &str, rules: &mut MatchingRules) -> ModelResult<Option<Value>> {
    if body.is_empty() {
        return Ok(None);
    }
    let json = if is_json_content_type(content_type) {
        Some(serde_json::from_str::<Value>(body)?)
    } else if content_type.is_empty() {
        serde_json::from_str::<Value>(body).ok()
    } else {
        None
    };

    match json {
        Some(json) => extract_body(&json, rules).map(Some),
        None => Ok(Some(Value::String(body.to_string()))),
    }
}

fn index_in_range(name: &str, index: usize) -> bool {
    if index > MAX_VALUE_INDEX {
        warn!(name, index, max = MAX_VALUE_INDEX, "value index out of range");
        return false;
    }
    true
}

fn set_indexed(values: &mut Vec<String>, index: usize, value: String) {
    if values.len() <= index {
        values.resize(index + 1, String::new());
    }
    values[index] = value;
}
