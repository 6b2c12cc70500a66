//! Pact contract model.
//!
//! Provides the pact document types, matching rules addressed by path
//! expressions, and the handle-based registry consumers build pacts in.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod error;
pub mod integration_json;
pub mod matching_rules;
pub mod path;
pub mod registry;

pub use contract::{
    DEFAULT_SPECIFICATION_VERSION, Interaction, MultiMap, Pact, PactMetadata, PactSpecification,
    Participant, ProviderState, Request, Response, encode_body, parse_query_string,
};
pub use error::{ModelError, ModelResult};
pub use matching_rules::{ArrayVariant, Category, MatchingRule, MatchingRules, RuleList, RuleLogic};
pub use path::{DocPath, PathToken};
pub use registry::{
    InteractionHandle, InteractionPart, MAX_VALUE_INDEX, ModelRegistry, PactHandle, is_json_content_type,
};
