//! Matching engine.
//!
//! Compares observed HTTP requests and responses against the expectations of
//! a pact interaction and reports every difference as a [`Mismatch`].
//! Matching is pure: the same inputs always produce the same mismatches in
//! the same order.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod body;
pub mod datetime;
pub mod http;
pub mod mismatch;
pub mod rules;

pub use body::{compare_value, match_body};
pub use http::{
    ObservedRequest, ObservedResponse, RouteMatch, match_headers, match_path, match_query,
    match_request, match_response, route_match,
};
pub use mismatch::{Mismatch, MismatchKind};
