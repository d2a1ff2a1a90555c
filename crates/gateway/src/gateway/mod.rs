//! Request routing and response shaping for the data API.
//!
//! - path: classifies request paths and extracts route parameters
//! - response: merges storage rows into response envelopes

pub mod path;
pub mod response;

pub use path::{Route, RouteKind, RouteParams, SUPPORTED_VERSION, classify, parse_listener_ids};
pub use response::{
    SchemaResponse, category_envelope, listener_envelope, response_time, target_object,
};
