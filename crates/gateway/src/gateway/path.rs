//! Request path classification.
//!
//! Recognised shapes, most specific first:
//! - `/v{version}/{category}/schema`
//! - `/v{version}/{category}/{uuid}`
//! - `/v{version}/{category}`
//! - `/api/v{version}/listener/{id}[/{id}...]`

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};

/// The only API version served.
pub const SUPPORTED_VERSION: &str = "1";

/// Canonical 8-4-4-4-12 hexadecimal identifier.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static TARGET_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("valid regex literal")
});

/// Which handler a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    CategoryQuery,
    SchemaLookup,
    TargetLookup,
    SingleListener,
    MultiListener,
}

impl RouteKind {
    /// Stable label, used for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CategoryQuery => "category_query",
            Self::SchemaLookup => "schema_lookup",
            Self::TargetLookup => "target_lookup",
            Self::SingleListener => "single_listener",
            Self::MultiListener => "multi_listener",
        }
    }
}

/// Parameters extracted from the path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub version: String,
    pub category: Option<String>,
    pub target_id: Option<Uuid>,
    pub listener_ids: Vec<String>,
}

/// A classified request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub kind: RouteKind,
    pub params: RouteParams,
}

/// Classify a raw (percent-encoded) request path.
///
/// Paths that match no shape are `NotFound`; paths that match a shape but
/// carry an unsupported version, a malformed target id or no listener ids
/// are `BadRequest`.
pub fn classify(path: &str) -> GatewayResult<Route> {
    if path.starts_with("/api/") {
        return classify_listener(path);
    }

    let mut segments: Vec<&str> = path.split('/').skip(1).collect();
    // Tolerate a single trailing slash
    if segments.len() > 1 && segments.last() == Some(&"") {
        segments.pop();
    }

    match segments.as_slice() {
        [version, category] => {
            let version = parse_version(version)?;
            let category = decode_segment(category)?;
            Ok(Route {
                kind: RouteKind::CategoryQuery,
                params: RouteParams {
                    version,
                    category: Some(category),
                    ..Default::default()
                },
            })
        }
        [version, category, "schema"] => {
            let version = parse_version(version)?;
            let category = decode_segment(category)?;
            Ok(Route {
                kind: RouteKind::SchemaLookup,
                params: RouteParams {
                    version,
                    category: Some(category),
                    ..Default::default()
                },
            })
        }
        [version, category, id] => {
            let version = parse_version(version)?;
            let category = decode_segment(category)?;
            let target_id = parse_target_id(id)?;
            Ok(Route {
                kind: RouteKind::TargetLookup,
                params: RouteParams {
                    version,
                    category: Some(category),
                    target_id: Some(target_id),
                    ..Default::default()
                },
            })
        }
        _ => Err(route_not_found()),
    }
}

fn classify_listener(path: &str) -> GatewayResult<Route> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 5 || parts[1] != "api" || parts[3] != "listener" {
        return Err(route_not_found());
    }

    let version = parse_version(parts[2])?;
    let listener_ids = parse_listener_ids(path)
        .ok_or_else(|| GatewayError::bad_request("Invalid listener path"))?;

    let kind = if listener_ids.len() == 1 {
        RouteKind::SingleListener
    } else {
        RouteKind::MultiListener
    };

    Ok(Route {
        kind,
        params: RouteParams {
            version,
            listener_ids,
            ..Default::default()
        },
    })
}

/// Extract listener ids from `/api/v{version}/listener/{id}/{id}/...`.
///
/// Ids keep their path order. Empty segments are dropped; `None` means the
/// path is not a listener path or names no listener at all.
pub fn parse_listener_ids(path: &str) -> Option<Vec<String>> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 5 || parts[1] != "api" || parts[3] != "listener" {
        return None;
    }

    let ids: Vec<String> = parts[4..]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| decode_segment(s))
        .collect::<GatewayResult<_>>()
        .ok()?;

    if ids.is_empty() { None } else { Some(ids) }
}

/// `v1` → `"1"`; anything else that starts with `v` is an unsupported version.
fn parse_version(segment: &str) -> GatewayResult<String> {
    let Some(version) = segment.strip_prefix('v') else {
        return Err(route_not_found());
    };

    if version != SUPPORTED_VERSION {
        return Err(GatewayError::bad_request("Only version 1 is supported"));
    }

    Ok(version.to_string())
}

fn parse_target_id(segment: &str) -> GatewayResult<Uuid> {
    if !TARGET_ID.is_match(segment) {
        return Err(GatewayError::bad_request(
            "Invalid target_id format. Must be a valid UUID.",
        ));
    }

    Uuid::parse_str(segment).map_err(|_| {
        GatewayError::bad_request("Invalid target_id format. Must be a valid UUID.")
    })
}

fn decode_segment(segment: &str) -> GatewayResult<String> {
    if segment.is_empty() {
        return Err(route_not_found());
    }

    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| GatewayError::bad_request("path segment is not valid UTF-8"))
}

fn route_not_found() -> GatewayError {
    GatewayError::not_found("route not found")
}
