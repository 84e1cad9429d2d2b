//! Token payload decoding and role-claim normalization.
//!
//! The bearer token is a three-segment JWT. Only the middle segment is
//! consulted, and only after base64url decoding; the signature is never
//! checked here. Any malformed segment, bad padding or non-object payload
//! yields `None` from [`decode_payload`], which callers turn into an empty
//! role set or an expired session.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Claim fields of a role object, in lookup order.
const ROLE_NAME_FIELDS: [&str; 5] = ["name", "code", "role", "authority", "value"];

/// The shapes the `roles` claim is known to take.
///
/// Resolved through the single [`normalize_roles`] function; no other code
/// branches on the claim shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleClaim {
    /// A single string, possibly comma-separated (`"ADMIN,LAB"`).
    Single(String),
    /// An array of strings.
    StringList(Vec<String>),
    /// An array of objects carrying the role name in one of
    /// `name` / `code` / `role` / `authority` / `value`.
    ObjectList(Vec<Map<String, Value>>),
}

impl RoleClaim {
    /// Classify a raw claim value, or `None` if the shape is unusable.
    pub fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Single(s.clone())),
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    Some(Self::StringList(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    ))
                } else {
                    Some(Self::ObjectList(
                        items
                            .iter()
                            .filter_map(Value::as_object)
                            .cloned()
                            .collect(),
                    ))
                }
            }
            _ => None,
        }
    }
}

/// Decode the payload segment of a bearer token into a claim object.
///
/// Returns `None` for anything other than a well-formed token whose middle
/// segment is base64url-encoded JSON object text.
pub fn decode_payload(token: &str) -> Option<Map<String, Value>> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;

    // Tolerate tokens that arrive with padding attached.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) | Err(_) => {
            tracing::debug!("token payload is not a JSON object");
            None
        }
    }
}

/// Normalize a role claim into an uppercased, de-duplicated,
/// first-occurrence-ordered list.
pub fn normalize_roles(claim: RoleClaim) -> Vec<String> {
    let raw: Vec<String> = match claim {
        RoleClaim::Single(s) => s.split(',').map(str::to_string).collect(),
        RoleClaim::StringList(items) => items,
        RoleClaim::ObjectList(objects) => objects
            .iter()
            .filter_map(|obj| {
                ROLE_NAME_FIELDS
                    .iter()
                    .find_map(|field| obj.get(*field).and_then(Value::as_str))
                    .map(str::to_string)
            })
            .collect(),
    };

    let mut roles: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let role = entry.trim().to_uppercase();
        if !role.is_empty() && !roles.contains(&role) {
            roles.push(role);
        }
    }
    roles
}

/// Extract the normalized role set from a bearer token.
///
/// A missing or malformed `roles` claim yields an empty set; decoding
/// problems never escape as errors.
pub fn roles_from_token(token: &str) -> Vec<String> {
    decode_payload(token)
        .and_then(|claims| claims.get("roles").and_then(RoleClaim::classify))
        .map(normalize_roles)
        .unwrap_or_default()
}

/// Read the `exp` claim (seconds since epoch) from a bearer token.
///
/// Returns `None` when the claim is missing or unparseable; callers treat
/// that as already expired (fail-closed).
pub fn expires_at(token: &str) -> Option<OffsetDateTime> {
    let claims = decode_payload(token)?;
    let exp = claims.get("exp")?;
    let seconds = match exp {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    OffsetDateTime::from_unix_timestamp(seconds).ok()
}
