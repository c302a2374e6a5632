//! Router core module - request path to object address.

use crate::error::DispatchError;
use std::fmt;
use tracing::debug;

/// Path separator used both in request paths and object addresses.
pub const SEPARATOR: char = '/';

/// Prefix that marks an action as private. Such actions are never reachable.
pub const PRIVATE_ACTION_PREFIX: &str = "__";

/// Minimum number of `/`-separated components in a dispatchable path:
/// `["", urltype, scheme, segment, action]`.
pub const MIN_PATH_COMPONENTS: usize = 5;

/// Which surface the request addressed (`/api/...` or `/view/...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UrlType {
    Api,
    View,
    /// Any other leading component; rejected by the dispatcher.
    Other(String),
}

impl UrlType {
    fn parse(component: &str) -> Self {
        match component {
            "api" => UrlType::Api,
            "view" => UrlType::View,
            other => UrlType::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            UrlType::Api => "api",
            UrlType::View => "view",
            UrlType::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of parsing a request path.
///
/// `collection_path` is the full object address (`name://Users/u1`); `action` is
/// empty when the request only asks for the object's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAddress {
    /// The raw request path this address was parsed from
    pub url: String,
    pub url_type: UrlType,
    /// Address scheme (`system`, `name`, ...); not validated here
    pub scheme: String,
    /// Full object address: `scheme + "://" + interior segments`
    pub collection_path: String,
    /// Action name, or empty for "describe self"
    pub action: String,
}

impl ObjectAddress {
    /// `true` when no action was requested.
    #[inline]
    #[must_use]
    pub fn is_describe(&self) -> bool {
        self.action.is_empty()
    }
}

/// Check an action name against the public-action naming policy.
///
/// Empty names are allowed (they mean "no action"). Names starting with the
/// private prefix or with a lower-case character are rejected so internal
/// helpers can never be reached through an address.
pub fn validate_action_name(action: &str) -> Result<(), DispatchError> {
    if action.starts_with(PRIVATE_ACTION_PREFIX) {
        return Err(DispatchError::InvalidArgument(format!(
            "path: action '{action}' is private"
        )));
    }
    if let Some(first) = action.chars().next() {
        if first.is_lowercase() {
            return Err(DispatchError::InvalidArgument(format!(
                "path: action '{action}' is not public"
            )));
        }
    }
    Ok(())
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Parse `/<urltype>/<scheme>/<seg1>/.../<segN>/<action>` into an [`ObjectAddress`].
///
/// # Errors
///
/// `InvalidArgument` when the path does not start with `/`, has fewer than
/// [`MIN_PATH_COMPONENTS`] components, or names an action that violates the
/// public-action policy.
pub fn parse_path(path: &str) -> Result<ObjectAddress, DispatchError> {
    let components: Vec<&str> = path.split(SEPARATOR).collect();
    if components.len() < MIN_PATH_COMPONENTS || !components[0].is_empty() {
        return Err(DispatchError::InvalidArgument(format!(
            "path: '{path}' is not an object address"
        )));
    }

    let last = components.len() - 1;
    let scheme = decode_segment(components[2]);
    let mut collection_path = format!("{scheme}:/");
    for segment in &components[3..last] {
        collection_path.push(SEPARATOR);
        collection_path.push_str(&decode_segment(segment));
    }

    let action = decode_segment(components[last]);
    validate_action_name(&action)?;

    let address = ObjectAddress {
        url: path.to_string(),
        url_type: UrlType::parse(components[1]),
        scheme,
        collection_path,
        action,
    };

    debug!(
        url_type = %address.url_type,
        object_path = %address.collection_path,
        action = %address.action,
        "Request path parsed"
    );

    Ok(address)
}
