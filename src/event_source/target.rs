//! Persistence identity of a stream target.

use std::fmt;

use url::Url;

/// Prefix of every key written to a [`LastEventIdStore`](crate::traits::LastEventIdStore).
pub const STORE_KEY_PREFIX: &str = "eventsource.lastEventId";

/// Port used when a URL has neither an explicit nor a known default port.
const FALLBACK_PORT: u16 = 80;

/// Identity of a stream target: scheme, host, port and path.
///
/// Two event sources pointing at the same target share a resumption point;
/// any difference in these components gives an independent one. Query and
/// fragment are not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    identity: String,
}

impl TargetKey {
    /// Derive the key for `url`.
    pub fn from_url(url: &Url) -> Self {
        let port = url.port_or_known_default().unwrap_or(FALLBACK_PORT);
        let identity = format!(
            "{}.{}.{}.{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            port,
            url.path()
        );
        Self { identity }
    }

    /// The `<scheme>.<host>.<port>.<path>` identity string.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The namespaced key under which the last event id is stored.
    pub fn store_key(&self) -> String {
        format!("{}.{}", STORE_KEY_PREFIX, self.identity)
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}
