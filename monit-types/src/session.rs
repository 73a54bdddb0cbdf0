//! ejabberd connected sessions.

/// One active session returned by ejabberd's `connected_users_info` API.
///
/// Every field falls back to its default when the server omits it or sends
/// `null`, so a partial entry still produces a session instead of failing
/// the decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectedSession {
    /// Full JID of the session (`user@host/resource`).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_default"))]
    pub jid: String,

    /// Connection type, e.g. `c2s`, `c2s_tls`, `http_bind`.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_default"))]
    pub connection: String,

    /// Client address.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_default"))]
    pub ip: String,

    /// Client port.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_default"))]
    pub port: u32,

    /// Presence priority.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_default"))]
    pub priority: i64,

    /// Erlang node serving the session.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_default"))]
    pub node: String,

    /// Seconds since the session was opened.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_default"))]
    pub uptime: u64,
}

impl ConnectedSession {
    /// Create a session with only its JID and uptime set.
    pub fn new(jid: impl Into<String>, uptime: u64) -> Self {
        Self {
            jid: jid.into(),
            uptime,
            ..Self::default()
        }
    }
}

#[cfg(feature = "serde")]
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    let value: Option<T> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
