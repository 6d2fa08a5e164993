use std::fmt;
use std::str::FromStr;

/// Lifecycle of the hub connection, published by
/// [`SyncChannel::state`](crate::SyncChannel::state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Handshake done. `joined` is whether any area group is joined.
    Connected { joined: bool },
    /// Waiting before (or performing) reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Hub group a client joins to receive change broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Area {
    #[default]
    Home,
    Admin,
}

impl Area {
    pub fn join_target(self) -> &'static str {
        match self {
            Self::Home => "Join",
            Self::Admin => "JoinAdmin",
        }
    }

    pub fn leave_target(self) -> &'static str {
        match self {
            Self::Home => "Leave",
            Self::Admin => "LeaveAdmin",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("home"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown area '{0}' (expected 'home' or 'admin')")]
pub struct UnknownArea(pub String);

impl FromStr for Area {
    type Err = UnknownArea;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownArea(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_targets() {
        assert_eq!(Area::Home.join_target(), "Join");
        assert_eq!(Area::Admin.leave_target(), "LeaveAdmin");
    }

    #[test]
    fn area_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Area>().unwrap(), Area::Admin);
        assert_eq!(" home ".parse::<Area>().unwrap(), Area::Home);
        assert!("lobby".parse::<Area>().is_err());
    }
}
