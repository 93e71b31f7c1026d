use serde::{Deserialize, Serialize};

// User identity = opaque id assigned by the identity service at account
// creation. Doubles as the profile document id in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProfileId(pub String);

impl ProfileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Online/offline classification of a profile.
///
/// Derived from heartbeat recency by the reader; the `status` field a profile
/// document carries is never the source of truth because a session can die
/// without writing a final offline state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Online => "online",
            Presence::Offline => "offline",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "online" => Some(Presence::Online),
            "offline" => Some(Presence::Offline),
            _ => None,
        }
    }

    pub fn is_online(self) -> bool {
        self == Presence::Online
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_id_short() {
        let id = ProfileId::from("0123456789abcdef");
        assert_eq!(id.short(), "01234567");

        let tiny = ProfileId::from("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_presence_round_trip() {
        assert_eq!(Presence::from_str("online"), Some(Presence::Online));
        assert_eq!(Presence::from_str("offline"), Some(Presence::Offline));
        assert_eq!(Presence::from_str("away"), None);
        assert_eq!(Presence::Online.as_str(), "online");
        assert!(Presence::Online.is_online());
        assert!(!Presence::Offline.is_online());
    }
}
