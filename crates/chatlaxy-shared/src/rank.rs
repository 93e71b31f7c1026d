//! The closed rank classification and its display attributes.
//!
//! Rank is assigned exactly once, at account creation, and nothing in this
//! client revises it afterwards. Modeling it as an enum with total matches
//! means adding a rank is a compile-time-checked change everywhere it is
//! rendered or parsed.

use serde::{Deserialize, Serialize};

use crate::constants::RESERVED_DEVELOPER_NAME;

/// Privilege/status classification of a profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Rank {
    #[serde(rename = "User")]
    User,
    #[serde(rename = "VIP")]
    Vip,
    #[serde(rename = "Super-VIP")]
    SuperVip,
    #[serde(rename = "Owner")]
    Owner,
    #[serde(rename = "Developer")]
    Developer,
}

/// Display attributes for a rank badge.
///
/// `accent` is a color keyword the presentation layer maps to its theme;
/// `badge` is an icon name, `None` for plain users (no badge is drawn).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RankStyle {
    pub accent: &'static str,
    pub badge: Option<&'static str>,
}

impl Rank {
    /// Rank granted at signup: the reserved display name yields `Developer`,
    /// anything else starts as a plain `User`.
    pub fn for_signup(display_name: &str) -> Self {
        if display_name == RESERVED_DEVELOPER_NAME {
            Rank::Developer
        } else {
            Rank::User
        }
    }

    /// Wire representation, matching the stored `rank` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::User => "User",
            Rank::Vip => "VIP",
            Rank::SuperVip => "Super-VIP",
            Rank::Owner => "Owner",
            Rank::Developer => "Developer",
        }
    }

    /// Parse the wire representation.
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "User" => Some(Rank::User),
            "VIP" => Some(Rank::Vip),
            "Super-VIP" => Some(Rank::SuperVip),
            "Owner" => Some(Rank::Owner),
            "Developer" => Some(Rank::Developer),
            _ => None,
        }
    }

    /// Total mapping from rank to display attributes.
    pub fn style(self) -> RankStyle {
        match self {
            Rank::Developer => RankStyle {
                accent: "red",
                badge: Some("code"),
            },
            Rank::Owner => RankStyle {
                accent: "gold",
                badge: Some("crown"),
            },
            Rank::SuperVip => RankStyle {
                accent: "pink",
                badge: Some("zap"),
            },
            Rank::Vip => RankStyle {
                accent: "purple",
                badge: Some("shield"),
            },
            Rank::User => RankStyle {
                accent: "slate",
                badge: None,
            },
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
