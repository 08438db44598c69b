//! User profile types and photo normalization.
//!
//! The identity API is not consistent about where the profile photo lives: some
//! responses carry `user.image`, sign-in/register may instead return a sibling
//! `userPic`, and `/me` may omit it entirely. [`normalize`] folds those shapes
//! into the single `image` field the rest of the app reads.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Server-assigned identifier; the API returns either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Self(text),
            Repr::Number(number) => Self(number.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "paciente")]
    Patient,
    #[serde(alias = "medico")]
    Doctor,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "patient" | "paciente" => Ok(Self::Patient),
            "doctor" | "medico" => Ok(Self::Doctor),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A user exactly as decoded from the API, before photo normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Any other profile fields (phone, specialty, ...), carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical user snapshot held by the session and persisted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Profile photo URL, empty when none is known.
    #[serde(default)]
    pub image: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<User> for RawUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            image: Some(user.image),
            extra: user.extra,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolves the canonical `image`: the user's own `image` wins, then the
/// sibling `user_pic`, then `fallback` (usually the locally known value), then
/// the empty string. Empty strings count as absent at every step.
#[must_use]
pub fn normalize(raw: &RawUser, user_pic: Option<&str>, fallback: Option<&str>) -> User {
    let image = non_empty(raw.image.as_deref())
        .or_else(|| non_empty(user_pic))
        .or_else(|| non_empty(fallback))
        .unwrap_or_default()
        .to_string();

    User {
        id: raw.id.clone(),
        name: raw.name.clone(),
        email: raw.email.clone(),
        role: raw.role,
        image,
        extra: raw.extra.clone(),
    }
}
