use crate::session::user::{RawUser, Role};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Body of the login request. The password is only exposed while serializing.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

/// Body of the registration request.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    pub role: Role,
    /// Additional profile fields accepted by the backend (phone, specialty, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Login/register response after decoding.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: RawUser,
    pub token: SecretString,
    /// Photo URL some backends return next to, rather than inside, `user`.
    pub user_pic: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct AuthResponseWire {
    pub(super) user: RawUser,
    pub(super) token: String,
    #[serde(default, rename = "userPic")]
    pub(super) user_pic: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct MeResponse {
    pub(super) user: RawUser,
}
