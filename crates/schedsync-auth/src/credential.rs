use serde::Deserialize;
use schedsync_core::AuthError;

use crate::store::CredentialStore;

/// Display name used when the profile carries none.
pub const DEFAULT_NAME: &str = "Unknown User";

/// Email used when the token payload carries none.
pub const DEFAULT_EMAIL: &str = "unknown@kse.org.ua";

/// Session credential for one sync run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub name: String,
    pub email: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish()
    }
}

/// Auth document as written by the schedule site.
#[derive(Debug, Deserialize)]
struct AuthDocument {
    #[serde(default)]
    user: Option<StoredUser>,
    #[serde(default, rename = "jwtPayload")]
    jwt_payload: Option<JwtPayload>,
}

#[derive(Debug, Deserialize)]
struct StoredUser {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtPayload {
    #[serde(default)]
    email: Option<String>,
}

/// Empty strings count as missing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl Credential {
    /// Parse the raw auth document.
    ///
    /// A missing or empty token is `AuthError::MissingToken`; any other
    /// shape problem is `AuthError::MalformedCredential`. Name and email
    /// fall back to [`DEFAULT_NAME`] and [`DEFAULT_EMAIL`].
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let doc: AuthDocument = serde_json::from_str(raw)
            .map_err(|e| AuthError::MalformedCredential(e.to_string()))?;

        let user = doc
            .user
            .ok_or_else(|| AuthError::MalformedCredential("missing `user`".to_string()))?;

        let token = non_empty(user.token).ok_or(AuthError::MissingToken)?;

        let name = non_empty(user.profile.and_then(|p| p.name))
            .unwrap_or_else(|| DEFAULT_NAME.to_string());

        let jwt_payload = doc
            .jwt_payload
            .ok_or_else(|| AuthError::MalformedCredential("missing `jwtPayload`".to_string()))?;

        let email = non_empty(jwt_payload.email).unwrap_or_else(|| DEFAULT_EMAIL.to_string());

        Ok(Self { token, name, email })
    }

    /// Read and parse the credential stored under `key`.
    pub fn load(store: &dyn CredentialStore, key: &str) -> Result<Self, AuthError> {
        let raw = store
            .get(key)?
            .ok_or_else(|| AuthError::NotLoggedIn(key.to_string()))?;

        Self::parse(&raw)
    }
}
