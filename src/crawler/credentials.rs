//! Session credentials taken from a browser cookie

use crate::CredentialsError;

/// Cookie plus the CSRF token the service expects to be echoed in a header
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    cookie: String,
    csrf_token: String,
}

impl Credentials {
    /// Parses a raw `name=value; name=value` cookie string
    ///
    /// Both `auth_token` and `ct0` must be present and non-empty; `ct0`
    /// becomes the CSRF token.
    pub fn from_cookie(cookie: &str) -> Result<Self, CredentialsError> {
        let mut has_auth_token = false;
        let mut csrf_token = None;

        for pair in cookie.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match name.trim() {
                "auth_token" => has_auth_token = true,
                "ct0" => csrf_token = Some(value.to_string()),
                _ => {}
            }
        }

        if !has_auth_token {
            return Err(CredentialsError::MissingField("auth_token"));
        }
        let csrf_token = csrf_token.ok_or(CredentialsError::MissingField("ct0"))?;

        Ok(Self {
            cookie: cookie.trim().to_string(),
            csrf_token,
        })
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

// Keeps session secrets out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}
