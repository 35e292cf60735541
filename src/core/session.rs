//! Session state and login credentials.
//!
//! A [`Session`] is the set of cookies handed out by `POST /auth/login`.
//! It is either fully valid or fully invalid; replacing it simply drops
//! the old cookies (nothing is revoked remotely).

use std::fmt;

/// Username/password pair used for the login exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Never print the password, not even at trace level.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A single `name=value` cookie pair captured from a `Set-Cookie` header.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    /// Parse the leading `name=value` pair of a `Set-Cookie` header value.
    ///
    /// Attributes after the first `;` (Path, Expires, HttpOnly, ...) are ignored.
    #[must_use]
    pub fn parse_set_cookie(header: &str) -> Option<Self> {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Authentication state shared by every outbound call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<SessionCookie>,
    valid: bool,
}

impl Session {
    /// A fresh, valid session holding the given cookies.
    #[must_use]
    pub const fn new(cookies: Vec<SessionCookie>) -> Self {
        Self {
            cookies,
            valid: true,
        }
    }

    /// The empty session the service starts with.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            cookies: Vec::new(),
            valid: false,
        }
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Drop all tokens; the next call must log in again.
    pub fn invalidate(&mut self) {
        self.cookies.clear();
        self.valid = false;
    }

    #[must_use]
    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// Render the cookies as a `Cookie` request header value.
    ///
    /// Returns `None` when there is nothing to attach.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("valid", &self.valid)
            .field("cookies", &self.cookies.len())
            .finish()
    }
}
