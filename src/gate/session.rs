//! Session cookie checks.
//!
//! The gate only judges whether the session cookies are present and well
//! formed. Verifying the token itself is the origin's job.

use {
    crate::{Error, Result, SessionCookieConfig, utils::Sensitive},
    cookie::Cookie,
    http::{HeaderMap, header::COOKIE},
    serde_json::{Map, Value},
    std::fmt,
};

/// Cookies of one request, in the order they were sent.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies {
    pairs: Vec<(String, String)>,
}

impl RequestCookies {
    /// Reads every `Cookie` header. Unparsable pairs are skipped and values
    /// are percent-decoded.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::default();
        for value in headers.get_all(COOKIE) {
            match value.to_str() {
                Ok(header) => cookies.extend_from_header(header),
                Err(_) => tracing::debug!("Skipping non-ASCII Cookie header"),
            }
        }
        cookies
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn extend_from_header(&mut self, header: &str) {
        for cookie in Cookie::split_parse_encoded(header).flatten() {
            self.pairs
                .push((cookie.name().to_string(), cookie.value().to_string()));
        }
    }

    /// The first value sent for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The part of the user record cookie the gate cares about. Other fields
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
}

impl UserRecord {
    ///
    /// Parses a user record from its (already decoded) JSON form. `id` may be
    /// a JSON string or number; both `id` and `email` must be non-empty.
    ///
    /// ```
    /// use edge_gate::{ErrorKind, UserRecord};
    ///
    /// let record = UserRecord::from_json(r#"{"id": 42, "email": "a@example.com"}"#).unwrap();
    /// assert_eq!(record.id, "42");
    ///
    /// let err = UserRecord::from_json(r#"{"id": "42"}"#).unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::MalformedSessionCookie);
    /// ```
    ///
    pub fn from_json(raw: &str) -> Result<Self> {
        read_user_record(raw).map_err(|reason| Error::malformed_session_cookie(reason.as_str()))
    }
}

fn read_user_record(raw: &str) -> std::result::Result<UserRecord, InvalidReason> {
    let object: Map<String, Value> =
        serde_json::from_str(raw).map_err(|_| InvalidReason::MalformedUserRecord)?;

    let id = match object.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(InvalidReason::MissingUserId),
    };

    let email = match object.get("email") {
        Some(Value::String(email)) if !email.trim().is_empty() => email.clone(),
        _ => return Err(InvalidReason::MissingEmail),
    };

    Ok(UserRecord { id, email })
}

/// A session that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCredential {
    pub access_token: Sensitive<String>,
    pub user_record: UserRecord,
}

/// Why a session was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    MissingAccessToken,
    MissingUserRecord,
    TokenTooShort,
    MalformedUserRecord,
    MissingUserId,
    MissingEmail,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::MissingAccessToken => "access token cookie missing",
            InvalidReason::MissingUserRecord => "user record cookie missing",
            InvalidReason::TokenTooShort => "access token too short",
            InvalidReason::MalformedUserRecord => "user record is not a JSON object",
            InvalidReason::MissingUserId => "user record has no id",
            InvalidReason::MissingEmail => "user record has no email",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Valid(SessionCredential),
    /// At least one session cookie was sent but the session is unusable.
    Invalid(InvalidReason),
    /// No session cookie at all.
    Absent,
}

impl SessionStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionStatus::Valid(_))
    }

    pub fn credential(&self) -> Option<&SessionCredential> {
        match self {
            SessionStatus::Valid(credential) => Some(credential),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.credential().map(|c| c.user_record.id.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Valid(_) => "valid",
            SessionStatus::Invalid(_) => "invalid",
            SessionStatus::Absent => "absent",
        }
    }
}

/// Checks the session cookies of a request.
#[derive(Debug, Clone)]
pub struct SessionValidator {
    access_token_cookie: String,
    user_data_cookie: String,
    min_token_length: usize,
}

impl SessionValidator {
    pub fn new(config: &SessionCookieConfig) -> Self {
        Self {
            access_token_cookie: config.access_token_cookie.clone(),
            user_data_cookie: config.user_data_cookie.clone(),
            min_token_length: config.min_token_length,
        }
    }

    /// Whether the request carries a usable session.
    pub fn validate(&self, cookies: &RequestCookies) -> bool {
        self.inspect(cookies).is_valid()
    }

    ///
    /// Runs the checks in order and stops at the first failure:
    /// both cookies present, token length, user record parse, `id` and
    /// `email` present.
    ///
    pub fn inspect(&self, cookies: &RequestCookies) -> SessionStatus {
        let token = cookies.get(&self.access_token_cookie);
        let user = cookies.get(&self.user_data_cookie);

        let (token, user) = match (token, user) {
            (None, None) => return SessionStatus::Absent,
            (None, Some(_)) => return self.reject(InvalidReason::MissingAccessToken),
            (Some(_), None) => return self.reject(InvalidReason::MissingUserRecord),
            (Some(token), Some(user)) => (token, user),
        };

        if token.chars().count() < self.min_token_length {
            return self.reject(InvalidReason::TokenTooShort);
        }

        match read_user_record(user) {
            Ok(user_record) => SessionStatus::Valid(SessionCredential {
                access_token: Sensitive::from(token),
                user_record,
            }),
            Err(reason) => self.reject(reason),
        }
    }

    fn reject(&self, reason: InvalidReason) -> SessionStatus {
        tracing::debug!(reason = reason.as_str(), "Session cookies rejected");
        SessionStatus::Invalid(reason)
    }
}

impl Default for SessionValidator {
    fn default() -> Self {
        Self::new(&SessionCookieConfig::default())
    }
}
