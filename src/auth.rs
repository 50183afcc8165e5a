//! Shared-secret authentication for the HTTP transport.
//!
//! One static secret gates the whole HTTP surface. A caller presents it either
//! as `X-API-Key: <secret>` or as `Authorization: Bearer <secret>`; the value
//! must match exactly. Without a configured secret the guard runs in open
//! mode and grants everything. The stdio transport never consults the guard.

/// Header carrying the key directly.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying a bearer token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// The credentials a single request presented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    api_key: Option<String>,
    bearer: Option<String>,
}

impl AuthContext {
    /// Extracts credentials from `(name, value)` header pairs.
    ///
    /// Header names compare case-insensitively; the `Bearer` scheme does too.
    /// The first occurrence of each header wins.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut context = AuthContext::default();
        for (name, value) in headers {
            if name.eq_ignore_ascii_case(API_KEY_HEADER) {
                context.api_key.get_or_insert_with(|| value.trim().to_string());
            } else if name.eq_ignore_ascii_case(AUTHORIZATION_HEADER) {
                if let Some(token) = bearer_token(value) {
                    context.bearer.get_or_insert_with(|| token.to_string());
                }
            }
        }
        context
    }

    /// Whether any credential was presented.
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.bearer.is_none()
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let value = value.trim();
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

/// Outcome of [`Guard::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Granted,
    Denied(&'static str),
}

impl Authentication {
    pub fn is_granted(&self) -> bool {
        matches!(self, Authentication::Granted)
    }
}

/// The shared-secret check.
///
/// ```
/// use toolgate::auth::{AuthContext, Authentication, Guard};
///
/// let guard = Guard::new(Some("s3cret".to_string()));
/// let ok = AuthContext::from_headers([("Authorization", "Bearer s3cret")]);
/// let wrong = AuthContext::from_headers([("X-API-Key", "S3CRET")]);
/// assert_eq!(guard.authenticate(&ok), Authentication::Granted);
/// assert!(!guard.authenticate(&wrong).is_granted());
///
/// let open = Guard::open();
/// assert!(open.authenticate(&AuthContext::default()).is_granted());
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Guard {
    secret: Option<String>,
}

impl Guard {
    /// A guard requiring `secret`; `None` or an empty secret means open mode.
    pub fn new(secret: Option<String>) -> Self {
        Guard {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// A guard that grants every request.
    pub fn open() -> Self {
        Guard { secret: None }
    }

    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    pub fn authenticate(&self, context: &AuthContext) -> Authentication {
        let Some(secret) = &self.secret else {
            return Authentication::Granted;
        };
        if context.is_empty() {
            return Authentication::Denied("Missing credentials");
        }
        let presented = [context.api_key.as_deref(), context.bearer.as_deref()];
        if presented.iter().flatten().any(|key| *key == secret.as_str()) {
            Authentication::Granted
        } else {
            Authentication::Denied("Invalid credentials")
        }
    }

    /// Logs the guard's mode; open mode is always announced as a warning.
    pub fn announce(&self) {
        if self.is_open() {
            logwise::warn_sync!(
                "auth: no API key configured, HTTP transport is running in OPEN mode and accepts unauthenticated requests"
            );
        } else {
            logwise::info_sync!("auth: shared-secret authentication enabled");
        }
    }
}

// never print the secret
impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("open", &self.is_open())
            .finish()
    }
}
