//! Client identity descriptors and the key prefixes derived from them.

use serde::{Deserialize, Serialize};

/// Bucket shared by every client whose address could not be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identity attached to a request by an upstream authentication layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Stable user id
    #[serde(default)]
    pub id: Option<String>,
    /// Login email, used when no id is available
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthenticatedUser {
    /// A user known by id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            email: None,
        }
    }

    /// A user known only by email.
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: Some(email.into()),
        }
    }

    /// The id if present and non-empty, otherwise the email.
    pub fn principal(&self) -> Option<&str> {
        non_empty(self.id.as_deref()).or_else(|| non_empty(self.email.as_deref()))
    }
}

/// Everything a policy may use to derive its key, decoupled from any HTTP framework.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    ip: Option<String>,
    user: Option<AuthenticatedUser>,
    operation: Option<String>,
}

impl ClientIdentity {
    /// An anonymous client seen at `ip`.
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            ..Self::default()
        }
    }

    /// A client whose address is not known.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Attach an authenticated user.
    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.user = Some(user);
        self
    }

    /// Scope heavy-operation accounting to a named operation.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// The client address, or [`UNKNOWN_CLIENT`].
    pub fn ip(&self) -> &str {
        non_empty(self.ip.as_deref()).unwrap_or(UNKNOWN_CLIENT)
    }

    /// The authenticated principal (id, then email), if any.
    pub fn principal(&self) -> Option<&str> {
        self.user.as_ref().and_then(AuthenticatedUser::principal)
    }

    /// The operation scope, if any.
    pub fn operation(&self) -> Option<&str> {
        non_empty(self.operation.as_deref())
    }

    /// Diagnostic label for the address, e.g. `IP: 1.2.3.4`.
    pub fn ip_label(&self) -> String {
        format!("IP: {}", self.ip())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
