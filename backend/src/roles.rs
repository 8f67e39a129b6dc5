use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::admin::AdminAllowList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Buyer,
    Transporter,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Buyer => "buyer",
            Role::Transporter => "transporter",
            Role::Admin => "admin",
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Farmer => "/farmer-dashboard",
            Role::Buyer => "/buyer-marketplace",
            Role::Transporter => "/transporter-dashboard",
            Role::Admin => "/admin-dashboard",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "buyer" => Ok(Role::Buyer),
            "transporter" => Ok(Role::Transporter),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redirect target for a raw role string; unknown roles land on the marketplace.
pub fn dashboard_path(role: &str) -> &'static str {
    role.parse::<Role>()
        .map(|r| r.dashboard_path())
        .unwrap_or(Role::Buyer.dashboard_path())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// Read from the user's role row.
    Stored,
    /// Taken from signup metadata because no role row existed.
    Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleResolution {
    pub role: Role,
    pub source: RoleSource,
    /// An admin claim was refused for an email outside the allow-list.
    pub downgraded: bool,
}

impl RoleResolution {
    /// Metadata-derived roles have no row yet and must be written back.
    pub fn needs_persist(&self) -> bool {
        self.source == RoleSource::Metadata
    }

    pub fn redirect(&self) -> &'static str {
        self.role.dashboard_path()
    }
}

/// Effective role after login.
///
/// A stored role row wins; otherwise the signup metadata is used, defaulting
/// to buyer. An admin role held by an email outside `admins` is downgraded to
/// buyer rather than rejected.
pub fn resolve_role(
    stored: Option<&str>,
    metadata: Option<&str>,
    email: &str,
    admins: &AdminAllowList,
) -> RoleResolution {
    let (raw, source) = match stored.filter(|r| !r.trim().is_empty()) {
        Some(role) => (role, RoleSource::Stored),
        None => (
            metadata.filter(|r| !r.trim().is_empty()).unwrap_or("buyer"),
            RoleSource::Metadata,
        ),
    };

    let role = raw.parse::<Role>().unwrap_or(Role::Buyer);
    if role == Role::Admin && !admins.is_authorized_admin_email(email) {
        match source {
            RoleSource::Stored => {
                log::warn!("User {} has admin role but is not authorized", email)
            }
            RoleSource::Metadata => {
                log::warn!("User {} attempted admin login but is not authorized", email)
            }
        }
        return RoleResolution {
            role: Role::Buyer,
            source,
            downgraded: true,
        };
    }

    RoleResolution {
        role,
        source,
        downgraded: false,
    }
}
