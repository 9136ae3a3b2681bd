//! Principals, the ordered role hierarchy and the access gate seam.
//!
//! Every authorization decision in the crate goes through [`require_role`]
//! or [`can_view`] rather than ad-hoc role comparisons in handlers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TokenEntry;
use crate::errors::{AppError, AppResult};

/// Role hierarchy, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
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

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An authenticated actor, resolved by the access gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

/// Resolves a bearer credential to a principal. The credential store itself
/// is an external collaborator; this trait is the only surface the server
/// depends on.
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn resolve(&self, bearer: &str) -> Option<Principal>;
}

/// Config-backed gate mapping static tokens to principals.
pub struct TokenGate {
    tokens: HashMap<String, Principal>,
}

impl TokenGate {
    pub fn new(tokens: HashMap<String, Principal>) -> Self {
        Self { tokens }
    }

    pub fn from_config(entries: &HashMap<String, TokenEntry>) -> Self {
        let tokens = entries
            .iter()
            .map(|(token, entry)| {
                (token.clone(), Principal::new(entry.id.clone(), entry.role))
            })
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl AccessGate for TokenGate {
    async fn resolve(&self, bearer: &str) -> Option<Principal> {
        self.tokens.get(bearer).cloned()
    }
}

/// Fails with `AccessDenied` unless the principal holds at least `min`.
pub fn require_role(principal: &Principal, min: Role) -> AppResult<()> {
    if principal.role >= min {
        Ok(())
    } else {
        Err(AppError::AccessDenied(format!(
            "{} access required",
            min.as_str()
        )))
    }
}

/// Admins and superadmins see everything; everyone else only their own.
pub fn can_view(principal: &Principal, owner_id: &str) -> bool {
    principal.role >= Role::Admin || principal.id == owner_id
}
