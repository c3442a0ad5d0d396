use std::fmt;

use crate::error::Error;

/// Capability marker granted to every CI account: API-key and interactive
/// login.
pub const CI_CAPABILITIES: &str = "apiKey,login";

/// The two static CI roles provisioned per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiRole {
    Admin,
    View,
}

impl CiRole {
    /// Suffix of the account name, e.g. `payments-Admin-CI`.
    pub fn account_suffix(self) -> &'static str {
        match self {
            Self::Admin => "Admin-CI",
            Self::View => "View-CI",
        }
    }

    /// Role token used in policy lines and group names.
    pub fn grant(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::View => "view",
        }
    }
}

impl fmt::Display for CiRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.grant())
    }
}

/// Derived names for one team-role CI identity. Pure; every piece of
/// externally stored state is keyed off these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiIdentity {
    team: String,
    role: CiRole,
    account: String,
}

impl CiIdentity {
    /// Rejects an empty team name before anything derived from it can reach
    /// a store.
    pub fn new(team: &str, role: CiRole) -> Result<Self, Error> {
        if team.trim().is_empty() {
            return Err(Error::InvalidTeamName(team.to_owned()));
        }
        Ok(Self {
            team: team.to_owned(),
            role,
            account: format!("{team}-{}", role.account_suffix()),
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Key of the capability entry in the identity document.
    pub fn identity_key(&self) -> String {
        format!("accounts.{}", self.account)
    }

    /// Key of the hashed password entry in the credential document.
    pub fn credential_key(&self) -> String {
        format!("{}.password", self.identity_key())
    }

    /// Grant line for the rbac policy document.
    pub fn policy_line(&self) -> String {
        format!("g,{},role:{}-{}", self.account, self.team, self.role.grant())
    }

    /// Cluster group holding this role's human members.
    pub fn group_name(&self) -> String {
        format!("{}-{}", self.team, self.role.grant())
    }
}
