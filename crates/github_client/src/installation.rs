//! GitHub App installation domain types.
//!
//! This module contains types related to GitHub App installations,
//! in particular the account (organization or user) that authorized the App.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;

/// The kind of account a GitHub App is installed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AccountType {
    Organization,
    User,
}

impl AccountType {
    /// Maps the `type` field of a GitHub account.
    ///
    /// Anything other than `Organization` (for example `Bot` or `Enterprise`)
    /// is recorded as `User`.
    pub fn from_github(value: Option<&str>) -> Self {
        match value {
            Some("Organization") => AccountType::Organization,
            _ => AccountType::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Organization => "Organization",
            AccountType::User => "User",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Organization" => Ok(AccountType::Organization),
            "User" => Ok(AccountType::User),
            other => Err(format!("unknown account type '{other}'")),
        }
    }
}

/// The account that owns a GitHub App installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstallationAccount {
    /// The login name of the account, as GitHub reports it
    pub login: String,
    /// Organization or user
    pub account_type: AccountType,
}

/// Body of `GET /app/installations/{id}`, reduced to the fields we read.
#[derive(Debug, Deserialize)]
pub(crate) struct InstallationResponse {
    pub account: Option<AccountResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountResponse {
    pub login: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

impl InstallationResponse {
    /// Extracts the installation account, or `None` if the login is missing.
    pub(crate) fn into_account(self) -> Option<InstallationAccount> {
        let account = self.account?;
        let login = account.login.filter(|l| !l.is_empty())?;
        Some(InstallationAccount {
            login,
            account_type: AccountType::from_github(account.account_type.as_deref()),
        })
    }
}
