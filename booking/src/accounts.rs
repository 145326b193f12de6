//! Account directory: the user collaborator.
//!
//! Registration, login and password handling live elsewhere. The booking
//! backend only needs to turn a bearer token into an [`Account`], look users
//! up, ban them and count them.

use crate::types::{Actor, Role, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;

/// A user as seen by the booking backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// User id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// E-mail address
    pub email: String,
    /// Role
    pub role: Role,
    /// Banned accounts cannot authenticate
    #[serde(default)]
    pub banned: bool,
    /// Why the account was banned
    #[serde(default)]
    pub ban_reason: Option<String>,
    /// When the account was banned
    #[serde(default)]
    pub banned_at: Option<DateTime<Utc>>,
}

impl Account {
    /// The account acting as a caller.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
        }
    }
}

/// Authentication and directory errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token is unknown
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Account exists but is banned
    #[error("Account is banned")]
    Banned {
        /// Ban reason, if one was given
        reason: Option<String>,
    },

    /// Seed file could not be read or parsed
    #[error("Failed to load accounts: {0}")]
    Seed(String),

    /// Backing directory failed
    #[error("Account directory error: {0}")]
    Directory(String),
}

/// Lookup and moderation of user accounts.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Resolve a bearer token to a usable account.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] for unknown tokens, [`AuthError::Banned`]
    /// for banned accounts.
    async fn authenticate(&self, token: &str) -> Result<Account, AuthError>;

    /// Look an account up by id.
    ///
    /// # Errors
    ///
    /// Directory failures.
    async fn find(&self, id: UserId) -> Result<Option<Account>, AuthError>;

    /// Mark an account as banned. Returns the updated account, or `None` if
    /// it does not exist.
    ///
    /// # Errors
    ///
    /// Directory failures.
    async fn ban(
        &self,
        id: UserId,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Account>, AuthError>;

    /// Number of accounts with the regular user role.
    ///
    /// # Errors
    ///
    /// Directory failures.
    async fn count_users(&self) -> Result<u64, AuthError>;
}

/// Account entry in a seed file.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAccount {
    /// Bearer token that authenticates as this account
    pub token: String,
    /// The account itself
    #[serde(flatten)]
    pub account: Account,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<UserId, Account>,
    tokens: HashMap<String, UserId>,
}

/// In-memory [`AccountDirectory`] seeded at startup.
#[derive(Default)]
pub struct InMemoryAccounts {
    inner: RwLock<Directory>,
}

impl InMemoryAccounts {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding `seed`.
    #[must_use]
    pub fn from_seed(seed: impl IntoIterator<Item = SeedAccount>) -> Self {
        let mut directory = Directory::default();
        for SeedAccount { token, account } in seed {
            directory.tokens.insert(token, account.id);
            directory.accounts.insert(account.id, account);
        }
        Self {
            inner: RwLock::new(directory),
        }
    }

    /// Load a JSON array of [`SeedAccount`]s.
    ///
    /// # Errors
    ///
    /// [`AuthError::Seed`] if the file is missing or malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Seed(format!("{}: {e}", path.display())))?;
        let seed: Vec<SeedAccount> = serde_json::from_str(&raw)
            .map_err(|e| AuthError::Seed(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), accounts = seed.len(), "Loaded account directory");
        Ok(Self::from_seed(seed))
    }

    /// Add an account reachable through `token`.
    pub async fn insert(&self, token: impl Into<String>, account: Account) {
        let mut directory = self.inner.write().await;
        directory.tokens.insert(token.into(), account.id);
        directory.accounts.insert(account.id, account);
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccounts {
    async fn authenticate(&self, token: &str) -> Result<Account, AuthError> {
        let directory = self.inner.read().await;
        let account = directory
            .tokens
            .get(token)
            .and_then(|id| directory.accounts.get(id))
            .ok_or(AuthError::InvalidToken)?;
        if account.banned {
            return Err(AuthError::Banned {
                reason: account.ban_reason.clone(),
            });
        }
        Ok(account.clone())
    }

    async fn find(&self, id: UserId) -> Result<Option<Account>, AuthError> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn ban(
        &self,
        id: UserId,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Account>, AuthError> {
        let mut directory = self.inner.write().await;
        Ok(directory.accounts.get_mut(&id).map(|account| {
            account.banned = true;
            account.ban_reason = reason;
            account.banned_at = Some(at);
            account.clone()
        }))
    }

    async fn count_users(&self) -> Result<u64, AuthError> {
        let directory = self.inner.read().await;
        Ok(directory
            .accounts
            .values()
            .filter(|a| a.role == Role::User)
            .count() as u64)
    }
}
