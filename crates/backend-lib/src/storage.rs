// ============================
// sessiongate-backend/src/storage.rs
// ============================
//! User record storage: trait plus in-memory and flat-file implementations.
//!
//! Both implementations enforce username uniqueness inside their write
//! critical section. The pre-insert gate in the auth layer only improves
//! the error message; `StorageError::Conflict` is the real guarantee.
use std::{
    fmt, fs,
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sessiongate_common::{PublicUser, UserId};
use thiserror::Error;
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::Mutex};

/// Stored user record. `password` always holds a hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: String,
}

impl User {
    /// Projection safe to return to clients
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Record handed to `create`; storage assigns the id
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// Lookup filter for `find_by`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Username(String),
    Id(UserId),
}

impl UserFilter {
    fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::Username(name) => user.username == *name,
            UserFilter::Id(id) => user.id == *id,
        }
    }
}

/// Storage faults. An empty result set is not one of these.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Username already exists: {0}")]
    Conflict(String),

    #[error("Storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for user storage backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user and return it with its assigned id.
    ///
    /// Fails with `StorageError::Conflict` if the username is taken.
    async fn create(&self, user: NewUser) -> Result<User, StorageError>;

    /// All users matching the filter, possibly none
    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<User>, StorageError>;

    /// Every stored user in id order
    async fn find_all(&self) -> Result<Vec<User>, StorageError>;
}

/// Serialized form shared by both backends
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct UserTable {
    next_id: UserId,
    users: Vec<User>,
}

impl UserTable {
    fn insert(&mut self, new_user: NewUser) -> Result<User, StorageError> {
        if self.users.iter().any(|u| u.username == new_user.username) {
            return Err(StorageError::Conflict(new_user.username));
        }
        self.next_id = self.next_id.max(0) + 1;
        let user = User {
            id: self.next_id,
            username: new_user.username,
            password: new_user.password_hash,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn select(&self, filter: &UserFilter) -> Vec<User> {
        self.users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect()
    }
}

/// In-memory implementation of the `UserStore` trait
#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<UserTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        self.table.write().insert(user)
    }

    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<User>, StorageError> {
        Ok(self.table.read().select(filter))
    }

    async fn find_all(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.table.read().users.clone())
    }
}

/// Flat-file implementation of the `UserStore` trait.
///
/// The whole table lives in `users.json` under the root directory and is
/// rewritten through a temporary file on every insert.
pub struct FlatFileUserStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FlatFileUserStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn table_path(&self) -> PathBuf {
        self.root.join("users.json")
    }

    async fn read_table(&self) -> Result<UserTable, StorageError> {
        let path = self.table_path();
        if !tokio_fs::try_exists(&path).await? {
            return Ok(UserTable::default());
        }

        let content = tokio_fs::read_to_string(&path).await?;
        if content.trim().is_empty() {
            return Ok(UserTable::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_table(&self, table: &UserTable) -> Result<(), StorageError> {
        let path = self.table_path();
        let tmp_path = self.root.join("users.json.tmp");

        let json = serde_json::to_vec_pretty(table)?;
        let mut file = tokio_fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio_fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for FlatFileUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        // Read-modify-write must not interleave with another insert
        let _guard = self.write_lock.lock().await;

        let mut table = self.read_table().await?;
        let created = table.insert(user)?;
        self.write_table(&table).await?;
        Ok(created)
    }

    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<User>, StorageError> {
        Ok(self.read_table().await?.select(filter))
    }

    async fn find_all(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.read_table().await?.users)
    }
}

/// Decorator that bounds every call to the inner store by a deadline.
///
/// A stalled backend surfaces as `StorageError::Timeout` instead of
/// holding the request open.
///
/// A timeout does not undo the call. A `create` that committed before the
/// deadline fired is reported as `Timeout` and the record stays stored, so
/// a retry of the same registration sees `Conflict`.
#[derive(Clone)]
pub struct TimeoutStore {
    inner: Arc<dyn UserStore>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn UserStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>> + Send,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.limit, call)
            .await
            .map_err(|_| StorageError::Timeout(self.limit))?
    }
}

#[async_trait]
impl UserStore for TimeoutStore {
    async fn create(&self, user: NewUser) -> Result<User, StorageError> {
        self.bounded(self.inner.create(user)).await
    }

    async fn find_by(&self, filter: &UserFilter) -> Result<Vec<User>, StorageError> {
        self.bounded(self.inner.find_by(filter)).await
    }

    async fn find_all(&self) -> Result<Vec<User>, StorageError> {
        self.bounded(self.inner.find_all()).await
    }
}
