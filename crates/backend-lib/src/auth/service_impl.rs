use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use sessiongate_common::{Credentials, PublicUser};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

use super::password::{hash_password, verify_password, PasswordPolicy};
use super::service::{AuthService, LogoutOutcome};
use super::session::{DestroyOutcome, SessionContext};
use crate::config::Settings;
use crate::error::AppError;
use crate::metrics as keys;
use crate::storage::{NewUser, StorageError, TimeoutStore, User, UserFilter, UserStore};
use crate::validation::{require_session, GateChain, GateFailure};

pub struct DefaultAuth {
    store: Arc<dyn UserStore>,
    policy: PasswordPolicy,
    hash_cost: u8,
    /// Hash verified against when the username is unknown, so both login
    /// failure paths spend the same work
    dummy_hash: OnceCell<String>,
}

impl DefaultAuth {
    pub fn new(store: Arc<dyn UserStore>, policy: PasswordPolicy, hash_cost: u8) -> Self {
        Self {
            store,
            policy,
            hash_cost,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Build from settings, bounding every storage call by the configured timeout
    pub fn from_settings(store: Arc<dyn UserStore>, settings: &Settings) -> Self {
        let bounded = Arc::new(TimeoutStore::new(store, settings.storage_timeout()));
        Self::new(bounded, settings.password_policy(), settings.auth.hash_cost)
    }

    /// Hash off the async worker threads; scrypt is CPU bound
    async fn hash(&self, plain: Zeroizing<String>) -> Result<String, AppError> {
        let cost = self.hash_cost;
        let hash = tokio::task::spawn_blocking(move || hash_password(&plain, cost)).await??;
        Ok(hash)
    }

    async fn verify(&self, plain: Zeroizing<String>, hash: String) -> Result<bool, AppError> {
        let matched = tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await??;
        Ok(matched)
    }

    /// Spend one verification's worth of work on a rejected login
    async fn equalize_rejection(&self, plain: &str) {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash(Zeroizing::new("sessiongate-dummy".to_string())))
            .await;
        match dummy {
            Ok(hash) => {
                let _ = self.verify(Zeroizing::new(plain.to_string()), hash.clone()).await;
            },
            Err(e) => debug!(error = %e, "could not prepare dummy hash"),
        }
    }

    fn reject_login(&self) -> AppError {
        counter!(keys::AUTH_LOGIN_FAILURE).increment(1);
        info!("login rejected");
        GateFailure::InvalidCredentials.into()
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    #[instrument(skip_all, fields(username = %credentials.username()))]
    async fn register(&self, credentials: Credentials) -> Result<PublicUser, AppError> {
        GateChain::register()
            .run(&credentials, self.store.as_ref(), &self.policy)
            .await?;

        let Credentials { username, password } = credentials;
        let username = username.unwrap_or_default();
        let password_hash = self.hash(Zeroizing::new(password.unwrap_or_default())).await?;

        let user = match self
            .store
            .create(NewUser {
                username,
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            Err(StorageError::Conflict(_)) => {
                // Another request registered the name after our gate passed
                info!("username claimed concurrently");
                return Err(GateFailure::UsernameTaken.into());
            },
            Err(e) => return Err(e.into()),
        };

        counter!(keys::AUTH_REGISTER).increment(1);
        info!(user_id = user.id, "user registered");
        Ok(user.public())
    }

    #[instrument(skip_all, fields(username = %credentials.username()))]
    async fn login(&self, credentials: Credentials, session: &SessionContext) -> Result<User, AppError> {
        if let Err(err) = GateChain::login()
            .run(&credentials, self.store.as_ref(), &self.policy)
            .await
        {
            if matches!(err, AppError::Gate(_)) {
                self.equalize_rejection(credentials.password()).await;
                return Err(self.reject_login());
            }
            return Err(err);
        }

        // The user can only vanish here if storage deletes records behind our back
        let Some(user) = self
            .store
            .find_by(&UserFilter::Username(credentials.username().to_string()))
            .await?
            .into_iter()
            .next()
        else {
            return Err(self.reject_login());
        };

        let plain = Zeroizing::new(credentials.password.unwrap_or_default());
        if !self.verify(plain, user.password.clone()).await? {
            return Err(self.reject_login());
        }

        session.create(user.clone()).await?;
        counter!(keys::AUTH_LOGIN_SUCCESS).increment(1);
        info!(user_id = user.id, "login succeeded");
        Ok(user)
    }

    #[instrument(skip_all)]
    async fn logout(&self, session: &SessionContext) -> Result<LogoutOutcome, AppError> {
        match session.destroy().await? {
            DestroyOutcome::Destroyed => {
                counter!(keys::AUTH_LOGOUT).increment(1);
                Ok(LogoutOutcome::LoggedOut)
            },
            DestroyOutcome::NoSession => {
                debug!("logout without a session");
                Ok(LogoutOutcome::NoSession)
            },
        }
    }

    #[instrument(skip_all)]
    async fn list_users(&self, session: &SessionContext) -> Result<Vec<PublicUser>, AppError> {
        require_session(session)?;
        let users = self.store.find_all().await?;
        Ok(users.iter().map(User::public).collect())
    }
}
