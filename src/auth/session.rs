//! Client-side session: the logged-in profile, persisted as one JSON file.

use std::{io::ErrorKind, path::PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::{
    auth::{
        error::AuthError,
        repo_types::{Profile, ProfileUpdate},
        services::{self, DeletionReport},
    },
    error::{AppError, AppResult},
    gateway::Gateway,
};

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `None` when nothing is stored, meaning logged out.
    pub async fn load(&self) -> anyhow::Result<Option<Profile>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let profile = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parse session {}", self.path.display()))?;
                Ok(Some(profile))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read session {}", self.path.display())),
        }
    }

    pub async fn save(&self, profile: &Profile) -> anyhow::Result<()> {
        let json = serde_json::to_vec(profile).context("encode session")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("write session {}", self.path.display()))
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove session {}", self.path.display())),
        }
    }
}

/// The authenticated user of a client, restored from and written through to a
/// [`SessionStore`].
pub struct AuthSession {
    gateway: Gateway,
    store: SessionStore,
    user: Option<Profile>,
}

impl AuthSession {
    /// An unreadable session file counts as logged out.
    pub async fn restore(gateway: Gateway, store: SessionStore) -> Self {
        let user = match store.load().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "error checking session");
                None
            }
        };
        Self { gateway, store, user }
    }

    pub fn user(&self) -> Option<&Profile> {
        self.user.as_ref()
    }

    pub async fn login(&mut self, name: &str, user_id: &str) -> Result<&Profile, AuthError> {
        let profile = services::authenticate(&self.gateway, name, user_id).await?;
        Ok(self.remember(profile).await)
    }

    pub async fn signup(&mut self, name: &str, user_id: &str) -> Result<&Profile, AuthError> {
        let profile = services::create_user(&self.gateway, name, user_id).await?;
        Ok(self.remember(profile).await)
    }

    pub async fn logout(&mut self) {
        self.user = None;
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "error logging out");
        }
    }

    /// No-op when logged out.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> AppResult<()> {
        let Some(current) = &self.user else {
            return Ok(());
        };
        let profile = services::update_profile(&self.gateway, current.id, update).await?;
        self.remember(profile).await;
        Ok(())
    }

    /// Runs the deletion cascade for the current user and logs out once it completes.
    pub async fn delete_account(&mut self) -> AppResult<DeletionReport> {
        let Some(current) = &self.user else {
            return Err(AppError::Unauthenticated);
        };
        let report = services::delete_account(&self.gateway, current.id).await?;
        info!(profile_id = %report.profile_id, "account deleted, logging out");
        self.logout().await;
        Ok(report)
    }

    async fn remember(&mut self, profile: Profile) -> &Profile {
        if let Err(e) = self.store.save(&profile).await {
            warn!(error = %e, "session not persisted");
        }
        self.user.insert(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Table;

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("cartpal_user.json"))
    }

    #[tokio::test]
    async fn signup_persists_and_restore_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let (gw, _) = Gateway::in_memory();

        let mut session = AuthSession::restore(gw.clone(), store_in(&dir)).await;
        assert!(session.user().is_none());
        let id = session.signup("Sam", "sam42").await.unwrap().id;

        let restored = AuthSession::restore(gw, store_in(&dir)).await;
        assert_eq!(restored.user().map(|u| u.id), Some(id));
    }

    #[tokio::test]
    async fn failed_login_keeps_user_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let (gw, _) = Gateway::in_memory();
        let mut session = AuthSession::restore(gw, store_in(&dir)).await;

        let err = session.login("Nobody", "nobody").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(session.user().is_none());
        assert!(store_in(&dir).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_session_file_means_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("cartpal_user.json"), b"{not json")
            .await
            .unwrap();
        let (gw, _) = Gateway::in_memory();
        let session = AuthSession::restore(gw, store_in(&dir)).await;
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn update_profile_rewrites_the_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let (gw, _) = Gateway::in_memory();
        let mut session = AuthSession::restore(gw, store_in(&dir)).await;
        session.signup("Sam", "sam42").await.unwrap();

        session
            .update_profile(&ProfileUpdate {
                name: Some("Samantha".into()),
                user_id: None,
            })
            .await
            .unwrap();
        assert_eq!(session.user().unwrap().name, "Samantha");
        let stored = store_in(&dir).load().await.unwrap().unwrap();
        assert_eq!(stored.name, "Samantha");
    }

    #[tokio::test]
    async fn delete_account_logs_out() {
        let dir = tempfile::tempdir().unwrap();
        let (gw, mem) = Gateway::in_memory();
        let mut session = AuthSession::restore(gw, store_in(&dir)).await;
        session.signup("Sam", "sam42").await.unwrap();

        session.delete_account().await.unwrap();
        assert!(session.user().is_none());
        assert!(mem.rows(Table::Profiles).is_empty());
        assert!(store_in(&dir).load().await.unwrap().is_none());
        assert!(matches!(session.delete_account().await, Err(AppError::Unauthenticated)));
    }
}
