use thiserror::Error;

use super::services::DeletionStep;
use crate::gateway::GatewayError;

/// Login and signup failures, worded for the person at the keyboard.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Invalid name or User ID. Please check your details and try again.")]
    InvalidCredentials,
    #[error("This User ID is already taken. Please choose another one.")]
    UserIdTaken,
    #[error("Failed to create user")]
    CreateFailed,
    #[error("{0}")]
    Backend(String),
}

/// A cascade step failed. Steps listed in `completed` stay applied.
#[derive(Debug, Error)]
#[error("Failed to delete account at step {failed:?}: {source}")]
pub struct AccountDeletionError {
    pub failed: DeletionStep,
    pub completed: Vec<DeletionStep>,
    #[source]
    pub source: GatewayError,
}
