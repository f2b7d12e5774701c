use serde::Deserialize;

/// Request body for login and signup alike.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub name: String,
    pub user_id: String,
}
