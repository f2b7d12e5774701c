use uuid::Uuid;

use crate::auth::repo_types::{NewProfile, Profile, ProfileUpdate};
use crate::gateway::{first_row, Gateway, GatewayError, Query, Table};

impl Profile {
    /// The profile matching both name and chosen id exactly.
    pub async fn find_by_credentials(gw: &Gateway, name: &str, user_id: &str) -> Result<Profile, GatewayError> {
        gw.fetch_one_as(
            &Query::table(Table::Profiles)
                .eq("name", name)
                .eq("user_id", user_id),
        )
        .await
    }

    pub async fn find_by_user_id(gw: &Gateway, user_id: &str) -> Result<Option<Profile>, GatewayError> {
        gw.fetch_optional_as(&Query::table(Table::Profiles).eq("user_id", user_id))
            .await
    }

    pub async fn find(gw: &Gateway, id: Uuid) -> Result<Profile, GatewayError> {
        gw.fetch_one_as(&Query::table(Table::Profiles).eq("id", id.to_string()))
            .await
    }

    /// Inserted rows; empty when the backend returned nothing.
    pub async fn create(gw: &Gateway, name: &str, user_id: &str) -> Result<Vec<Profile>, GatewayError> {
        gw.insert_as(Table::Profiles, &[NewProfile { name, user_id }])
            .await
    }

    pub async fn update(gw: &Gateway, id: Uuid, update: &ProfileUpdate) -> Result<Profile, GatewayError> {
        let rows = gw
            .update_as(&Query::table(Table::Profiles).eq("id", id.to_string()), update)
            .await?;
        first_row(rows)
    }
}
