use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        error::{AccountDeletionError, AuthError},
        repo_types::{Profile, ProfileUpdate},
    },
    error::{message_or_fallback, AppResult},
    gateway::{Gateway, GatewayError, Query, Table},
};

/// Log in by the exact (name, chosen id) pair. There is no secret involved.
#[instrument(skip(gw))]
pub async fn authenticate(gw: &Gateway, name: &str, user_id: &str) -> Result<Profile, AuthError> {
    match Profile::find_by_credentials(gw, name, user_id).await {
        Ok(profile) => {
            info!(profile_id = %profile.id, "user logged in");
            Ok(profile)
        }
        Err(GatewayError::NoRows | GatewayError::TooManyRows(_)) => {
            warn!("login with unknown name / User ID pair");
            Err(AuthError::InvalidCredentials)
        }
        Err(e) => {
            error!(error = %e, "authentication failed");
            Err(AuthError::Backend(message_or_fallback(&e, "Authentication failed")))
        }
    }
}

#[instrument(skip(gw))]
pub async fn create_user(gw: &Gateway, name: &str, user_id: &str) -> Result<Profile, AuthError> {
    if name.trim().is_empty() || user_id.trim().is_empty() {
        return Err(AuthError::MissingFields);
    }

    match Profile::find_by_user_id(gw, user_id).await {
        Ok(Some(_)) => {
            warn!("User ID already taken");
            return Err(AuthError::UserIdTaken);
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "User ID availability check failed");
            return Err(AuthError::Backend(message_or_fallback(&e, "Failed to sign up")));
        }
    }

    let created = Profile::create(gw, name, user_id).await.map_err(|e| {
        error!(error = %e, "create profile failed");
        AuthError::Backend(message_or_fallback(&e, "Failed to sign up"))
    })?;
    let profile = created.into_iter().next().ok_or(AuthError::CreateFailed)?;

    info!(profile_id = %profile.id, "user signed up");
    Ok(profile)
}

/// `None` both when the profile is missing and when the lookup fails.
#[instrument(skip(gw))]
pub async fn get_user_profile(gw: &Gateway, id: Uuid) -> Option<Profile> {
    match Profile::find(gw, id).await {
        Ok(p) => Some(p),
        Err(e) => {
            error!(error = %e, "error getting user profile");
            None
        }
    }
}

#[instrument(skip(gw), err)]
pub async fn update_profile(gw: &Gateway, id: Uuid, update: &ProfileUpdate) -> AppResult<Profile> {
    if update.is_empty() {
        return Ok(Profile::find(gw, id).await?);
    }
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&update.name) || blank(&update.user_id) {
        return Err(AuthError::MissingFields.into());
    }
    if let Some(user_id) = update.user_id.as_deref() {
        if let Some(holder) = Profile::find_by_user_id(gw, user_id).await? {
            if holder.id != id {
                warn!("User ID already taken");
                return Err(AuthError::UserIdTaken.into());
            }
        }
    }

    let profile = Profile::update(gw, id, update).await?;
    info!(profile_id = %id, "profile updated");
    Ok(profile)
}

/// Steps of the account deletion cascade, children before parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStep {
    MealPlans,
    CollectRecipes,
    RecipeIngredients,
    Recipes,
    CollectShoppingLists,
    ShoppingItems,
    ShoppingLists,
    Profile,
}

impl DeletionStep {
    /// Meal plans reference recipes, so they go first.
    pub const ORDER: [DeletionStep; 8] = [
        DeletionStep::MealPlans,
        DeletionStep::CollectRecipes,
        DeletionStep::RecipeIngredients,
        DeletionStep::Recipes,
        DeletionStep::CollectShoppingLists,
        DeletionStep::ShoppingItems,
        DeletionStep::ShoppingLists,
        DeletionStep::Profile,
    ];
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionReport {
    pub profile_id: Uuid,
    pub completed: Vec<DeletionStep>,
}

#[derive(Deserialize)]
struct IdRow {
    id: Uuid,
}

struct AccountDeletion<'a> {
    gw: &'a Gateway,
    owner: String,
    recipe_ids: Vec<String>,
    list_ids: Vec<String>,
}

impl AccountDeletion<'_> {
    fn owned(&self, table: Table) -> Query {
        Query::table(table).eq("user_id", self.owner.as_str())
    }

    async fn collect_ids(&self, table: Table) -> Result<Vec<String>, GatewayError> {
        let rows: Vec<IdRow> = self.gw.select_as(&self.owned(table).columns(&["id"])).await?;
        Ok(rows.into_iter().map(|r| r.id.to_string()).collect())
    }

    async fn run(&mut self, step: DeletionStep) -> Result<(), GatewayError> {
        match step {
            DeletionStep::MealPlans => {
                self.gw.delete(&self.owned(Table::MealPlans)).await?;
            }
            DeletionStep::CollectRecipes => {
                self.recipe_ids = self.collect_ids(Table::Recipes).await?;
            }
            DeletionStep::RecipeIngredients => {
                if !self.recipe_ids.is_empty() {
                    let q = Query::table(Table::RecipeIngredients).is_in("recipe_id", self.recipe_ids.clone());
                    self.gw.delete(&q).await?;
                }
            }
            DeletionStep::Recipes => {
                self.gw.delete(&self.owned(Table::Recipes)).await?;
            }
            DeletionStep::CollectShoppingLists => {
                self.list_ids = self.collect_ids(Table::ShoppingLists).await?;
            }
            DeletionStep::ShoppingItems => {
                if !self.list_ids.is_empty() {
                    let q = Query::table(Table::ShoppingItems).is_in("list_id", self.list_ids.clone());
                    self.gw.delete(&q).await?;
                }
            }
            DeletionStep::ShoppingLists => {
                self.gw.delete(&self.owned(Table::ShoppingLists)).await?;
            }
            DeletionStep::Profile => {
                self.gw
                    .delete(&Query::table(Table::Profiles).eq("id", self.owner.as_str()))
                    .await?;
            }
        }
        Ok(())
    }
}

/// Delete an account and everything it owns.
///
/// Each step runs only after the previous one succeeded. A failure stops the cascade and
/// leaves the already completed steps applied; nothing is rolled back.
#[instrument(skip(gw))]
pub async fn delete_account(gw: &Gateway, profile_id: Uuid) -> Result<DeletionReport, AccountDeletionError> {
    let mut deletion = AccountDeletion {
        gw,
        owner: profile_id.to_string(),
        recipe_ids: Vec::new(),
        list_ids: Vec::new(),
    };
    let mut completed = Vec::with_capacity(DeletionStep::ORDER.len());

    for step in DeletionStep::ORDER {
        if let Err(source) = deletion.run(step).await {
            error!(error = %source, ?step, ?completed, "account deletion aborted, account left partially deleted");
            return Err(AccountDeletionError {
                failed: step,
                completed,
                source,
            });
        }
        debug!(?step, "deletion step done");
        completed.push(step);
    }

    info!(%profile_id, "account deleted");
    Ok(DeletionReport {
        profile_id,
        completed,
    })
}
