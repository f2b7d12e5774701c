use uuid::Uuid;

use super::repo_types::{IngredientRow, Recipe, RecipeIngredient, RecipeRow, RecipeUpdate};
use crate::gateway::{first_row, Direction, Gateway, GatewayError, Query, Table};

fn by_id(id: Uuid) -> Query {
    Query::table(Table::Recipes).eq("id", id.to_string())
}

fn ingredients_of(recipe_id: Uuid) -> Query {
    Query::table(Table::RecipeIngredients).eq("recipe_id", recipe_id.to_string())
}

impl Recipe {
    pub async fn list_by_owner(gw: &Gateway, owner: Uuid) -> Result<Vec<Recipe>, GatewayError> {
        gw.select_as(
            &Query::table(Table::Recipes)
                .eq("user_id", owner.to_string())
                .order("created_at", Direction::Desc),
        )
        .await
    }

    pub async fn find(gw: &Gateway, id: Uuid) -> Result<Recipe, GatewayError> {
        gw.fetch_one_as(&by_id(id)).await
    }

    pub(crate) async fn create(gw: &Gateway, row: &RecipeRow<'_>) -> Result<Recipe, GatewayError> {
        first_row(gw.insert_as(Table::Recipes, std::slice::from_ref(row)).await?)
    }

    pub async fn update(gw: &Gateway, id: Uuid, update: &RecipeUpdate) -> Result<Recipe, GatewayError> {
        first_row(gw.update_as(&by_id(id), update).await?)
    }

    pub async fn delete(gw: &Gateway, id: Uuid) -> Result<u64, GatewayError> {
        gw.delete(&by_id(id)).await
    }
}

impl RecipeIngredient {
    pub async fn list_by_recipe(gw: &Gateway, recipe_id: Uuid) -> Result<Vec<RecipeIngredient>, GatewayError> {
        gw.select_as(&ingredients_of(recipe_id).order("created_at", Direction::Asc))
            .await
    }

    /// No-op for an empty list.
    pub async fn insert_many(
        gw: &Gateway,
        recipe_id: Uuid,
        names: &[String],
    ) -> Result<Vec<RecipeIngredient>, GatewayError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<IngredientRow<'_>> = names
            .iter()
            .map(|name| IngredientRow { recipe_id, name })
            .collect();
        gw.insert_as(Table::RecipeIngredients, &rows).await
    }

    pub async fn delete_by_recipe(gw: &Gateway, recipe_id: Uuid) -> Result<u64, GatewayError> {
        gw.delete(&ingredients_of(recipe_id)).await
    }
}
