use tracing::{info, instrument};
use uuid::Uuid;

use super::repo_types::{NewRecipe, Recipe, RecipeDetails, RecipeIngredient, RecipeRow, RecipeUpdate};
use crate::{
    error::{AppError, AppResult},
    gateway::Gateway,
};

#[instrument(skip(gw), err)]
pub async fn get_recipes(gw: &Gateway, owner: Uuid) -> AppResult<Vec<Recipe>> {
    Ok(Recipe::list_by_owner(gw, owner).await?)
}

#[instrument(skip(gw), err)]
pub async fn get_recipe(gw: &Gateway, recipe_id: Uuid) -> AppResult<RecipeDetails> {
    let recipe = Recipe::find(gw, recipe_id).await?;
    let ingredients = RecipeIngredient::list_by_recipe(gw, recipe_id).await?;
    Ok(RecipeDetails { recipe, ingredients })
}

/// Inserts the recipe, then its ingredients. A failed ingredient insert leaves the
/// recipe in place.
#[instrument(skip(gw, new), fields(name = %new.name), err)]
pub async fn create_recipe(gw: &Gateway, owner: Uuid, new: &NewRecipe) -> AppResult<Recipe> {
    if new.name.trim().is_empty() {
        return Err(AppError::BadRequest("Recipe name is required".into()));
    }

    let recipe = Recipe::create(
        gw,
        &RecipeRow {
            name: &new.name,
            image: &new.image,
            instructions: &new.instructions,
            notes: new.notes.as_deref(),
            user_id: owner,
        },
    )
    .await?;
    RecipeIngredient::insert_many(gw, recipe.id, &new.ingredients).await?;

    info!(recipe_id = %recipe.id, ingredients = new.ingredients.len(), "recipe created");
    Ok(recipe)
}

#[instrument(skip(gw, update), err)]
pub async fn update_recipe(gw: &Gateway, recipe_id: Uuid, update: &RecipeUpdate) -> AppResult<Recipe> {
    let recipe = if update.has_column_changes() {
        Recipe::update(gw, recipe_id, update).await?
    } else {
        Recipe::find(gw, recipe_id).await?
    };

    if let Some(ingredients) = &update.ingredients {
        RecipeIngredient::delete_by_recipe(gw, recipe_id).await?;
        RecipeIngredient::insert_many(gw, recipe_id, ingredients).await?;
    }
    Ok(recipe)
}

/// Ingredients first, then the recipe.
#[instrument(skip(gw), err)]
pub async fn delete_recipe(gw: &Gateway, recipe_id: Uuid) -> AppResult<()> {
    RecipeIngredient::delete_by_recipe(gw, recipe_id).await?;
    Recipe::delete(gw, recipe_id).await?;
    info!(%recipe_id, "recipe deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{memory::Operation, Table};

    fn pancakes(ingredients: &[&str]) -> NewRecipe {
        NewRecipe {
            name: "Pancakes".into(),
            image: String::new(),
            instructions: "Mix and fry".into(),
            notes: Some("Serve warm".into()),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn create_then_read_back_with_ingredients_in_order() {
        let (gw, _) = Gateway::in_memory();
        let owner = Uuid::new_v4();
        let recipe = create_recipe(&gw, owner, &pancakes(&["Flour", "Milk", "Eggs"])).await.unwrap();

        let details = get_recipe(&gw, recipe.id).await.unwrap();
        assert_eq!(details.recipe, recipe);
        let names: Vec<_> = details.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Flour", "Milk", "Eggs"]);
        assert_eq!(get_recipes(&gw, owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_ingredient_list_skips_the_insert() {
        let (gw, mem) = Gateway::in_memory();
        create_recipe(&gw, Uuid::new_v4(), &pancakes(&[])).await.unwrap();
        assert!(!mem
            .operations()
            .contains(&(Operation::Insert, Table::RecipeIngredients)));
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let (gw, _) = Gateway::in_memory();
        let err = get_recipe(&gw, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn ingredient_only_update_replaces_the_list() {
        let (gw, mem) = Gateway::in_memory();
        let recipe = create_recipe(&gw, Uuid::new_v4(), &pancakes(&["Flour", "Milk"])).await.unwrap();

        let same = update_recipe(
            &gw,
            recipe.id,
            &RecipeUpdate {
                ingredients: Some(vec!["Oats".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(same.name, "Pancakes");
        assert!(!mem.operations().contains(&(Operation::Update, Table::Recipes)));

        let details = get_recipe(&gw, recipe.id).await.unwrap();
        assert_eq!(details.ingredients.len(), 1);
        assert_eq!(details.ingredients[0].name, "Oats");
    }

    #[tokio::test]
    async fn column_update_leaves_ingredients_alone() {
        let (gw, _) = Gateway::in_memory();
        let recipe = create_recipe(&gw, Uuid::new_v4(), &pancakes(&["Flour"])).await.unwrap();

        let renamed = update_recipe(
            &gw,
            recipe.id,
            &RecipeUpdate {
                name: Some("Crepes".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Crepes");
        assert_eq!(renamed.notes.as_deref(), Some("Serve warm"));
        assert_eq!(get_recipe(&gw, recipe.id).await.unwrap().ingredients.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_ingredients_first() {
        let (gw, mem) = Gateway::in_memory();
        let recipe = create_recipe(&gw, Uuid::new_v4(), &pancakes(&["Flour"])).await.unwrap();
        let before = mem.operations().len();

        delete_recipe(&gw, recipe.id).await.unwrap();
        assert_eq!(
            mem.operations()[before..],
            [(Operation::Delete, Table::RecipeIngredients), (Operation::Delete, Table::Recipes)]
        );
        assert!(mem.rows(Table::Recipes).is_empty());
        assert!(mem.rows(Table::RecipeIngredients).is_empty());
    }
}
