use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub image: String, // public URL, may be empty
    pub instructions: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub user_id: Uuid,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub name: String,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

/// A recipe as entered by the user, ingredients included.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecipeRow<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub instructions: &'a str,
    pub notes: Option<&'a str>,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(crate) struct IngredientRow<'a> {
    pub recipe_id: Uuid,
    pub name: &'a str,
}

/// Partial recipe update. `ingredients`, when present, replaces the whole list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing)]
    pub ingredients: Option<Vec<String>>,
}

impl RecipeUpdate {
    /// Whether any `recipes` column is touched.
    pub fn has_column_changes(&self) -> bool {
        self.name.is_some() || self.image.is_some() || self.instructions.is_some() || self.notes.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_patch_never_carries_ingredients() {
        let update: RecipeUpdate =
            serde_json::from_str(r#"{"name": "Crepes", "ingredients": ["Flour"]}"#).unwrap();
        assert!(update.has_column_changes());
        assert_eq!(update.ingredients.as_deref(), Some(&["Flour".to_string()][..]));
        assert_eq!(serde_json::to_value(&update).unwrap(), serde_json::json!({"name": "Crepes"}));

        let only_ingredients: RecipeUpdate = serde_json::from_str(r#"{"ingredients": []}"#).unwrap();
        assert!(!only_ingredients.has_column_changes());
    }
}
