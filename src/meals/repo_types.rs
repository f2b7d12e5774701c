use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

/// One planned meal; at most one per (owner, date, meal type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub meal_type: MealType,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub recipe_id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct NewMealPlan<'a> {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub meal_type: MealType,
    pub note: &'a str,
    pub recipe_id: Option<Uuid>,
    pub user_id: Uuid,
}

/// Replaces note and recipe of an existing entry; `None` clears the recipe.
#[derive(Debug, Serialize)]
pub struct MealPlanPatch<'a> {
    pub note: &'a str,
    pub recipe_id: Option<Uuid>,
}
