use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use crate::meals::repo_types::MealType;

time::serde::format_description!(day, Date, "[year]-[month]-[day]");

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`, both inclusive.
#[derive(Debug, Deserialize)]
pub struct DateRange {
    #[serde(with = "day")]
    pub start: Date,
    #[serde(with = "day")]
    pub end: Date,
}

#[derive(Debug, Deserialize)]
pub struct AddMealRequest {
    #[serde(with = "day")]
    pub date: Date,
    pub meal_type: MealType,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub recipe_id: Option<Uuid>,
}
