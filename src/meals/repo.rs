use time::Date;
use uuid::Uuid;

use crate::gateway::{first_row, Direction, Gateway, GatewayError, Query, Table};
use crate::meals::repo_types::{MealPlan, MealPlanPatch, MealType, NewMealPlan};

impl MealPlan {
    /// Plans with `start <= date <= end`, earliest first.
    pub async fn list_in_range(gw: &Gateway, owner: Uuid, start: Date, end: Date) -> Result<Vec<MealPlan>, GatewayError> {
        gw.select_as(
            &Query::table(Table::MealPlans)
                .eq("user_id", owner.to_string())
                .gte("date", start.to_string())
                .lte("date", end.to_string())
                .order("date", Direction::Asc),
        )
        .await
    }

    pub async fn find_slot(gw: &Gateway, owner: Uuid, date: Date, meal_type: MealType) -> Result<Option<MealPlan>, GatewayError> {
        gw.fetch_optional_as(
            &Query::table(Table::MealPlans)
                .eq("user_id", owner.to_string())
                .eq("date", date.to_string())
                .eq("meal_type", meal_type.as_str()),
        )
        .await
    }

    pub async fn create(gw: &Gateway, new: &NewMealPlan<'_>) -> Result<MealPlan, GatewayError> {
        first_row(gw.insert_as(Table::MealPlans, std::slice::from_ref(new)).await?)
    }

    pub async fn update(gw: &Gateway, id: Uuid, patch: &MealPlanPatch<'_>) -> Result<MealPlan, GatewayError> {
        first_row(
            gw.update_as(&Query::table(Table::MealPlans).eq("id", id.to_string()), patch)
                .await?,
        )
    }

    pub async fn delete(gw: &Gateway, id: Uuid) -> Result<u64, GatewayError> {
        gw.delete(&Query::table(Table::MealPlans).eq("id", id.to_string()))
            .await
    }
}
