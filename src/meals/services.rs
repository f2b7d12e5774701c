use time::Date;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    error::AppResult,
    gateway::{ChangeFeed, Gateway, RowFilter, Table},
    meals::repo_types::{MealPlan, MealPlanPatch, MealType, NewMealPlan},
};

#[instrument(skip(gw), err)]
pub async fn get_meal_plans(gw: &Gateway, owner: Uuid, start: Date, end: Date) -> AppResult<Vec<MealPlan>> {
    // A reversed range matches nothing.
    Ok(MealPlan::list_in_range(gw, owner, start, end).await?)
}

/// Upsert on (owner, date, meal type): an existing entry gets the new note and recipe,
/// otherwise a new one is inserted.
///
/// Lookup and insert are separate calls, so two concurrent adds for an empty slot can
/// both insert.
#[instrument(skip(gw), err)]
pub async fn add_meal(
    gw: &Gateway,
    owner: Uuid,
    date: Date,
    meal_type: MealType,
    note: &str,
    recipe_id: Option<Uuid>,
) -> AppResult<MealPlan> {
    match MealPlan::find_slot(gw, owner, date, meal_type).await? {
        Some(existing) => {
            debug!(meal_id = %existing.id, "replacing planned meal");
            Ok(MealPlan::update(gw, existing.id, &MealPlanPatch { note, recipe_id }).await?)
        }
        None => Ok(MealPlan::create(
            gw,
            &NewMealPlan {
                date,
                meal_type,
                note,
                recipe_id,
                user_id: owner,
            },
        )
        .await?),
    }
}

#[instrument(skip(gw), err)]
pub async fn delete_meal(gw: &Gateway, meal_id: Uuid) -> AppResult<()> {
    MealPlan::delete(gw, meal_id).await?;
    Ok(())
}

/// Live meal-plan changes of one owner.
pub fn subscribe_meal_plans(gw: &Gateway, owner: Uuid) -> ChangeFeed<MealPlan> {
    gw.subscribe(Table::MealPlans, RowFilter::eq("user_id", owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ChangeEvent;
    use time::macros::date;

    #[tokio::test]
    async fn adding_twice_keeps_one_row_with_latest_note() {
        let (gw, mem) = Gateway::in_memory();
        let owner = Uuid::new_v4();
        let day = date!(2024 - 05 - 01);

        let first = add_meal(&gw, owner, day, MealType::Dinner, "Tacos", None).await.unwrap();
        let second = add_meal(&gw, owner, day, MealType::Dinner, "Curry", None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.note, "Curry");
        assert_eq!(mem.rows(Table::MealPlans).len(), 1);

        add_meal(&gw, owner, day, MealType::Lunch, "Soup", None).await.unwrap();
        assert_eq!(mem.rows(Table::MealPlans).len(), 2);
    }

    #[tokio::test]
    async fn range_is_inclusive_and_sorted() {
        let (gw, _) = Gateway::in_memory();
        let owner = Uuid::new_v4();
        for (day, note) in [
            (date!(2024 - 05 - 07), "last"),
            (date!(2024 - 05 - 01), "first"),
            (date!(2024 - 05 - 08), "outside"),
            (date!(2024 - 04 - 30), "before"),
        ] {
            add_meal(&gw, owner, day, MealType::Breakfast, note, None).await.unwrap();
        }
        add_meal(&gw, Uuid::new_v4(), date!(2024 - 05 - 03), MealType::Breakfast, "not mine", None)
            .await
            .unwrap();

        let plans = get_meal_plans(&gw, owner, date!(2024 - 05 - 01), date!(2024 - 05 - 07))
            .await
            .unwrap();
        let notes: Vec<_> = plans.iter().map(|p| p.note.as_str()).collect();
        assert_eq!(notes, ["first", "last"]);
    }

    #[tokio::test]
    async fn reversed_range_is_empty() {
        let (gw, _) = Gateway::in_memory();
        let owner = Uuid::new_v4();
        add_meal(&gw, owner, date!(2024 - 05 - 03), MealType::Dinner, "Pasta", None)
            .await
            .unwrap();

        let plans = get_meal_plans(&gw, owner, date!(2024 - 05 - 07), date!(2024 - 05 - 01))
            .await
            .unwrap();
        assert!(plans.is_empty());
    }

    #[tokio::test]
    async fn recipe_link_can_be_cleared() {
        let (gw, _) = Gateway::in_memory();
        let owner = Uuid::new_v4();
        let day = date!(2024 - 05 - 02);
        let recipe = Uuid::new_v4();

        let linked = add_meal(&gw, owner, day, MealType::Lunch, "", Some(recipe)).await.unwrap();
        assert_eq!(linked.recipe_id, Some(recipe));
        let cleared = add_meal(&gw, owner, day, MealType::Lunch, "", None).await.unwrap();
        assert_eq!(cleared.recipe_id, None);
    }

    #[tokio::test]
    async fn feed_follows_one_owner() {
        let (gw, _) = Gateway::in_memory();
        let owner = Uuid::new_v4();
        let mut feed = subscribe_meal_plans(&gw, owner);

        add_meal(&gw, Uuid::new_v4(), date!(2024 - 05 - 01), MealType::Lunch, "x", None)
            .await
            .unwrap();
        let mine = add_meal(&gw, owner, date!(2024 - 05 - 01), MealType::Lunch, "y", None)
            .await
            .unwrap();
        delete_meal(&gw, mine.id).await.unwrap();

        assert_eq!(feed.try_next(), Some(ChangeEvent::Inserted(mine.clone())));
        assert_eq!(feed.try_next(), Some(ChangeEvent::Deleted(mine.id)));
        assert_eq!(feed.try_next(), None);
    }
}
