use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
    #[serde(default)]
    pub budget: Option<f64>,
}

/// `{"budget": null}` removes the budget.
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub budget: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    pub list_id: Uuid,
    pub total_spent: f64,
}
