//! Spending against a list budget.

use serde::{Deserialize, Serialize};

use super::repo_types::ShoppingItem;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub spent: f64,
    pub budget: f64,
    /// Share of the budget used, capped at 100.
    pub percentage: f64,
    pub over_budget: bool,
}

impl BudgetStatus {
    /// `None` when the list has no budget.
    pub fn compute(spent: f64, budget: Option<f64>) -> Option<Self> {
        let budget = budget?;
        let percentage = if budget > 0.0 {
            (spent / budget * 100.0).min(100.0)
        } else if spent > 0.0 {
            100.0
        } else {
            0.0
        };
        Some(Self {
            spent,
            budget,
            percentage,
            over_budget: spent > budget,
        })
    }
}

/// Sum of prices over checked items that carry one.
pub fn total_spent<'a>(items: impl IntoIterator<Item = &'a ShoppingItem>) -> f64 {
    items
        .into_iter()
        .filter(|i| i.checked)
        .filter_map(|i| i.price)
        .sum()
}

pub fn validate_budget(budget: Option<f64>) -> Result<(), String> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => Err("Budget must be a non-negative amount".into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(name: &str, checked: bool, price: Option<f64>) -> ShoppingItem {
        ShoppingItem {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity: "1".into(),
            checked,
            price,
            list_id: Uuid::nil(),
            created_at: None,
        }
    }

    #[test]
    fn only_checked_priced_items_count() {
        let items = vec![
            item("Milk", true, Some(4.5)),
            item("Bread", false, None),
            item("Eggs", false, Some(3.0)),
            item("Jam", true, None),
        ];
        assert_eq!(total_spent(&items), 4.5);
    }

    #[test]
    fn status_within_and_over_budget() {
        let within = BudgetStatus::compute(4.5, Some(50.0)).unwrap();
        assert!(!within.over_budget);
        assert!((within.percentage - 9.0).abs() < 1e-9);

        let over = BudgetStatus::compute(60.0, Some(50.0)).unwrap();
        assert!(over.over_budget);
        assert_eq!(over.percentage, 100.0);

        let exact = BudgetStatus::compute(50.0, Some(50.0)).unwrap();
        assert!(!exact.over_budget);

        assert!(BudgetStatus::compute(10.0, None).is_none());
    }

    #[test]
    fn zero_budget_has_no_division() {
        assert_eq!(BudgetStatus::compute(0.0, Some(0.0)).unwrap().percentage, 0.0);
        let spent = BudgetStatus::compute(1.0, Some(0.0)).unwrap();
        assert_eq!(spent.percentage, 100.0);
        assert!(spent.over_budget);
    }

    #[test]
    fn negative_budget_is_rejected() {
        assert!(validate_budget(Some(-1.0)).is_err());
        assert!(validate_budget(Some(f64::NAN)).is_err());
        assert!(validate_budget(Some(0.0)).is_ok());
        assert!(validate_budget(None).is_ok());
    }
}
