use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{ApprovalStatus, ExpenseCategory};
use crate::errors::{non_empty, positive, ModelError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub station_id: Uuid,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: f64,
    pub status: ApprovalStatus,
    pub submitted_by: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
    pub incurred_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewExpense {
    pub station_id: Uuid,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: f64,
    pub incurred_on: NaiveDate,
}

impl NewExpense {
    pub fn validate(&self) -> Result<(), ModelError> {
        non_empty(&self.description, "description")?;
        positive(self.amount, "amount")?;
        Ok(())
    }
}
