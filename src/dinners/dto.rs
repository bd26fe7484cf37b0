use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LogDinnerRequest {
    /// Exact meal name, as in the meal catalog.
    pub name: String,
}

/// Inclusive calendar range, `?from=2024-01-01&to=2024-01-31`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

impl DateRange {
    pub fn is_inverted(&self) -> bool {
        self.from > self.to
    }

    pub fn contains(&self, date: Date) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct DinnerEntry {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub meal_name: String,
    pub date: Date,
}
