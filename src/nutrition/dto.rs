use serde::Serialize;
use time::Date;

use super::aggregate::{DailyNutrition, Nutrients};
use crate::dinners::dto::DateRange;

#[derive(Debug, Serialize)]
pub struct DayReport {
    pub date: Date,
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

/// CPFC report for one user over an inclusive date range.
#[derive(Debug, Serialize)]
pub struct CpfcReport {
    pub from: Date,
    pub to: Date,
    pub days: Vec<DayReport>,
    pub totals: Nutrients,
    pub chart_url: String,
}

impl CpfcReport {
    pub fn new(range: DateRange, daily: &DailyNutrition, chart_url: String) -> Self {
        Self {
            from: range.from,
            to: range.to,
            days: daily
                .days()
                .map(|(date, nutrients)| DayReport { date, nutrients })
                .collect(),
            totals: daily.totals(),
            chart_url,
        }
    }
}
