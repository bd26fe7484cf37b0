//! Per-day CPFC sums over a user's dinners.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::Serialize;
use sqlx::FromRow;
use time::Date;

use crate::dinners::dto::DateRange;

/// Calories, proteins, fats and carbohydrates of one meal or one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, FromRow)]
pub struct Nutrients {
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
}

impl AddAssign for Nutrients {
    fn add_assign(&mut self, rhs: Self) {
        self.calories += rhs.calories;
        self.proteins += rhs.proteins;
        self.fats += rhs.fats;
        self.carbohydrates += rhs.carbohydrates;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    Calories,
    Proteins,
    Fats,
    Carbohydrates,
}

impl Nutrient {
    pub const ALL: [Nutrient; 4] = [
        Nutrient::Calories,
        Nutrient::Proteins,
        Nutrient::Fats,
        Nutrient::Carbohydrates,
    ];

    pub fn of(self, n: &Nutrients) -> f64 {
        match self {
            Nutrient::Calories => n.calories,
            Nutrient::Proteins => n.proteins,
            Nutrient::Fats => n.fats,
            Nutrient::Carbohydrates => n.carbohydrates,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Calories => "Calories",
            Nutrient::Proteins => "Proteins",
            Nutrient::Fats => "Fats",
            Nutrient::Carbohydrates => "Carbohydrates",
        }
    }
}

/// One dinner joined with the nutrients of its meal.
#[derive(Debug, Clone, FromRow)]
pub struct DinnerNutrients {
    pub date: Date,
    #[sqlx(flatten)]
    pub nutrients: Nutrients,
}

/// Per-day totals, iterated in ascending date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyNutrition {
    days: BTreeMap<Date, Nutrients>,
}

impl DailyNutrition {
    /// Sums every dinner inside `range`; rows outside it are ignored, so an
    /// inverted range yields nothing.
    pub fn aggregate(range: DateRange, rows: impl IntoIterator<Item = DinnerNutrients>) -> Self {
        let mut days: BTreeMap<Date, Nutrients> = BTreeMap::new();
        for row in rows.into_iter().filter(|r| range.contains(r.date)) {
            *days.entry(row.date).or_default() += row.nutrients;
        }
        Self { days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = (Date, Nutrients)> + '_ {
        self.days.iter().map(|(d, n)| (*d, *n))
    }

    /// One nutrient keyed by ISO date (`2024-01-01`).
    pub fn series(&self, nutrient: Nutrient) -> BTreeMap<String, f64> {
        self.days
            .iter()
            .map(|(d, n)| (d.to_string(), nutrient.of(n)))
            .collect()
    }

    pub fn totals(&self) -> Nutrients {
        let mut total = Nutrients::default();
        for n in self.days.values() {
            total += *n;
        }
        total
    }
}
