use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Meal;

#[derive(Debug, Serialize)]
pub struct MealSummary {
    pub id: Uuid,
    pub name: String,
    pub author_id: Uuid,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub about: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Meal> for MealSummary {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            name: m.name,
            author_id: m.author_id,
            calories: m.calories,
            proteins: m.proteins,
            fats: m.fats,
            carbohydrates: m.carbohydrates,
            about: m.about,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealAuthor {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MealDetails {
    #[serde(flatten)]
    pub meal: MealSummary,
    pub author: MealAuthor,
    pub preview_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent")]
    pub limit: i64,
}

fn default_recent() -> i64 {
    10
}
