use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Meal record. Nutrients are per 100 g.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub about: Option<String>,
    pub updated_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct MealWithAuthorRow {
    #[sqlx(flatten)]
    pub meal: Meal,
    pub author_username: String,
}

/// Validated input for a new meal; omitted nutrients are already zero.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub name: String,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub about: Option<String>,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealPatch {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub proteins: Option<f64>,
    pub fats: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub about: Option<String>,
}

impl MealPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.calories.is_none()
            && self.proteins.is_none()
            && self.fats.is_none()
            && self.carbohydrates.is_none()
            && self.about.is_none()
    }

    /// Overwrites supplied fields and stamps `updated_at`.
    pub fn apply_to(self, meal: &mut Meal, now: OffsetDateTime) {
        if let Some(name) = self.name {
            meal.name = name;
        }
        if let Some(v) = self.calories {
            meal.calories = v;
        }
        if let Some(v) = self.proteins {
            meal.proteins = v;
        }
        if let Some(v) = self.fats {
            meal.fats = v;
        }
        if let Some(v) = self.carbohydrates {
            meal.carbohydrates = v;
        }
        if let Some(about) = self.about {
            meal.about = Some(about);
        }
        meal.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn meal() -> Meal {
        Meal {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            name: "Porridge".into(),
            calories: 88.0,
            proteins: 3.2,
            fats: 1.9,
            carbohydrates: 15.0,
            about: Some("Oats and milk".into()),
            updated_at: datetime!(2024-01-01 08:00 UTC),
            created_at: datetime!(2024-01-01 08:00 UTC),
        }
    }

    #[test]
    fn single_field_patch_touches_only_that_field_and_timestamp() {
        let before = meal();
        let mut after = before.clone();
        let now = datetime!(2024-02-01 12:30 UTC);

        MealPatch {
            fats: Some(2.5),
            ..Default::default()
        }
        .apply_to(&mut after, now);

        assert_eq!(after.fats, 2.5);
        assert_eq!(after.updated_at, now);
        assert_eq!(
            Meal {
                fats: before.fats,
                updated_at: before.updated_at,
                ..after.clone()
            },
            before
        );
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(MealPatch::default().is_empty());
        assert!(!MealPatch {
            about: Some("x".into()),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn full_patch_overwrites_everything() {
        let mut m = meal();
        let now = datetime!(2024-03-01 00:00 UTC);
        MealPatch {
            name: Some("Granola".into()),
            calories: Some(450.0),
            proteins: Some(10.0),
            fats: Some(20.0),
            carbohydrates: Some(60.0),
            about: Some("Baked".into()),
        }
        .apply_to(&mut m, now);
        assert_eq!(m.name, "Granola");
        assert_eq!(m.calories, 450.0);
        assert_eq!(m.proteins, 10.0);
        assert_eq!(m.fats, 20.0);
        assert_eq!(m.carbohydrates, 60.0);
        assert_eq!(m.about.as_deref(), Some("Baked"));
    }
}
