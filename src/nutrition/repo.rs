use sqlx::PgPool;
use uuid::Uuid;

use super::aggregate::DinnerNutrients;
use crate::dinners::dto::DateRange;

/// The user's dinners in the inclusive range, each joined with its meal's
/// nutrients in a single query.
pub async fn dinner_nutrients(
    db: &PgPool,
    user_id: Uuid,
    range: DateRange,
) -> anyhow::Result<Vec<DinnerNutrients>> {
    let rows = sqlx::query_as::<_, DinnerNutrients>(
        r#"
        SELECT d.date, m.calories, m.proteins, m.fats, m.carbohydrates
          FROM dinners d
          JOIN meals m ON m.id = d.meal_id
         WHERE d.user_id = $1 AND d.date >= $2 AND d.date <= $3
         ORDER BY d.date, d.id
        "#,
    )
    .bind(user_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use crate::meals::repo::insert_tx;
    use crate::meals::repo_types::NewMeal;
    use crate::nutrition::aggregate::{DailyNutrition, Nutrient};
    use crate::nutrition::chart::BAR_COLOR;
    use crate::nutrition::services::build_report;
    use crate::state::AppState;
    use crate::storage::{chart_key, MemoryStorage};
    use crate::subscriptions;
    use std::sync::Arc;
    use time::macros::date;

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn scenario_two_days_of_dinners(db: PgPool) {
        let user = User::create(&db, "u", "u@example.com", None, "$argon2id$stub")
            .await
            .unwrap();
        let mut tx = db.begin().await.unwrap();
        let meal = insert_tx(
            &mut tx,
            user.id,
            &NewMeal {
                name: "M".into(),
                calories: 200.0,
                proteins: 0.0,
                fats: 0.0,
                carbohydrates: 0.0,
                about: None,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        for d in [date!(2024 - 01 - 01), date!(2024 - 01 - 01), date!(2024 - 01 - 02)] {
            crate::dinners::repo::insert(&db, user.id, meal.id, d).await.unwrap();
        }
        // outside the range
        crate::dinners::repo::insert(&db, user.id, meal.id, date!(2024 - 01 - 03))
            .await
            .unwrap();

        let range = DateRange {
            from: date!(2024 - 01 - 01),
            to: date!(2024 - 01 - 02),
        };
        let rows = dinner_nutrients(&db, user.id, range).await.unwrap();
        assert_eq!(rows.len(), 3);

        let calories = DailyNutrition::aggregate(range, rows).series(Nutrient::Calories);
        assert_eq!(calories.len(), 2);
        assert_eq!(calories["2024-01-01"], 400.0);
        assert_eq!(calories["2024-01-02"], 200.0);

        let inverted = DateRange {
            from: range.to,
            to: range.from,
        };
        assert!(dinner_nutrients(&db, user.id, inverted).await.unwrap().is_empty());

        let storage = MemoryStorage::default();
        let state = AppState {
            storage: Arc::new(storage.clone()),
            ..AppState::fake_with_pool(db.clone())
        };
        let report = build_report(&state, user.id, range).await.unwrap();
        assert_eq!(report.days.len(), 2);
        assert_eq!(report.totals.calories, 600.0);
        let key = chart_key(user.id, range.from, range.to);
        let png = storage.objects.lock().unwrap().get(&key).cloned().unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        assert!(img.pixels().any(|p| p.0 == [BAR_COLOR.0, BAR_COLOR.1, BAR_COLOR.2]));

        // repeated subscribe keeps a single row
        assert!(subscriptions::repo::subscribe(&db, user.id, meal.id).await.unwrap());
        assert!(!subscriptions::repo::subscribe(&db, user.id, meal.id).await.unwrap());
        let subs = subscriptions::repo::list_meals_for_user(&db, user.id).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, meal.id);
    }
}
