use sqlx::PgPool;
use uuid::Uuid;

use crate::meals::repo_types::Meal;

/// Records the follow. Returns false when the pair already existed.
pub async fn subscribe(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO subscriptions (user_id, meal_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, meal_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(meal_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Meals the user follows, oldest subscription first, in one join.
pub async fn list_meals_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(
        r#"
        SELECT m.id, m.author_id, m.name, m.calories, m.proteins, m.fats, m.carbohydrates,
               m.about, m.updated_at, m.created_at
          FROM subscriptions s
          JOIN meals m ON m.id = s.meal_id
         WHERE s.user_id = $1
         ORDER BY s.created_at ASC, s.id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
