use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::dto::{DateRange, DinnerEntry};

pub async fn insert(db: &PgPool, user_id: Uuid, meal_id: Uuid, date: Date) -> anyhow::Result<DinnerEntry> {
    let row = sqlx::query_as::<_, DinnerEntry>(
        r#"
        WITH d AS (
            INSERT INTO dinners (user_id, meal_id, date)
            VALUES ($1, $2, $3)
            RETURNING id, meal_id, date
        )
        SELECT d.id, d.meal_id, m.name AS meal_name, d.date
          FROM d
          JOIN meals m ON m.id = d.meal_id
        "#,
    )
    .bind(user_id)
    .bind(meal_id)
    .bind(date)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn list_in_range(db: &PgPool, user_id: Uuid, range: DateRange) -> anyhow::Result<Vec<DinnerEntry>> {
    let rows = sqlx::query_as::<_, DinnerEntry>(
        r#"
        SELECT d.id, d.meal_id, m.name AS meal_name, d.date
          FROM dinners d
          JOIN meals m ON m.id = d.meal_id
         WHERE d.user_id = $1 AND d.date >= $2 AND d.date <= $3
         ORDER BY d.date, d.created_at, d.id
        "#,
    )
    .bind(user_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
