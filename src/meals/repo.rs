use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Meal, MealWithAuthorRow, NewMeal};

pub const MEAL_COLUMNS: &str =
    "id, author_id, name, calories, proteins, fats, carbohydrates, about, updated_at, created_at";

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(&format!(
        "SELECT {MEAL_COLUMNS} FROM meals ORDER BY updated_at DESC, id"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Most recently updated meals first.
pub async fn list_recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(&format!(
        "SELECT {MEAL_COLUMNS} FROM meals ORDER BY updated_at DESC, id LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Exact name match.
pub async fn find_by_name(db: &PgPool, name: &str) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(&format!(
        "SELECT {MEAL_COLUMNS} FROM meals WHERE name = $1 ORDER BY updated_at DESC, id"
    ))
    .bind(name)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
    let row = sqlx::query_as::<_, Meal>(&format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1"))
        .bind(meal_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn get_with_author(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Option<MealWithAuthorRow>> {
    let row = sqlx::query_as::<_, MealWithAuthorRow>(
        r#"
        SELECT m.id, m.author_id, m.name, m.calories, m.proteins, m.fats, m.carbohydrates,
               m.about, m.updated_at, m.created_at, u.username AS author_username
          FROM meals m
          JOIN users u ON u.id = m.author_id
         WHERE m.id = $1
        "#,
    )
    .bind(meal_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    author_id: Uuid,
    new: &NewMeal,
) -> anyhow::Result<Meal> {
    let meal = sqlx::query_as::<_, Meal>(&format!(
        r#"
        INSERT INTO meals (author_id, name, calories, proteins, fats, carbohydrates, about)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(author_id)
    .bind(&new.name)
    .bind(new.calories)
    .bind(new.proteins)
    .bind(new.fats)
    .bind(new.carbohydrates)
    .bind(&new.about)
    .fetch_one(&mut **tx)
    .await?;
    Ok(meal)
}

/// Writes every mutable column of `meal`. Scoped to the author so a
/// concurrent ownership change cannot slip through.
pub async fn update_tx(tx: &mut Transaction<'_, Postgres>, meal: &Meal) -> anyhow::Result<Meal> {
    let updated = sqlx::query_as::<_, Meal>(&format!(
        r#"
        UPDATE meals
           SET name = $3, calories = $4, proteins = $5, fats = $6,
               carbohydrates = $7, about = $8, updated_at = $9
         WHERE id = $1 AND author_id = $2
        RETURNING {MEAL_COLUMNS}
        "#
    ))
    .bind(meal.id)
    .bind(meal.author_id)
    .bind(&meal.name)
    .bind(meal.calories)
    .bind(meal.proteins)
    .bind(meal.fats)
    .bind(meal.carbohydrates)
    .bind(&meal.about)
    .bind(meal.updated_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(updated)
}

pub async fn exists(db: &PgPool, meal_id: Uuid) -> anyhow::Result<bool> {
    let (found,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM meals WHERE id = $1)")
        .bind(meal_id)
        .fetch_one(db)
        .await?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use crate::meals::repo_types::MealPatch;
    use time::OffsetDateTime;

    async fn author(db: &PgPool) -> User {
        User::create(db, "chef", "chef@example.com", Some(40), "$argon2id$stub")
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn create_then_fetch_returns_same_fields(db: PgPool) {
        let user = author(&db).await;
        let new = NewMeal {
            name: "Omelette".into(),
            calories: 154.0,
            proteins: 11.0,
            fats: 12.0,
            carbohydrates: 0.0,
            about: None,
        };
        let mut tx = db.begin().await.unwrap();
        let created = insert_tx(&mut tx, user.id, &new).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = get(&db, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.author_id, user.id);
        assert_eq!(fetched.name, new.name);
        assert_eq!(fetched.carbohydrates, 0.0);
        assert_eq!(fetched.about, None);

        let row = get_with_author(&db, created.id).await.unwrap().unwrap();
        assert_eq!(row.author_username, "chef");
        assert!(exists(&db, created.id).await.unwrap());
        assert!(!exists(&db, Uuid::new_v4()).await.unwrap());
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn single_field_update_persists_only_that_field(db: PgPool) {
        let user = author(&db).await;
        let new = NewMeal {
            name: "Salad".into(),
            calories: 40.0,
            proteins: 2.0,
            fats: 1.0,
            carbohydrates: 6.0,
            about: Some("Greens".into()),
        };
        let mut tx = db.begin().await.unwrap();
        let before = insert_tx(&mut tx, user.id, &new).await.unwrap();
        tx.commit().await.unwrap();

        let mut meal = before.clone();
        MealPatch {
            calories: Some(55.0),
            ..Default::default()
        }
        .apply_to(&mut meal, OffsetDateTime::now_utc());

        let mut tx = db.begin().await.unwrap();
        let after = update_tx(&mut tx, &meal).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(after.calories, 55.0);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(
            Meal {
                calories: before.calories,
                updated_at: before.updated_at,
                ..after
            },
            before
        );
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn recent_and_search(db: PgPool) {
        let user = author(&db).await;
        for name in ["Soup", "Bread", "Soup"] {
            let mut tx = db.begin().await.unwrap();
            insert_tx(
                &mut tx,
                user.id,
                &NewMeal {
                    name: name.into(),
                    calories: 0.0,
                    proteins: 0.0,
                    fats: 0.0,
                    carbohydrates: 0.0,
                    about: None,
                },
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }
        assert_eq!(find_by_name(&db, "Soup").await.unwrap().len(), 2);
        assert!(find_by_name(&db, "soup").await.unwrap().is_empty());
        assert_eq!(list_recent(&db, 2).await.unwrap().len(), 2);
        assert_eq!(list_all(&db).await.unwrap().len(), 3);
    }
}
