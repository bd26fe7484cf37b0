use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::repo;
use super::repo_types::{Meal, MealPatch, NewMeal};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    storage::meal_preview_key,
};

pub struct Preview {
    pub body: Bytes,
    pub content_type: String,
}

/// Raw multipart fields of the add/change meal forms. Blank fields are `None`.
#[derive(Default)]
pub struct MealForm {
    pub name: Option<String>,
    pub calories: Option<String>,
    pub proteins: Option<String>,
    pub fats: Option<String>,
    pub carbohydrates: Option<String>,
    pub about: Option<String>,
    pub preview: Option<Preview>,
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub async fn read_meal_form(mut mp: Multipart) -> ApiResult<MealForm> {
    let mut form = MealForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "preview" {
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "image/jpeg".into());
            let body = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read preview: {e}")))?;
            if body.is_empty() {
                continue;
            }
            if !content_type.starts_with("image/") {
                return Err(ApiError::bad_request("Preview must be an image"));
            }
            form.preview = Some(Preview { body, content_type });
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read field {name}: {e}")))?;
        let slot = match name.as_str() {
            "name" => &mut form.name,
            "calories" => &mut form.calories,
            "proteins" => &mut form.proteins,
            "fats" => &mut form.fats,
            "carbohydrates" => &mut form.carbohydrates,
            "about" => &mut form.about,
            other => {
                debug!(field = other, "ignoring unknown form field");
                continue;
            }
        };
        *slot = non_blank(text);
    }
    Ok(form)
}

/// Per-100g quantity: finite and non-negative.
fn parse_nutrient(field: &str, raw: Option<String>) -> ApiResult<Option<f64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(ApiError::bad_request(format!(
            "{field} must be a non-negative number"
        ))),
    }
}

impl MealForm {
    fn split(self) -> ApiResult<(MealPatch, Option<Preview>)> {
        let patch = MealPatch {
            calories: parse_nutrient("calories", self.calories)?,
            proteins: parse_nutrient("proteins", self.proteins)?,
            fats: parse_nutrient("fats", self.fats)?,
            carbohydrates: parse_nutrient("carbohydrates", self.carbohydrates)?,
            name: self.name,
            about: self.about,
        };
        Ok((patch, self.preview))
    }

    /// Add-meal form: name and preview are required, nutrients default to zero.
    pub fn into_new(self) -> ApiResult<(NewMeal, Preview)> {
        let (patch, preview) = self.split()?;
        let name = patch
            .name
            .ok_or_else(|| ApiError::bad_request("Name is required"))?;
        let preview = preview.ok_or_else(|| ApiError::bad_request("Preview is required"))?;
        Ok((
            NewMeal {
                name,
                calories: patch.calories.unwrap_or(0.0),
                proteins: patch.proteins.unwrap_or(0.0),
                fats: patch.fats.unwrap_or(0.0),
                carbohydrates: patch.carbohydrates.unwrap_or(0.0),
                about: patch.about,
            },
            preview,
        ))
    }

    /// Change-meal form: every field optional, but a new preview is required.
    pub fn into_patch(self) -> ApiResult<(MealPatch, Preview)> {
        let (patch, preview) = self.split()?;
        if patch.is_empty() && preview.is_none() {
            return Err(ApiError::Unprocessable(
                "At least something needs to be changed".into(),
            ));
        }
        let preview = preview.ok_or_else(|| ApiError::bad_request("New preview is required"))?;
        Ok((patch, preview))
    }
}

async fn store_preview(st: &AppState, meal_id: Uuid, preview: Preview) -> anyhow::Result<()> {
    let key = meal_preview_key(meal_id);
    st.storage
        .put_object(&key, preview.body, &preview.content_type)
        .await
        .with_context(|| format!("put_object {}", key))
}

/// Inserts the meal and writes its preview. The row is rolled back if the
/// preview cannot be stored.
pub async fn create_meal(
    st: &AppState,
    author_id: Uuid,
    new: NewMeal,
    preview: Preview,
) -> anyhow::Result<Meal> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let meal = repo::insert_tx(&mut tx, author_id, &new).await?;
    store_preview(st, meal.id, preview).await?;
    if let Err(e) = tx.commit().await {
        // the preview would otherwise be orphaned
        if let Err(del) = st.storage.delete_object(&meal_preview_key(meal.id)).await {
            warn!(error = %del, meal_id = %meal.id, "orphaned preview not removed");
        }
        return Err(e).context("commit tx");
    }

    info!(meal_id = %meal.id, %author_id, "meal created");
    Ok(meal)
}

pub async fn update_meal(
    st: &AppState,
    caller: Uuid,
    meal_id: Uuid,
    patch: MealPatch,
    preview: Preview,
) -> ApiResult<Meal> {
    let mut meal = repo::get(&st.db, meal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal not found"))?;

    if meal.author_id != caller {
        return Err(ApiError::Forbidden(
            "Only the author can change this meal".into(),
        ));
    }

    patch.apply_to(&mut meal, OffsetDateTime::now_utc());

    let mut tx = st.db.begin().await.context("begin tx")?;
    let updated = repo::update_tx(&mut tx, &meal).await?;
    tx.commit().await.context("commit tx")?;
    // the preview key is fixed per meal, so it is only overwritten once the
    // row change is durable; a failed put leaves the previous image in place
    store_preview(st, meal_id, preview).await?;

    info!(%meal_id, author_id = %caller, "meal updated");
    Ok(updated)
}
