use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::aggregate::{DailyNutrition, Nutrient};
use super::dto::CpfcReport;
use super::chart::{self, Panel};
use super::repo;
use crate::{dinners::dto::DateRange, state::AppState, storage::chart_key};

const CHART_URL_TTL_SECS: u64 = 30 * 60;

/// Aggregates the user's dinners in `range` and publishes the per-nutrient chart.
pub async fn build_report(st: &AppState, user_id: Uuid, range: DateRange) -> anyhow::Result<CpfcReport> {
    let rows = if range.is_inverted() {
        warn!(%user_id, from = %range.from, to = %range.to, "inverted range, nothing to aggregate");
        Vec::new()
    } else {
        repo::dinner_nutrients(&st.db, user_id, range).await?
    };
    debug!(%user_id, dinners = rows.len(), "dinners loaded");

    let daily = DailyNutrition::aggregate(range, rows);
    if daily.is_empty() {
        debug!(%user_id, "no dinners in range");
    }
    let chart_url = publish_chart(st, user_id, range, &daily).await?;

    info!(%user_id, from = %range.from, to = %range.to, "cpfc report built");
    Ok(CpfcReport::new(range, &daily, chart_url))
}

/// Renders one bar panel per nutrient and stores the image under the
/// (user, range) key, replacing any earlier chart for the same key.
pub async fn publish_chart(
    st: &AppState,
    user_id: Uuid,
    range: DateRange,
    daily: &DailyNutrition,
) -> anyhow::Result<String> {
    let panels: Vec<Panel> = Nutrient::ALL
        .iter()
        .map(|n| Panel {
            title: n.label(),
            bars: daily.series(*n).into_iter().collect(),
        })
        .collect();
    let png = tokio::task::spawn_blocking(move || chart::render_panels(&panels))
        .await
        .context("chart render task")??;

    let key = chart_key(user_id, range.from, range.to);
    st.storage
        .put_object(&key, Bytes::from(png), "image/png")
        .await
        .with_context(|| format!("put_object {}", key))?;
    st.storage.presign_get(&key, CHART_URL_TTL_SECS).await
}
