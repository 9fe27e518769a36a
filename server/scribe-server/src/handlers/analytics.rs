use std::collections::BTreeMap;

use axum::{extract::State, Json};
use database_layer::{Filter, NoteStatus, Query as StoreQuery, Transcript, TranscriptStatus};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{api_success, ApiResponse, ApiResult};
use crate::middleware::AuthContext;
use crate::server::ScribeServer;

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsOverview {
    pub patients: u64,
    pub transcripts: u64,
    /// Keyed by status name.
    pub transcripts_by_status: BTreeMap<String, u64>,
    pub notes: u64,
    pub notes_by_status: BTreeMap<String, u64>,
    /// Mean upstream confidence over completed transcripts that report one.
    pub mean_confidence: Option<f64>,
}

fn mean_confidence(transcripts: &[Transcript]) -> Option<f64> {
    let values: Vec<f64> = transcripts.iter().filter_map(|t| t.confidence).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Counts for the caller's practice
#[utoipa::path(
    get,
    path = "/api/v1/analytics/overview",
    responses(
        (status = 200, description = "Practice overview", body = AnalyticsOverview),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Doctor role required")
    ),
    tag = "analytics",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(server, auth), fields(user_id = %auth.user_id))]
pub async fn overview(
    State(server): State<ScribeServer>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<AnalyticsOverview>>> {
    auth.require_doctor()?;
    let own = || Filter::new().eq("doctor_id", auth.user_id);

    let patients = server.db.patients.count(&own()?).await?;

    let mut transcripts_by_status = BTreeMap::new();
    for status in TranscriptStatus::ALL {
        let count = server.db.transcripts.count(&own()?.eq("status", status)?).await?;
        transcripts_by_status.insert(status.as_str().to_string(), count);
    }

    let mut notes_by_status = BTreeMap::new();
    for status in NoteStatus::ALL {
        let count = server.db.notes.count(&own()?.eq("status", status)?).await?;
        notes_by_status.insert(status.as_str().to_string(), count);
    }

    let completed = server
        .db
        .transcripts
        .find(&StoreQuery::filter(own()?.eq("status", TranscriptStatus::Completed)?))
        .await?;

    Ok(Json(api_success(AnalyticsOverview {
        patients,
        transcripts: transcripts_by_status.values().sum(),
        transcripts_by_status,
        notes: notes_by_status.values().sum(),
        notes_by_status,
        mean_confidence: mean_confidence(&completed),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn mean_stays_within_confidence_bounds(values in prop::collection::vec(0.0f64..=1.0, 1..20)) {
            let transcripts: Vec<Transcript> = values
                .iter()
                .map(|c| {
                    let audio = database_layer::AudioReference {
                        file_name: "a.wav".into(),
                        mime_type: "audio/wav".into(),
                        size_bytes: 1,
                        sha256: "00".into(),
                        storage_path: "a.wav".into(),
                    };
                    let mut t = Transcript::processing(uuid::Uuid::new_v4(), None, "A", "en", audio);
                    t.complete("x".into(), Some(*c), None, Vec::new(), "model");
                    t
                })
                .collect();
            let mean = mean_confidence(&transcripts).unwrap();
            prop_assert!((0.0..=1.0).contains(&mean));
        }
    }

    #[test]
    fn no_confidence_means_no_mean() {
        assert_eq!(mean_confidence(&[]), None);
    }
}
