use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use profego_core::{file_type_label, FileInfo, Tier, PROCESSED_TYPE_LABEL};
use profego_storage::ArtifactSummary;
use std::sync::Arc;

fn file_info(summary: ArtifactSummary) -> FileInfo {
    let file_type = match summary.tier {
        Tier::Original => file_type_label(&summary.name),
        Tier::Processed => PROCESSED_TYPE_LABEL,
    };
    FileInfo {
        // Debug formatting keeps the decimal point on whole numbers ("0.0 MB").
        size: format!("{:?} MB", summary.size_mb()),
        date: summary.date(),
        file_type: file_type.to_string(),
        category: summary.tier,
        name: summary.name,
    }
}

#[utoipa::path(
    get,
    path = "/api/files/list",
    tag = "files",
    responses(
        (status = 200, description = "Originals followed by processed artifacts", body = Vec<FileInfo>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user = %user.email, operation = "list_files"))]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<Vec<FileInfo>>, HttpAppError> {
    let mut files = Vec::new();
    for tier in Tier::ALL {
        let summaries = state.artifacts.list(&user.email, tier).await?;
        files.extend(summaries.into_iter().map(file_info));
    }

    Ok(Json(files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_file_info_labels() {
        let summary = ArtifactSummary {
            name: "informe.pdf".to_string(),
            tier: Tier::Original,
            size_bytes: 1536 * 1024,
            last_modified: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap(),
        };
        let info = file_info(summary);
        assert_eq!(info.file_type, "PDF");
        assert_eq!(info.size, "1.5 MB");
        assert_eq!(info.date, "2024-03-05 14:07");

        let processed = ArtifactSummary {
            name: "informe_procesado.txt".to_string(),
            tier: Tier::Processed,
            size_bytes: 10,
            last_modified: Utc::now(),
        };
        let info = file_info(processed);
        assert_eq!(info.file_type, "TXT Procesado");
        assert_eq!(info.size, "0.0 MB");
        assert_eq!(info.category, Tier::Processed);
    }
}
