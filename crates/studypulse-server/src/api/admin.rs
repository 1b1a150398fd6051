use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use studypulse_core::service::IngestReport;

use super::{parse_filter, parse_id};
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the document.
const UPLOAD_FIELD: &str = "pdf";
const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub difficulty: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    message: &'static str,
    #[serde(flatten)]
    report: IngestReport,
}

fn multipart_err(e: actix_multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("invalid multipart body: {e}"))
}

/// Read a field to the end, failing once it grows past `limit` bytes.
async fn read_limited(field: &mut Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_err)? {
        if bytes.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "File exceeds the {limit} byte upload limit"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[instrument(skip_all, fields(admin = %admin.0.id))]
pub async fn upload_pdf(
    admin: AdminUser,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let limit = state.server.max_upload_bytes;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_err)? {
        if field.name() != Some(UPLOAD_FIELD) || upload.is_some() {
            // drain fields we do not use
            while field.try_next().await.map_err(multipart_err)?.is_some() {}
            continue;
        }
        let is_pdf = field
            .content_type()
            .is_some_and(|mime| mime.essence_str() == PDF_MIME);
        if !is_pdf {
            return Err(ApiError::Validation("Only PDF files are allowed".into()));
        }
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("upload.pdf")
            .to_string();
        let bytes = read_limited(&mut field, limit).await?;
        upload = Some((filename, bytes));
    }

    let (filename, bytes) = upload
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| ApiError::Validation("No file uploaded".into()))?;
    info!(%filename, bytes = bytes.len(), "processing upload");

    let report = state
        .service
        .ingest_document(bytes, &filename, admin.0.id)
        .await?;
    Ok(HttpResponse::Ok().json(UploadResponse {
        message: "PDF processed successfully",
        report,
    }))
}

pub async fn list_questions(
    _admin: AdminUser,
    state: web::Data<AppState>,
    query: web::Query<QuestionsQuery>,
) -> Result<HttpResponse, ApiError> {
    let QuestionsQuery {
        topic,
        kind,
        difficulty,
        page,
        limit,
    } = query.into_inner();
    let filter = parse_filter(topic, kind.as_deref(), difficulty.as_deref())?;
    let page = state.service.list_questions(&filter, page, limit).await?;
    Ok(HttpResponse::Ok().json(json!({
        "questions": page.items,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

pub async fn delete_question(
    _admin: AdminUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path, "Question")?;
    state.service.delete_question(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Question deleted successfully" })))
}
