//! JSON API routes under `/api`.

use actix_web::{web, HttpResponse};
use serde_json::json;

use studypulse_core::model::{Difficulty, QuestionFilter, QuestionType};

use crate::error::ApiError;

pub mod admin;
pub mod auth;
pub mod quiz;

/// Register every route. Shared by `serve` and the API tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            .service(
                web::scope("/admin")
                    .route("/upload-pdf", web::post().to(admin::upload_pdf))
                    .route("/questions", web::get().to(admin::list_questions))
                    .route("/questions/{id}", web::delete().to(admin::delete_question)),
            )
            .service(
                web::scope("/quiz")
                    .route("/generate", web::get().to(quiz::generate))
                    .route("/submit", web::post().to(quiz::submit))
                    .route("/analytics", web::get().to(quiz::analytics))
                    .route("/history", web::get().to(quiz::history))
                    .route("/attempts/{id}", web::get().to(quiz::attempt))
                    .route("/topics", web::get().to(quiz::topics))
                    .route("/theory", web::get().to(quiz::theory)),
            ),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Build a filter from raw query values. Blank values match everything.
pub(crate) fn parse_filter(
    topic: Option<String>,
    kind: Option<&str>,
    difficulty: Option<&str>,
) -> Result<QuestionFilter, ApiError> {
    Ok(QuestionFilter {
        topic: topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        kind: present(kind)
            .map(str::parse::<QuestionType>)
            .transpose()
            .map_err(ApiError::Validation)?,
        difficulty: present(difficulty)
            .map(str::parse::<Difficulty>)
            .transpose()
            .map_err(ApiError::Validation)?,
    })
}

/// Parse a path id, reporting `what` as missing when it is not a UUID.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{what} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filter_values_match_everything() {
        let filter = parse_filter(Some("  ".into()), Some(""), None).unwrap();
        assert_eq!(filter, QuestionFilter::default());
    }

    #[test]
    fn filter_values_are_parsed() {
        let filter = parse_filter(Some("Cardiology".into()), Some("MCQ"), Some("hard")).unwrap();
        assert_eq!(filter.topic.as_deref(), Some("Cardiology"));
        assert_eq!(filter.kind, Some(QuestionType::Mcq));
        assert_eq!(filter.difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn bad_filter_values_are_rejected() {
        let err = parse_filter(None, Some("essay-ish"), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(parse_filter(None, None, Some("brutal")).is_err());
    }

    #[test]
    fn non_uuid_ids_are_not_found() {
        let err = parse_id("507f1f77bcf86cd799439011", "Question").unwrap_err();
        assert_eq!(err.to_string(), "Question not found");
    }
}
