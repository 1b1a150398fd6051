use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use studypulse_core::model::SubmittedAnswer;

use super::{parse_filter, parse_id};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub difficulty: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    #[serde(default)]
    pub time_spent: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub topic: Option<String>,
}

pub async fn generate(
    _user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<GenerateQuery>,
) -> Result<HttpResponse, ApiError> {
    let GenerateQuery {
        topic,
        kind,
        difficulty,
        count,
    } = query.into_inner();
    let filter = parse_filter(topic, kind.as_deref(), difficulty.as_deref())?;
    let questions = state.service.generate_quiz(&filter, count).await?;
    Ok(HttpResponse::Ok().json(json!({ "questions": questions })))
}

pub async fn submit(
    user: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<SubmitRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = state
        .service
        .submit_quiz(user.id, &body.answers, body.time_spent)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn analytics(
    user: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let report = state.service.analytics(user.id).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn history(
    user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = state
        .service
        .history(user.id, query.page, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "attempts": page.items,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

pub async fn attempt(
    user: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path, "Quiz attempt")?;
    let attempt = state.service.attempt(user.id, user.role, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "attempt": attempt })))
}

pub async fn topics(_user: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let topics = state.service.topics().await?;
    Ok(HttpResponse::Ok().json(json!({ "topics": topics })))
}

pub async fn theory(
    _user: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<TopicQuery>,
) -> Result<HttpResponse, ApiError> {
    let topic = query
        .into_inner()
        .topic
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let questions = state.service.theory_questions(topic).await?;
    Ok(HttpResponse::Ok().json(json!({ "questions": questions })))
}
