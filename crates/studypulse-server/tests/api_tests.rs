//! HTTP API tests against an in-memory store and a mock LLM provider.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use studypulse_core::generation::{GenerationConfig, QuestionGenerator};
use studypulse_core::model::{Role, User};
use studypulse_core::pdf::{DocumentError, DocumentExtractor};
use studypulse_core::service::QuizSettings;
use studypulse_core::{Storage, StudyService};
use studypulse_providers::mock::MockProvider;
use studypulse_server::auth::hash_password;
use studypulse_server::config::ServerConfig;
use studypulse_server::{api, AppState};

const GENERATED: &str = r#"{"questions": [
    {"type": "mcq", "question": "What is the first phase of wound healing?",
     "options": ["Hemostasis", "Inflammation", "Proliferation", "Remodeling"],
     "answer": "Hemostasis", "explanation": "Bleeding stops first.",
     "topic": "Wound Care", "difficulty": "easy"},
    {"type": "theory", "question": "List the phases of wound healing.",
     "answer": "Hemostasis, inflammation, proliferation and remodeling.",
     "topic": "Wound Care", "difficulty": "medium"}
]}"#;

/// Ignores the bytes and returns fixed study text.
struct FixedText;

impl DocumentExtractor for FixedText {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        if bytes.starts_with(b"%PDF-") {
            Ok("Wound healing proceeds through hemostasis, inflammation, \
                proliferation and remodeling."
                .into())
        } else {
            Err(DocumentError::NotPdf)
        }
    }
}

fn state_with(server: ServerConfig) -> web::Data<AppState> {
    let provider = Arc::new(MockProvider::with_fixed_response(GENERATED));
    let generator = QuestionGenerator::new(
        provider,
        GenerationConfig {
            retry_delay: Duration::ZERO,
            min_request_interval: Duration::ZERO,
            ..GenerationConfig::default()
        },
    );
    let service = StudyService::new(
        Storage::in_memory(),
        Arc::new(FixedText),
        generator,
        QuizSettings::default(),
    );
    web::Data::new(AppState::new(service, server, "test-secret"))
}

fn state() -> web::Data<AppState> {
    state_with(ServerConfig::default())
}

async fn seed_user(state: &AppState, email: &str, role: Role) -> (User, String) {
    let user = User {
        id: Uuid::new_v4(),
        email: email.into(),
        name: "Seeded".into(),
        password_hash: hash_password("password123").unwrap(),
        role,
        created_at: Utc::now(),
    };
    state.service.storage().users.insert(&user).await.unwrap();
    let token = state.jwt.issue(&user).unwrap();
    (user, token)
}

fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

fn multipart(field: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "studypulse-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"wounds.pdf\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

fn upload(token: &str, field: &str, content_type: &str, data: &[u8]) -> test::TestRequest {
    let (ct, body) = multipart(field, content_type, data);
    test::TestRequest::post()
        .uri("/api/admin/upload-pdf")
        .insert_header(bearer(token))
        .insert_header((CONTENT_TYPE, ct))
        .set_payload(body)
}

#[actix_web::test]
async fn health_is_public() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "status": "ok" }));
}

#[actix_web::test]
async fn register_login_and_me() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "email": "ada@example.com",
            "password": "secret1",
            "name": "Ada",
            "role": "admin"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["role"], "student", "admin self-signup is off");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "ADA@example.com", "password": "secret1", "name": "Ada" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "wrong-pw" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["message"], "Invalid email or password");
    assert_eq!(body["error"]["statusCode"], 401);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password_hash").is_none());

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn register_normalizes_email() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "  Ada@Example.COM ", "password": "secret1", "name": "Ada" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "ada@example.com");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ADA@EXAMPLE.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "ada@example.com");
}

#[actix_web::test]
async fn register_validates_input() {
    let app = test::init_service(App::new().app_data(state()).configure(api::configure)).await;

    let cases = [
        (json!({ "email": "a@b.c", "password": "123", "name": "A" }), "at least 6"),
        (json!({ "email": "a@b.c", "password": "123456" }), "All fields are required"),
        (json!({ "email": "nope", "password": "123456", "name": "A" }), "Invalid email"),
    ];
    for (payload, expected) in cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(
            body["error"]["message"].as_str().unwrap().contains(expected),
            "{body}"
        );
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .insert_header((CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_signup_when_enabled() {
    let state = state_with(ServerConfig {
        allow_admin_signup: true,
        ..ServerConfig::default()
    });
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "email": "lead@example.com",
            "password": "secret1",
            "name": "Lead",
            "role": "admin"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["role"], "admin");
}

#[actix_web::test]
async fn admin_routes_reject_students() {
    let state = state();
    let (_, student) = seed_user(&state, "s@example.com", Role::Student).await;
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    let req = test::TestRequest::get()
        .uri("/api/admin/questions")
        .insert_header(bearer(&student))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = upload(&student, "pdf", "application/pdf", b"%PDF-1.4 body").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/admin/questions")
        .insert_header(bearer("not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn upload_rejects_bad_files() {
    let state = state_with(ServerConfig {
        max_upload_bytes: 64,
        ..ServerConfig::default()
    });
    let (_, admin) = seed_user(&state, "admin@example.com", Role::Admin).await;
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    let req = upload(&admin, "document", "application/pdf", b"%PDF-1.4").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "No file uploaded");

    let req = upload(&admin, "pdf", "text/plain", b"%PDF-1.4").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Only PDF files are allowed");

    let req = upload(&admin, "pdf", "application/pdf", &[b'x'; 65]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let req = upload(&admin, "pdf", "application/pdf", b"not really a pdf").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn upload_then_quiz_round_trip() {
    let state = state();
    let (_, admin) = seed_user(&state, "admin@example.com", Role::Admin).await;
    let (_, student) = seed_user(&state, "student@example.com", Role::Student).await;
    let (_, other) = seed_user(&state, "other@example.com", Role::Student).await;
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    // no questions yet
    let req = test::TestRequest::get()
        .uri("/api/quiz/generate")
        .insert_header(bearer(&student))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"]["message"],
        "No questions found for the given criteria"
    );

    let req = upload(&admin, "pdf", "application/pdf", b"%PDF-1.4 wound care").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "PDF processed successfully");
    assert_eq!(body["questionsCount"], 2);
    assert_eq!(body["chunksProcessed"], 1);

    let req = test::TestRequest::get()
        .uri("/api/admin/questions?type=mcq&page=1&limit=5")
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["questions"][0]["answer"], "Hemostasis");
    assert_eq!(body["questions"][0]["source"], "wounds.pdf");

    let req = test::TestRequest::get()
        .uri("/api/quiz/generate?topic=Wound%20Care&count=5")
        .insert_header(bearer(&student))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert!(questions.iter().all(|q| q.get("answer").is_none()));

    let answers: Vec<Value> = questions
        .iter()
        .map(|q| {
            let answer = if q["type"] == "mcq" {
                "Hemostasis"
            } else {
                "hemostasis, inflammation, proliferation and remodeling"
            };
            json!({ "questionId": q["id"], "answer": answer })
        })
        .collect();
    let req = test::TestRequest::post()
        .uri("/api/quiz/submit")
        .insert_header(bearer(&student))
        .set_json(json!({ "answers": answers, "timeSpent": 95 }))
        .to_request();
    let result: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(result["totalQuestions"], 2);
    assert_eq!(result["correctAnswers"], 2);
    assert_eq!(result["score"], 100.0);
    assert_eq!(result["timeSpent"], 95);
    let attempt_id = result["attemptId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/quiz/history?page=1&limit=10")
        .insert_header(bearer(&student))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["attempts"][0]["id"], attempt_id.as_str());
    assert_eq!(body["attempts"][0]["topic"], "Wound Care");

    let req = test::TestRequest::get()
        .uri("/api/quiz/analytics")
        .insert_header(bearer(&student))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["quizAnalytics"]["totalAttempts"], 1);
    assert_eq!(body["quizAnalytics"]["averageScore"], 100.0);
    assert_eq!(body["questionAnalytics"].as_array().unwrap().len(), 2);

    let uri = format!("/api/quiz/attempts/{attempt_id}");
    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&student))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["attempt"]["answers"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&other))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/quiz/topics")
        .insert_header(bearer(&student))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["topics"][0]["name"], "Wound Care");
    assert_eq!(body["topics"][0]["questionCount"], 2);

    let req = test::TestRequest::get()
        .uri("/api/quiz/theory?topic=Wound%20Care")
        .insert_header(bearer(&student))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let theory = body["questions"].as_array().unwrap();
    assert_eq!(theory.len(), 1);
    assert!(theory[0]["answer"].as_str().unwrap().contains("remodeling"));
}

#[actix_web::test]
async fn submit_rejects_bad_answers() {
    let state = state();
    let (_, student) = seed_user(&state, "student@example.com", Role::Student).await;
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/quiz/submit")
        .insert_header(bearer(&student))
        .set_json(json!({ "answers": [], "timeSpent": 10 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/quiz/submit")
        .insert_header(bearer(&student))
        .set_json(json!({
            "answers": [{ "questionId": Uuid::new_v4(), "answer": "A" }],
            "timeSpent": 10
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let repeated = Uuid::new_v4();
    let req = test::TestRequest::post()
        .uri("/api/quiz/submit")
        .insert_header(bearer(&student))
        .set_json(json!({
            "answers": [
                { "questionId": repeated, "answer": "A" },
                { "questionId": repeated, "answer": "B" }
            ],
            "timeSpent": 10
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Duplicate question in submission");
    assert_eq!(body["error"]["statusCode"], 400);

    let req = test::TestRequest::post()
        .uri("/api/quiz/submit")
        .insert_header(bearer(&student))
        .set_json(json!({
            "answers": [{ "questionId": Uuid::new_v4(), "answer": "A" }],
            "timeSpent": -5
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Invalid time spent");

    let req = test::TestRequest::get()
        .uri("/api/quiz/generate?difficulty=impossible")
        .insert_header(bearer(&student))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn delete_question_by_id() {
    let state = state();
    let (_, admin) = seed_user(&state, "admin@example.com", Role::Admin).await;
    let app = test::init_service(App::new().app_data(state).configure(api::configure)).await;

    let req = upload(&admin, "pdf", "application/pdf", b"%PDF-1.4 wound care").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/admin/questions")
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["questions"][0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/admin/questions/{id}");
    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&admin))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Question deleted successfully");

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri("/api/admin/questions/not-a-uuid")
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
