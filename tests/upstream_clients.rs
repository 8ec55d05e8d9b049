//! Integration tests for the outbound HTTP clients.
//!
//! Each test starts a fake upstream (Firestore, Dialogflow CX, the prediction
//! functions, Huawei Health) on a random port and points the real client at it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;

use cardio_assist::auth::{StaticTokenSource, TokenSource};
use cardio_assist::config::{
    CredentialSource, DialogflowConfig, FirestoreConfig, PredictionConfig, WearableConfig,
};
use cardio_assist::error::{StoreError, UpstreamError};
use cardio_assist::intent::{DialogflowClient, IntentGateway};
use cardio_assist::predict::{CloudFunctionModels, HealthModels, RecommendationRequest, RiskRequest};
use cardio_assist::store::{FirestoreUserStore, ProfileUpdate, UserProfile, UserStore, WearableTokens};
use cardio_assist::wearable::{HuaweiHealthClient, WearableApi};

const TOKEN: &str = "ya29.test-token";

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

fn tokens() -> Arc<dyn TokenSource> {
    Arc::new(StaticTokenSource::new(SecretString::from(TOKEN)))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn profile() -> UserProfile {
    UserProfile {
        name: "Lucía".into(),
        age: 54.0,
        gender: "1".into(),
        height: 168.0,
        weight: 72.5,
        ap_hi: 130.0,
        ap_lo: 85.0,
        cholesterol: 2.0,
        gluc: 1.0,
        smoke: false,
        alco: true,
        active: true,
        registered_at: DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
        wearable_access_token: None,
        wearable_refresh_token: None,
    }
}

// ── Firestore ───────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct FakeFirestore {
    docs: Arc<Mutex<HashMap<String, Map<String, Value>>>>,
}

fn query_pairs(raw: Option<String>) -> Vec<(String, String)> {
    let raw = raw.unwrap_or_default();
    reqwest::Url::parse(&format!("http://fake/?{raw}"))
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

async fn fs_get(
    State(fs): State<FakeFirestore>,
    Path((_project, _database, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({}))).into_response();
    }
    match fs.docs.lock().unwrap().get(&id) {
        Some(fields) => Json(json!({ "name": id, "fields": fields })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": {"code": 404}}))).into_response(),
    }
}

async fn fs_patch(
    State(fs): State<FakeFirestore>,
    Path((_project, _database, id)): Path<(String, String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let pairs = query_pairs(query);
    let mask: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == "updateMask.fieldPaths")
        .map(|(_, v)| v.as_str())
        .collect();
    let must_exist = pairs
        .iter()
        .any(|(k, v)| k == "currentDocument.exists" && v == "true");
    let fields = body["fields"].as_object().cloned().unwrap_or_default();

    let mut docs = fs.docs.lock().unwrap();
    if mask.is_empty() {
        docs.insert(id, fields);
        return StatusCode::OK;
    }
    match docs.get_mut(&id) {
        Some(doc) => {
            for path in mask {
                if let Some(value) = fields.get(path) {
                    doc.insert(path.to_string(), value.clone());
                }
            }
            StatusCode::OK
        }
        None if must_exist => StatusCode::NOT_FOUND,
        None => {
            docs.insert(id, fields);
            StatusCode::OK
        }
    }
}

async fn fs_delete(State(fs): State<FakeFirestore>, Path((_project, _database, id)): Path<(String, String, String)>) -> StatusCode {
    match fs.docs.lock().unwrap().remove(&id) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

async fn start_firestore(token: &str) -> (FirestoreUserStore, FakeFirestore) {
    let fake = FakeFirestore::default();
    let app = Router::new()
        .route(
            "/v1/projects/{project}/databases/{database}/documents/usuarios/{id}",
            get(fs_get).patch(fs_patch).delete(fs_delete),
        )
        .with_state(fake.clone());
    let base = serve(app).await;

    let secret = SecretString::from(token.to_string());
    let config = FirestoreConfig {
        base_url: base,
        project_id: "asistente-cardiovascular".into(),
        database_id: "(default)".into(),
        collection: "usuarios".into(),
        credentials: CredentialSource::StaticToken(secret.clone()),
    };
    let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new(secret));
    (
        FirestoreUserStore::new(&config, reqwest::Client::new(), tokens),
        fake,
    )
}

#[tokio::test]
async fn firestore_set_get_update_delete() {
    let (store, fake) = start_firestore(TOKEN).await;

    assert!(store.get("34600111222").await.unwrap().is_none());

    store.set("34600111222", &profile()).await.unwrap();
    {
        let docs = fake.docs.lock().unwrap();
        let doc = &docs["34600111222"];
        assert_eq!(doc["name"], json!({"stringValue": "Lucía"}));
        assert_eq!(doc["alco"], json!({"booleanValue": true}));
        assert!(!doc.contains_key("huawei_access_token"));
    }
    assert_eq!(store.get("34600111222").await.unwrap(), Some(profile()));

    let tokens = WearableTokens {
        access_token: "at-1".into(),
        refresh_token: "rt-1".into(),
    };
    store
        .update("34600111222", &ProfileUpdate::wearable_tokens(&tokens))
        .await
        .unwrap();
    let updated = store.get("34600111222").await.unwrap().unwrap();
    assert_eq!(updated.wearable_tokens(), Some(tokens));
    assert_eq!(updated.name, "Lucía");

    store
        .update("34600111222", &ProfileUpdate::access_token("at-2"))
        .await
        .unwrap();
    let updated = store.get("34600111222").await.unwrap().unwrap();
    assert_eq!(updated.wearable_access_token.as_deref(), Some("at-2"));
    assert_eq!(updated.wearable_refresh_token.as_deref(), Some("rt-1"));

    store.delete("34600111222").await.unwrap();
    assert!(store.get("34600111222").await.unwrap().is_none());
    // Deleting again is not an error.
    store.delete("34600111222").await.unwrap();
}

#[tokio::test]
async fn firestore_partial_update_of_missing_document_is_not_found() {
    let (store, _fake) = start_firestore(TOKEN).await;
    let err = store
        .update("nobody", &ProfileUpdate::access_token("at"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == "nobody"));
}

#[tokio::test]
async fn firestore_rejects_bad_token() {
    let (store, _fake) = start_firestore("wrong").await;
    let err = store.get("u1").await.unwrap_err();
    assert!(matches!(err, StoreError::Status { status: 401, .. }));
}

// ── Dialogflow CX ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct FakeAgent {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn detect_intent(
    State(agent): State<FakeAgent>,
    Path((_project, _location, _agent, session)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let Some(session) = session.strip_suffix(":detectIntent") else {
        return (StatusCode::NOT_FOUND, Json(json!({})));
    };
    agent
        .requests
        .lock()
        .unwrap()
        .push((session.to_string(), body.clone()));

    if body["queryInput"]["text"]["text"] == "explota" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "boom"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "responseId": "r-1",
            "queryResult": {
                "intent": { "displayName": "GenerarRutina" },
                "parameters": { "level": 1.0, "bodypart": 2.0 },
                "responseMessages": [
                    { "text": { "text": ["Preparando tu rutina."] } },
                    { "text": { "text": [""] } }
                ]
            }
        })),
    )
}

async fn start_agent() -> (DialogflowClient, FakeAgent) {
    let fake = FakeAgent::default();
    let app = Router::new()
        .route(
            "/v3/projects/{project}/locations/{location}/agents/{agent}/sessions/{session}",
            post(detect_intent),
        )
        .with_state(fake.clone());
    let base = serve(app).await;

    let config = DialogflowConfig {
        base_url: base,
        project_id: "asistente-cardiovascular".into(),
        location: "us-central1".into(),
        agent_id: "agent-1".into(),
        language_code: "es".into(),
        credentials: CredentialSource::StaticToken(SecretString::from(TOKEN)),
    };
    (
        DialogflowClient::new(&config, reqwest::Client::new(), tokens()),
        fake,
    )
}

#[tokio::test]
async fn dialogflow_sends_text_and_registration_flag() {
    let (client, fake) = start_agent().await;

    let result = client
        .detect_intent("34600111222", "quiero una rutina", true)
        .await
        .unwrap();
    assert_eq!(result.intent_label, "GenerarRutina");
    assert_eq!(result.reply_fragments, vec!["Preparando tu rutina."]);
    assert_eq!(result.parameters["bodypart"], 2.0);

    let requests = fake.requests.lock().unwrap().clone();
    let (session, body) = &requests[0];
    assert_eq!(session, "34600111222");
    assert_eq!(body["queryInput"]["text"]["text"], "quiero una rutina");
    assert_eq!(body["queryInput"]["languageCode"], "es");
    assert_eq!(body["queryParams"]["parameters"]["requiereRegistro"], true);
}

#[tokio::test]
async fn dialogflow_error_status_is_surfaced() {
    let (client, _fake) = start_agent().await;
    let err = client.detect_intent("u1", "explota", false).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

// ── Prediction functions ────────────────────────────────────────────────

#[derive(Clone, Default)]
struct FakeModels {
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn predict_exercises(
    State(models): State<FakeModels>,
    Json(body): Json<Value>,
) -> Json<Value> {
    models.bodies.lock().unwrap().push(body.clone());
    let top_n = body["top_n"].as_u64().unwrap_or(1) as usize;
    let all = vec![
        json!({"Title": "Push Up", "Desc": "Flexiones."}),
        json!({"Title": "Plank", "Desc": "Plancha."}),
    ];
    Json(json!({ "recomendaciones": all.into_iter().take(top_n).collect::<Vec<_>>() }))
}

async fn predict_cardio(State(models): State<FakeModels>, Json(body): Json<Value>) -> Json<Value> {
    models.bodies.lock().unwrap().push(body.clone());
    let at_risk = body["ap_hi"].as_f64().unwrap_or(0.0) >= 140.0;
    Json(json!({ "prediccion": if at_risk { 1 } else { 0 } }))
}

async fn start_models() -> (CloudFunctionModels, FakeModels, String) {
    let fake = FakeModels::default();
    let app = Router::new()
        .route("/predict-exercises", post(predict_exercises))
        .route("/predict-cardio", post(predict_cardio))
        .route("/broken", post(|| async { "not json" }))
        .with_state(fake.clone());
    let base = serve(app).await;

    let config = PredictionConfig {
        recommendation_url: format!("{base}/predict-exercises"),
        risk_url: format!("{base}/predict-cardio"),
        image_base_url: "https://assets.example.com".into(),
    };
    (
        CloudFunctionModels::new(&config, reqwest::Client::new()),
        fake,
        base,
    )
}

fn risk_request(ap_hi: f64) -> RiskRequest {
    RiskRequest {
        age: 54.0,
        ap_hi,
        ap_lo: 85.0,
        height: 168.0,
        weight: 72.5,
        gender: 1,
        cholesterol: 2.0,
        gluc: 1.0,
        smoke: 0,
        alco: 1,
        active: 1,
    }
}

#[tokio::test]
async fn recommendation_round_trip() {
    let (models, fake, _base) = start_models().await;
    let response = models
        .recommend(&RecommendationRequest {
            cardiovascular_safe: 1.0,
            body_part: 2.0,
            equipment: 0.0,
            level: 1.0,
            exercise_type: 3.0,
            top_n: 2,
        })
        .await
        .unwrap();

    let exercises = response.exercises.unwrap();
    assert_eq!(exercises.len(), 2);
    assert_eq!(exercises[0].title, "Push Up");
    assert_eq!(exercises[1].description, "Plancha.");

    let body = fake.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["Cardiovascular_Safe"], 1.0);
    assert_eq!(body["Equipment_Encoded"], 0.0);
    assert_eq!(body["top_n"], 2);
}

#[tokio::test]
async fn risk_round_trip() {
    let (models, fake, _base) = start_models().await;
    let high = models.assess_risk(&risk_request(150.0)).await.unwrap();
    assert_eq!(high.prediction, Some(1.0));
    let low = models.assess_risk(&risk_request(120.0)).await.unwrap();
    assert_eq!(low.prediction, Some(0.0));

    let body = fake.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["gender"], 1);
    assert_eq!(body["alco"], 1);
    assert_eq!(body["smoke"], 0);
}

#[tokio::test]
async fn unreachable_or_invalid_model_is_an_upstream_error() {
    let (_models, _fake, base) = start_models().await;

    let broken = CloudFunctionModels::new(
        &PredictionConfig {
            recommendation_url: format!("{base}/broken"),
            risk_url: format!("{base}/broken"),
            image_base_url: String::new(),
        },
        reqwest::Client::new(),
    );
    let err = broken.assess_risk(&risk_request(120.0)).await.unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidResponse { .. }));

    let offline = CloudFunctionModels::new(
        &PredictionConfig {
            recommendation_url: "http://127.0.0.1:1/predict-exercises".into(),
            risk_url: "http://127.0.0.1:1/predict-cardio".into(),
            image_base_url: String::new(),
        },
        reqwest::Client::new(),
    );
    let err = offline.assess_risk(&risk_request(120.0)).await.unwrap_err();
    assert!(matches!(err, UpstreamError::RequestFailed { .. }));
}

// ── Huawei Health ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct FakeHuawei {
    grants: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn huawei_token(
    State(huawei): State<FakeHuawei>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    huawei.grants.lock().unwrap().push(form.clone());
    if form.get("client_secret").map(String::as_str) != Some("s3cret") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"})));
    }
    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => (
            StatusCode::OK,
            Json(json!({"access_token": "at-1", "refresh_token": "rt-1", "expires_in": 3600})),
        ),
        Some("refresh_token") => (
            StatusCode::OK,
            Json(json!({"access_token": "at-2", "expires_in": 3600})),
        ),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "unsupported_grant_type"}))),
    }
}

async fn huawei_data(headers: HeaderMap) -> impl IntoResponse {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if bearer != "Bearer at-1" {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "heart_rate": 45,
            "blood_pressure": {"systolic": 150, "diastolic": 95},
            "spo2": 88
        })),
    )
}

async fn start_huawei(secret: &str) -> (HuaweiHealthClient, FakeHuawei) {
    let fake = FakeHuawei::default();
    let app = Router::new()
        .route("/oauth2/v3/token", post(huawei_token))
        .route("/data", get(huawei_data))
        .with_state(fake.clone());
    let base = serve(app).await;

    let config = WearableConfig {
        client_id: "108000".into(),
        client_secret: SecretString::from(secret.to_string()),
        redirect_uri: "https://bridge.example.com/oauth/wearable/callback".into(),
        scope: "heartrate".into(),
        auth_url: format!("{base}/oauth2/v3/authorize"),
        token_url: format!("{base}/oauth2/v3/token"),
        data_url: format!("{base}/data"),
    };
    (HuaweiHealthClient::new(&config, reqwest::Client::new()), fake)
}

#[tokio::test]
async fn huawei_code_exchange_and_refresh_are_form_encoded() {
    let (client, fake) = start_huawei("s3cret").await;

    let grant = client.exchange_code("code-xyz").await.unwrap();
    assert_eq!(grant.access_token, "at-1");
    assert_eq!(grant.refresh_token.as_deref(), Some("rt-1"));

    let refreshed = client.refresh_access_token("rt-1").await.unwrap();
    assert_eq!(refreshed.access_token, "at-2");
    assert_eq!(refreshed.refresh_token, None);

    let grants = fake.grants.lock().unwrap().clone();
    assert_eq!(grants[0]["grant_type"], "authorization_code");
    assert_eq!(grants[0]["code"], "code-xyz");
    assert_eq!(
        grants[0]["redirect_uri"],
        "https://bridge.example.com/oauth/wearable/callback"
    );
    assert_eq!(grants[1]["grant_type"], "refresh_token");
    assert_eq!(grants[1]["refresh_token"], "rt-1");
    assert_eq!(grants[1]["client_id"], "108000");
}

#[tokio::test]
async fn huawei_bad_secret_is_rejected() {
    let (client, _fake) = start_huawei("wrong").await;
    let err = client.exchange_code("code").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 401, .. }));
}

#[tokio::test]
async fn huawei_vitals_with_bearer_token() {
    let (client, _fake) = start_huawei("s3cret").await;

    let vitals = client.fetch_vitals("at-1").await.unwrap();
    assert_eq!(vitals.heart_rate, 45.0);
    assert_eq!(vitals.evaluate().len(), 3);

    let err = client.fetch_vitals("expired").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 401, .. }));
}
