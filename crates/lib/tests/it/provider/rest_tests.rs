//! `RestProvider` against a stub backend: auth endpoints under `auth/v1/`,
//! a PostgREST-shaped `profiles` table under `rest/v1/`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use cinelog::{
    IdentityProvider, ProfilePatch, ProfileRow, ProfileStore, RestConfig, RestProvider,
    SessionEventKind, SessionManager,
};

#[derive(Default)]
struct StubState {
    /// email -> (identity id, password)
    accounts: HashMap<String, (String, String)>,
    /// identity id -> profile row
    profiles: HashMap<String, ProfileRow>,
    next_id: u32,
    /// When set, profile reads answer 500.
    broken: bool,
}

type StubHandle = Arc<Mutex<StubState>>;

fn auth_payload(id: &str, email: &str, display_name: Option<&str>) -> Value {
    json!({
        "access_token": format!("token-{id}"),
        "token_type": "bearer",
        "user": {
            "id": id,
            "email": email,
            "user_metadata": { "display_name": display_name },
        },
    })
}

async fn signup(State(stub): State<StubHandle>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let display_name = body["data"]["display_name"].as_str().map(str::to_string);

    let mut stub = stub.lock().unwrap();
    if stub.accounts.contains_key(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "msg": "User already registered" })),
        );
    }
    stub.next_id += 1;
    let id = format!("rest-user-{}", stub.next_id);
    stub.accounts.insert(email.clone(), (id.clone(), password));
    (
        StatusCode::OK,
        Json(auth_payload(&id, &email, display_name.as_deref())),
    )
}

async fn token(State(stub): State<StubHandle>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let stub = stub.lock().unwrap();
    match stub.accounts.get(email) {
        Some((id, stored)) if stored == password => {
            (StatusCode::OK, Json(auth_payload(id, email, None)))
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error_description": "Invalid login credentials" })),
        ),
    }
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn id_filter(params: &HashMap<String, String>) -> String {
    params
        .get("id")
        .and_then(|f| f.strip_prefix("eq."))
        .unwrap_or_default()
        .to_string()
}

async fn read_profiles(
    State(stub): State<StubHandle>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let id = id_filter(&params);
    let stub = stub.lock().unwrap();
    if stub.broken {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "storage exploded" })),
        )
            .into_response();
    }
    let rows: Vec<ProfileRow> = stub.profiles.get(&id).cloned().into_iter().collect();
    Json(rows).into_response()
}

async fn insert_profile(State(stub): State<StubHandle>, Json(row): Json<ProfileRow>) -> StatusCode {
    let mut stub = stub.lock().unwrap();
    if stub.profiles.contains_key(&row.id) {
        return StatusCode::CONFLICT;
    }
    stub.profiles.insert(row.id.clone(), row);
    StatusCode::CREATED
}

async fn patch_profile(
    State(stub): State<StubHandle>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Vec<ProfileRow>> {
    let id = id_filter(&params);
    let mut stub = stub.lock().unwrap();
    let Some(row) = stub.profiles.get_mut(&id) else {
        return Json(Vec::new());
    };
    if let Some(name) = body.get("name").and_then(|v| v.as_str()) {
        row.name = name.to_string();
    }
    if let Some(avatar) = body.get("avatar_url") {
        row.avatar_url = avatar.as_str().map(str::to_string);
    }
    Json(vec![row.clone()])
}

/// Serve the stub on an ephemeral port; the task lives until the test
/// process exits.
async fn spawn_stub() -> (Url, StubHandle) {
    let stub: StubHandle = Arc::new(Mutex::new(StubState::default()));
    let app = Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route(
            "/rest/v1/profiles",
            get(read_profiles).post(insert_profile).patch(patch_profile),
        )
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    let url = Url::parse(&format!("http://{addr}")).expect("stub url");
    (url, stub)
}

async fn stub_provider() -> (RestProvider, StubHandle) {
    let (url, stub) = spawn_stub().await;
    let provider = RestProvider::new(RestConfig::new(url, "anon-key")).expect("build provider");
    (provider, stub)
}

#[tokio::test]
async fn signup_establishes_a_session() {
    let (provider, _stub) = stub_provider().await;

    let session = provider
        .create_account("ana@test.com", "secret123", "Ana")
        .await
        .unwrap();
    assert_eq!(session.identity.email, "ana@test.com");
    assert_eq!(session.identity.display_name.as_deref(), Some("Ana"));
    assert!(!session.access_token.is_empty());

    let current = provider.current_session().await.unwrap().unwrap();
    assert_eq!(current.identity.id, session.identity.id);
}

#[tokio::test]
async fn signup_with_a_known_email_is_a_conflict() {
    let (provider, _stub) = stub_provider().await;
    provider
        .create_account("ana@test.com", "secret123", "Ana")
        .await
        .unwrap();

    let err = provider
        .create_account("ana@test.com", "other-pass", "Ana Again")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn password_grant_succeeds_and_bad_credentials_fail() {
    let (url, _stub) = spawn_stub().await;
    let signup_provider =
        RestProvider::new(RestConfig::new(url.clone(), "anon-key")).expect("build provider");
    let created = signup_provider
        .create_account("ana@test.com", "secret123", "Ana")
        .await
        .unwrap();

    // A fresh process: no session until the password grant.
    let provider = RestProvider::new(RestConfig::new(url, "anon-key")).expect("build provider");
    assert!(provider.current_session().await.unwrap().is_none());

    let session = provider.authenticate("ana@test.com", "secret123").await.unwrap();
    assert_eq!(session.identity.id, created.identity.id);

    let err = provider
        .authenticate("ana@test.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(err.is_authentication_error());
}

#[tokio::test]
async fn logout_drops_the_session_and_notifies() {
    let (provider, _stub) = stub_provider().await;
    provider
        .create_account("ana@test.com", "secret123", "Ana")
        .await
        .unwrap();
    let mut events = provider.subscribe();

    provider.end_session().await.unwrap();

    assert!(provider.current_session().await.unwrap().is_none());
    let change = events.recv().await.unwrap();
    assert_eq!(change.event, SessionEventKind::SignedOut);
    assert!(change.session.is_none());
}

#[tokio::test]
async fn profile_rows_round_trip() {
    let (provider, _stub) = stub_provider().await;

    let row = ProfileRow {
        id: "rest-user-7".to_string(),
        email: "ana@test.com".to_string(),
        name: "Ana".to_string(),
        avatar_url: None,
        created_at: Some("2026-01-01T00:00:00Z".to_string()),
        updated_at: None,
    };
    provider.insert_profile(&row).await.unwrap();

    let fetched = provider.read_profile("rest-user-7").await.unwrap().unwrap();
    assert_eq!(fetched.name, "Ana");
    assert_eq!(fetched.created_at.as_deref(), Some("2026-01-01T00:00:00Z"));

    let err = provider.insert_profile(&row).await.unwrap_err();
    assert!(err.is_conflict());

    let updated = provider
        .update_profile("rest-user-7", &ProfilePatch::rename("Ana Luiza"))
        .await
        .unwrap();
    assert_eq!(updated.name, "Ana Luiza");

    assert!(provider.read_profile("rest-user-8").await.unwrap().is_none());
    let err = provider
        .update_profile("rest-user-8", &ProfilePatch::rename("Nobody"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn server_errors_surface_as_unavailable() {
    let (provider, stub) = stub_provider().await;
    stub.lock().unwrap().broken = true;

    let err = provider.read_profile("rest-user-1").await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn the_session_manager_runs_against_the_stub() {
    let (url, _stub) = spawn_stub().await;
    let provider =
        Arc::new(RestProvider::new(RestConfig::new(url, "anon-key")).expect("build provider"));
    let manager = SessionManager::new(provider);
    manager.start();

    let user = manager
        .register("Ana", "ana@test.com", "abcdef", None)
        .await
        .unwrap();
    assert_eq!(user.name, "Ana");
    assert!(manager.snapshot().state.is_authenticated());

    let renamed = manager
        .update_profile(ProfilePatch::rename("Ana Luiza"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Ana Luiza");

    manager.logout().await.unwrap();
    assert!(manager.current_user().is_none());
    manager.shutdown().await;
}
