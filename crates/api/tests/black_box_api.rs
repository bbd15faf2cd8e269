use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use albiero_api::app::{build_app, AppServices};
use albiero_api::config::Environment;
use albiero_auth::{
    Hs256TokenService, IssuedToken, Registration, Role, TokenClaims, TokenError, TokenService, User,
};
use albiero_core::UserId;
use albiero_infra::{Database, PgLeadStore, PgUserStore, RetryPolicy};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod with in-memory stores, bound to an ephemeral port.
        let tokens = Arc::new(Hs256TokenService::new(JWT_SECRET.as_bytes(), ChronoDuration::hours(1)));
        Self::spawn_with(AppServices::in_memory(tokens), Environment::Development).await
    }

    async fn spawn_with(services: AppServices, environment: Environment) -> Self {
        let services = Arc::new(services);
        let app = build_app(services.clone(), environment);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        (res.status(), res.json().await.unwrap())
    }

    /// Register through the API and return (user, token).
    async fn register(&self, name: &str, email: &str) -> (Value, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({ "nombre": name, "email": email, "password": "secret1" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let token = body["data"]["token"].as_str().unwrap().to_string();
        (body["data"]["user"].clone(), token)
    }

    /// Admins cannot self-register; seed one directly and log in.
    async fn admin(&self) -> (User, String) {
        let new_user = Registration {
            name: Some("Root".to_string()),
            email: Some("root@x.com".to_string()),
            password: Some("rootpass".to_string()),
            phone: None,
        }
        .validate()
        .unwrap()
        .with_role(Role::Admin);
        let user = self.services.credentials.create(new_user, Utc::now()).await.unwrap();

        let (status, body) = self
            .post("/api/auth/login", None, json!({ "email": "root@x.com", "password": "rootpass" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (user, body["data"]["token"].as_str().unwrap().to_string())
    }

    async fn create_lead(&self, name: &str, email: &str, service: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/leads",
                None,
                json!({ "nombre": name, "email": email, "servicio": service, "telefono": "123456" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: UserId, issued_at: chrono::DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = json!({
        "sub": sub.to_string(),
        "iat": issued_at.timestamp(),
        "exp": (issued_at + ttl).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Signs nothing; every issue fails as if the expiry were unrepresentable.
struct BrokenTokens;

impl TokenService for BrokenTokens {
    fn issue(&self, _: UserId, _: chrono::DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        Err(TokenError::Encoding("expiry out of range".to_string()))
    }

    fn verify(&self, _: &str, _: chrono::DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        Err(TokenError::Invalid)
    }
}

/// Postgres wiring against a port nobody listens on, never connected.
fn unreachable_database_services() -> AppServices {
    let policy = RetryPolicy {
        max_attempts: 1,
        initial_backoff: std::time::Duration::from_millis(10),
        max_backoff: std::time::Duration::from_millis(10),
        multiplier: 2,
        attempt_timeout: std::time::Duration::from_millis(200),
    };
    let db = Database::postgres("postgres://u:p@127.0.0.1:1/db", policy).unwrap();
    let tokens = Arc::new(Hs256TokenService::new(JWT_SECRET.as_bytes(), ChronoDuration::hours(1)));

    AppServices::new(
        db.clone(),
        Arc::new(PgUserStore::new(db.clone())),
        Arc::new(PgLeadStore::new(db)),
        tokens,
    )
}

fn user_id(user: &Value) -> UserId {
    user["_id"].as_str().unwrap().parse().unwrap()
}

// -------------------------
// Registration and login
// -------------------------

#[tokio::test]
async fn register_returns_user_and_token_without_password() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            "/api/auth/register",
            None,
            json!({ "nombre": "Ana", "email": "ana@x.com", "password": "secret1" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "ana@x.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert_eq!(body["data"]["user"]["isActive"], true);
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    assert!(body["data"]["user"].get("password").is_none());
    assert!(!body.to_string().contains("argon2"));
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let srv = TestServer::spawn().await;
    srv.register("Ana", "ana@x.com").await;

    let (status, body) = srv
        .post(
            "/api/auth/register",
            None,
            json!({ "nombre": "Other", "email": "ANA@x.com", "password": "secret2" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn registration_reports_every_invalid_field() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            "/api/auth/register",
            None,
            json!({ "nombre": "A", "email": "nope", "password": "123" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation errors");
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn login_issues_a_token_that_authenticates() {
    let srv = TestServer::spawn().await;
    let (user, _) = srv.register("Ana", "ana@x.com").await;

    let (status, body) = srv
        .post("/api/auth/login", None, json!({ "email": "ana@x.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["user"]["lastLogin"].is_string());
    let token = body["data"]["token"].as_str().unwrap();

    let (status, me) = srv.get("/api/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["_id"], user["_id"]);
    assert!(me["data"]["lastLogin"].is_string());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let srv = TestServer::spawn().await;
    srv.register("Ana", "ana@x.com").await;

    let (wrong_status, wrong_password) = srv
        .post("/api/auth/login", None, json!({ "email": "ana@x.com", "password": "wrong!!" }))
        .await;
    let (unknown_status, unknown_email) = srv
        .post("/api/auth/login", None, json!({ "email": "who@x.com", "password": "secret1" }))
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn login_requires_email_and_password() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.post("/api/auth/login", None, json!({ "email": "ana@x.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

// -------------------------
// Authentication
// -------------------------

#[tokio::test]
async fn bad_tokens_all_get_the_same_401() {
    let srv = TestServer::spawn().await;
    let (user, _) = srv.register("Ana", "ana@x.com").await;
    let id = user_id(&user);

    let expired = mint_jwt(JWT_SECRET, id, Utc::now() - ChronoDuration::hours(2), ChronoDuration::hours(1));
    let foreign = mint_jwt("someone-else", id, Utc::now(), ChronoDuration::hours(1));
    let unknown = mint_jwt(JWT_SECRET, UserId::new(), Utc::now(), ChronoDuration::hours(1));

    let (status, missing) = srv.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for token in [expired.as_str(), foreign.as_str(), unknown.as_str(), "garbage"] {
        let (status, body) = srv.get("/api/auth/me", Some(token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token}");
        assert_eq!(body, missing);
    }
    assert_eq!(missing["message"], "invalid or missing credentials");
}

#[tokio::test]
async fn disabled_identity_is_rejected_with_a_valid_token() {
    let srv = TestServer::spawn().await;
    let (user, token) = srv.register("Ana", "ana@x.com").await;

    let (status, _) = srv.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    srv.services
        .users
        .set_active(user_id(&user), false, Utc::now())
        .await
        .unwrap();

    let (status, body) = srv.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid or missing credentials");

    let (status, _) = srv
        .post("/api/auth/login", None, json!({ "email": "ana@x.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -------------------------
// Profile
// -------------------------

#[tokio::test]
async fn profile_update_changes_only_name_and_phone() {
    let srv = TestServer::spawn().await;
    let (user, token) = srv.register("Ana", "ana@x.com").await;

    let (status, body) = srv
        .put(
            "/api/users/profile",
            &token,
            json!({ "nombre": "Ana Maria", "telefono": "555-1234", "email": "evil@x.com", "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nombre"], "Ana Maria");
    assert_eq!(body["data"]["telefono"], "555-1234");
    assert_eq!(body["data"]["email"], "ana@x.com");
    assert_eq!(body["data"]["role"], "user");

    let (_, profile) = srv.get("/api/users/profile", Some(&token)).await;
    assert_eq!(profile["data"]["_id"], user["_id"]);
    assert_eq!(profile["data"]["nombre"], "Ana Maria");
}

#[tokio::test]
async fn user_listing_is_admin_only() {
    let srv = TestServer::spawn().await;
    let (_, user_token) = srv.register("Ana", "ana@x.com").await;
    let (_, admin_token) = srv.admin().await;

    let (status, body) = srv.get("/api/users", Some(&user_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("Role user"));

    let (status, body) = srv.get("/api/users", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    // Newest first.
    assert_eq!(users[0]["email"], "root@x.com");
}

// -------------------------
// Leads
// -------------------------

#[tokio::test]
async fn public_intake_creates_a_new_lead() {
    let srv = TestServer::spawn().await;

    let lead = srv.create_lead("Bob", "b@x.com", "design").await;

    assert_eq!(lead["status"], "nuevo");
    assert_eq!(lead["source"], "web-form");
    assert_eq!(lead["nombre"], "Bob");
    assert_eq!(lead["email"], "b@x.com");
    assert!(lead["notes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn lead_intake_validates_fields() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv
        .post("/api/leads", None, json!({ "nombre": "B", "servicio": "x", "telefono": "1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn lead_triage_requires_an_admin() {
    let srv = TestServer::spawn().await;
    let lead = srv.create_lead("Bob", "b@x.com", "design").await;
    let lead_path = format!("/api/leads/{}", lead["_id"].as_str().unwrap());
    let (_, user_token) = srv.register("Ana", "ana@x.com").await;
    let (_, admin_token) = srv.admin().await;

    let (status, _) = srv.get("/api/leads", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = srv.get("/api/leads", Some(&user_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv.get(&lead_path, Some(&user_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv.put(&lead_path, &user_token, json!({ "status": "perdido" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv.get("/api/leads", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["leads"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn admin_updates_assigns_and_annotates_a_lead() {
    let srv = TestServer::spawn().await;
    let lead = srv.create_lead("Bob", "b@x.com", "design").await;
    let lead_path = format!("/api/leads/{}", lead["_id"].as_str().unwrap());
    let (admin, admin_token) = srv.admin().await;

    let (status, body) = srv
        .put(
            &lead_path,
            &admin_token,
            json!({ "status": "contactado", "assignedTo": admin.id.to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "contactado");
    assert_eq!(body["data"]["assignedTo"]["nombre"], "Root");
    assert_eq!(body["data"]["assignedTo"]["email"], "root@x.com");
    assert_eq!(body["data"]["nombre"], "Bob");

    let (status, body) = srv
        .post(&format!("{lead_path}/notes"), Some(&admin_token), json!({ "note": "called, wants a quote" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let notes = body["data"]["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["note"], "called, wants a quote");
    assert_eq!(notes[0]["createdBy"]["nombre"], "Root");

    let (status, body) = srv.put(&lead_path, &admin_token, json!({ "assignedTo": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("assignedTo").is_none());

    let (status, body) = srv.get(&lead_path, Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "contactado");
    assert_eq!(body["data"]["notes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn lead_update_rejects_bad_values() {
    let srv = TestServer::spawn().await;
    let lead = srv.create_lead("Bob", "b@x.com", "design").await;
    let lead_path = format!("/api/leads/{}", lead["_id"].as_str().unwrap());
    let (_, admin_token) = srv.admin().await;

    let (status, _) = srv.put(&lead_path, &admin_token, json!({ "status": "archived" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let ghost = UserId::new().to_string();
    let (status, body) = srv.put(&lead_path, &admin_token, json!({ "assignedTo": ghost })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"][0].as_str().unwrap().contains("existing user"));

    let (status, _) = srv
        .post(&format!("{lead_path}/notes"), Some(&admin_token), json!({ "note": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_and_malformed_lead_ids() {
    let srv = TestServer::spawn().await;
    let (_, admin_token) = srv.admin().await;

    let missing = format!("/api/leads/{}", uuid::Uuid::now_v7());
    let (status, body) = srv.get(&missing, Some(&admin_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Lead not found");

    let (status, _) = srv
        .post(&format!("{missing}/notes"), Some(&admin_token), json!({ "note": "hi" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv.get("/api/leads/not-a-uuid", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn lead_listing_pages_filters_and_searches() {
    let srv = TestServer::spawn().await;
    let (_, admin_token) = srv.admin().await;

    for i in 0..12 {
        srv.create_lead(&format!("Lead{i:02}"), &format!("lead{i}@x.com"), "web design").await;
    }
    let acme = srv.create_lead("Carla", "carla@acme.com", "branding").await;

    let (_, body) = srv.get("/api/leads?page=2&limit=5", Some(&admin_token)).await;
    let pagination = &body["data"]["pagination"];
    assert_eq!(body["data"]["leads"].as_array().unwrap().len(), 5);
    assert_eq!(pagination["total"], 13);
    assert_eq!(pagination["totalPages"], 3);
    assert_eq!(pagination["hasNext"], true);
    assert_eq!(pagination["hasPrev"], true);

    let (_, body) = srv.get("/api/leads?search=ACME", Some(&admin_token)).await;
    let leads = body["data"]["leads"].as_array().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["_id"], acme["_id"]);

    let acme_path = format!("/api/leads/{}", acme["_id"].as_str().unwrap());
    srv.put(&acme_path, &admin_token, json!({ "status": "convertido" })).await;
    let (_, body) = srv.get("/api/leads?status=convertido", Some(&admin_token)).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let (status, _) = srv.get("/api/leads?status=archived", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = srv.get("/api/leads?limit=1000&page=abc", Some(&admin_token)).await;
    assert_eq!(body["data"]["pagination"]["limit"], 100);
    assert_eq!(body["data"]["pagination"]["page"], 1);
}

// -------------------------
// Plumbing
// -------------------------

#[tokio::test]
async fn health_and_root_report_database_state() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].is_string());

    let (status, body) = srv.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn unknown_routes_use_the_envelope() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/api/nope?x=1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route GET /api/nope?x=1 not found");
}

#[tokio::test]
async fn malformed_json_is_a_400_envelope() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(srv.url("/api/auth/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unsupported_methods_use_the_envelope() {
    let srv = TestServer::spawn().await;
    let (_, admin_token) = srv.admin().await;
    let lead = srv.create_lead("Bob", "b@x.com", "design").await;

    let res = srv
        .client
        .delete(srv.url(&format!("/api/leads/{}", lead["_id"].as_str().unwrap())))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(res.headers().contains_key("allow"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("DELETE"));
}

#[tokio::test]
async fn malformed_query_strings_use_the_envelope() {
    let srv = TestServer::spawn().await;
    let (_, admin_token) = srv.admin().await;

    let (status, body) = srv.get("/api/leads?page=1&page=2", Some(&admin_token)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("page"));
}

// -------------------------
// Failure modes
// -------------------------

#[tokio::test]
async fn unreachable_database_answers_503() {
    let srv = TestServer::spawn_with(unreachable_database_services(), Environment::Development).await;

    let (status, body) = srv
        .post(
            "/api/leads",
            None,
            json!({ "nombre": "Bob", "email": "b@x.com", "servicio": "design", "telefono": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "database service temporarily unavailable");

    let (status, body) = srv
        .post("/api/auth/login", None, json!({ "email": "ana@x.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    // Health stays reachable and reports the outage.
    let (status, body) = srv.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["database"], "connected");
}

#[tokio::test]
async fn production_withholds_internal_error_detail() {
    let services = AppServices::in_memory(Arc::new(BrokenTokens));
    let srv = TestServer::spawn_with(services, Environment::Production).await;

    let (status, body) = srv
        .post(
            "/api/auth/register",
            None,
            json!({ "nombre": "Ana", "email": "ana@x.com", "password": "secret1" }),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "internal server error");
    assert!(body.get("error").is_none());
    assert!(!body.to_string().contains("expiry"));
}

#[tokio::test]
async fn development_exposes_internal_error_detail() {
    let services = AppServices::in_memory(Arc::new(BrokenTokens));
    let srv = TestServer::spawn_with(services, Environment::Development).await;

    let (status, body) = srv
        .post(
            "/api/auth/register",
            None,
            json!({ "nombre": "Ana", "email": "ana@x.com", "password": "secret1" }),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("expiry out of range"));
}
