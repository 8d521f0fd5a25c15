use std::net::TcpListener;
use std::sync::Arc;

use actix_web::web;
use serde_json::{json, Value};
use smarthome_auth::auth::{BcryptVerifier, SessionService};
use smarthome_auth::cache::InMemoryRevocationCache;
use smarthome_auth::clock::SystemClock;
use smarthome_auth::configuration::JwtSettings;
use smarthome_auth::startup::run;
use smarthome_auth::store::{InMemoryCredentialStore, DEFAULT_ADMIN_ID};

const TEST_HASH_COST: u32 = 4;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post(
            "/api/v1/auth/login",
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Log in as the seeded admin and return the response body
    async fn login_admin(&self) -> Value {
        let response = self.login("admin", "admin123").await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn validate(&self, access_token: &str) -> Value {
        let response = self
            .post(
                "/api/v1/auth/validate",
                &json!({ "accessToken": access_token }),
            )
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn logout(&self, access_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/logout", self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn me(&self, access_token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/api/v1/me", self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let clock = Arc::new(SystemClock);
    let store = InMemoryCredentialStore::with_default_admin(TEST_HASH_COST)
        .expect("Failed to seed admin");
    let sessions = SessionService::new(
        &JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
        },
        clock.clone(),
        Arc::new(InMemoryRevocationCache::new(clock)),
        Arc::new(store),
        Arc::new(BcryptVerifier),
    )
    .expect("Failed to build session service");

    let server = run(listener, web::Data::new(sessions)).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("missing string field {}", field))
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_tokens_and_user_for_admin() {
    let app = spawn_app();

    let body = app.login_admin().await;

    assert_eq!(str_field(&body, "accessToken").split('.').count(), 3);
    assert_eq!(str_field(&body, "refreshToken").split('.').count(), 3);
    assert!(body["expiresAt"].as_i64().unwrap() > chrono::Utc::now().timestamp());
    assert_eq!(body["user"]["id"], DEFAULT_ADMIN_ID);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["email"], "admin@example.com");
    assert!(body["user"]["roles"]
        .as_array()
        .unwrap()
        .contains(&json!("admin")));
}

#[tokio::test]
async fn login_accepts_email() {
    let app = spawn_app();

    let response = app.login("admin@example.com", "admin123").await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn login_returns_401_for_bad_credentials() {
    let app = spawn_app();
    let test_cases = vec![
        ("admin", "wrong-password", "wrong password"),
        ("nobody", "admin123", "unknown user"),
        (" admin ", "admin123", "padded username"),
        ("admin", "admin123 ", "padded password"),
    ];

    for (username, password, description) in test_cases {
        let response = app.login(username, password).await;

        assert_eq!(
            401,
            response.status().as_u16(),
            "The API did not fail with 401 for {}.",
            description
        );

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["message"], "Invalid username or password");
    }
}

#[tokio::test]
async fn login_returns_400_for_empty_fields() {
    let app = spawn_app();
    let test_cases = vec![("", "admin123"), ("admin", ""), ("   ", "admin123")];

    for (username, password) in test_cases {
        let response = app.login(username, password).await;

        assert_eq!(400, response.status().as_u16());
    }
}

// --- Validation Tests ---

#[tokio::test]
async fn validate_reports_valid_access_token() {
    let app = spawn_app();
    let login = app.login_admin().await;

    let result = app.validate(str_field(&login, "accessToken")).await;

    assert_eq!(result["valid"], true);
    assert_eq!(result["userId"], DEFAULT_ADMIN_ID);
    assert_eq!(result["username"], "admin");
    assert_eq!(result["email"], "admin@example.com");
}

#[tokio::test]
async fn validate_reports_invalid_token_with_200() {
    let app = spawn_app();

    let result = app.validate("not.a.token").await;

    assert_eq!(result["valid"], false);
    assert!(result["error"].as_str().is_some());
}

#[tokio::test]
async fn validate_rejects_refresh_token() {
    let app = spawn_app();
    let login = app.login_admin().await;

    let result = app.validate(str_field(&login, "refreshToken")).await;

    assert_eq!(result["valid"], false);
    assert!(str_field(&result, "error").contains("invalid token payload"));
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_revokes_access_token() {
    let app = spawn_app();
    let login = app.login_admin().await;
    let access_token = str_field(&login, "accessToken");

    let response = app.logout(access_token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let result = app.validate(access_token).await;
    assert_eq!(result["valid"], false);
    assert!(str_field(&result, "error").contains("revoked"));

    let response = app.me(access_token).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn logout_twice_succeeds() {
    let app = spawn_app();
    let login = app.login_admin().await;
    let access_token = str_field(&login, "accessToken");

    assert_eq!(200, app.logout(access_token).await.status().as_u16());
    assert_eq!(200, app.logout(access_token).await.status().as_u16());
}

#[tokio::test]
async fn logout_without_token_is_rejected() {
    let app = spawn_app();

    let response = app
        .client
        .post(&format!("{}/api/v1/auth/logout", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_issues_new_valid_pair() {
    let app = spawn_app();
    let login = app.login_admin().await;

    let response = app
        .post(
            "/api/v1/auth/refresh",
            &json!({ "refreshToken": str_field(&login, "refreshToken") }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let renewed: Value = response.json().await.unwrap();
    let new_access = str_field(&renewed, "accessToken");
    assert_ne!(new_access, str_field(&login, "accessToken"));
    assert!(renewed["expiresAt"].as_i64().is_some());

    let result = app.validate(new_access).await;
    assert_eq!(result["valid"], true);
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app();
    let login = app.login_admin().await;

    let response = app
        .post(
            "/api/v1/auth/refresh",
            &json!({ "refreshToken": str_field(&login, "accessToken") }),
        )
        .await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_MALFORMED");
}

#[tokio::test]
async fn refresh_rejects_tampered_token() {
    let app = spawn_app();
    let login = app.login_admin().await;
    let refresh_token = str_field(&login, "refreshToken");

    let forged_payload =
        base64_payload(r#"{"sub":"someone-else","jti":"x-refresh","exp":9999999999}"#);
    let mut segments: Vec<&str> = refresh_token.split('.').collect();
    segments[1] = &forged_payload;
    let tampered = segments.join(".");

    let response = app
        .post("/api/v1/auth/refresh", &json!({ "refreshToken": tampered }))
        .await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_INVALID");
}

fn base64_payload(json: &str) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(json)
}

// --- Protected Route Tests ---

#[tokio::test]
async fn me_returns_claims_for_valid_token() {
    let app = spawn_app();
    let login = app.login_admin().await;

    let response = app.me(str_field(&login, "accessToken")).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["userId"], DEFAULT_ADMIN_ID);
    assert_eq!(body["username"], "admin");
}

#[tokio::test]
async fn me_requires_authorization_header() {
    let app = spawn_app();

    let response = app
        .client
        .get(&format!("{}/api/v1/me", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn me_rejects_refresh_token() {
    let app = spawn_app();
    let login = app.login_admin().await;

    let response = app.me(str_field(&login, "refreshToken")).await;

    assert_eq!(401, response.status().as_u16());
}

// --- Metrics Tests ---

#[tokio::test]
async fn metrics_count_login_outcomes() {
    let app = spawn_app();
    app.login_admin().await;
    app.login("admin", "wrong-password").await;

    let response = app
        .client
        .get(&format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .starts_with("text/plain"));

    let body = response.text().await.unwrap();
    for line in [
        r#"auth_login_total{outcome="success"} 1"#,
        r#"auth_login_total{outcome="unauthenticated"} 1"#,
        r#"http_requests_total{method="POST",path="/api/v1/auth/login",status="200"} 1"#,
        r#"http_requests_total{method="POST",path="/api/v1/auth/login",status="401"} 1"#,
    ] {
        assert!(body.contains(line), "missing `{}` in:\n{}", line, body);
    }
}

#[tokio::test]
async fn metrics_label_protected_routes_by_pattern() {
    let app = spawn_app();
    let login = app.login_admin().await;

    app.me(str_field(&login, "accessToken")).await;
    app.me("not-a-token").await;

    let body = app
        .client
        .get(&format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request.")
        .text()
        .await
        .unwrap();

    assert!(body.contains(r#"http_requests_total{method="GET",path="/api/v1/me",status="200"} 1"#));
    assert!(body.contains(r#"http_requests_total{method="GET",path="/api/v1/me",status="401"} 1"#));
    assert!(body.contains(r#"auth_validations_total{outcome="success"} 1"#));
}
