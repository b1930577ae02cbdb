use player_auth::blacklist::TokenBlacklist;
use player_auth::configuration::{get_configuration, DatabaseSettings};
use player_auth::email_client::{EmailClient, SenderEmail};
use player_auth::startup::run;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let blacklist = TokenBlacklist::connect(&configuration.redis)
        .await
        .expect("Failed to connect to revocation cache");

    // Point the notifier at a closed port; sends fail fast and must be swallowed
    configuration.email.service_url = "http://127.0.0.1:1".to_string();
    let sender = SenderEmail::parse(configuration.email.sender.clone()).unwrap();
    let email_client = EmailClient::new(
        configuration.email.service_url.clone(),
        sender,
        configuration.email.reset_base_url.clone(),
        reqwest::Client::new(),
    );

    let server = run(
        listener,
        connection_pool.clone(),
        blacklist,
        email_client,
        configuration.jwt.clone(),
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

/// Register a player and return the parsed authentication response
async fn register_player(app: &TestApp, email: &str, username: &str, password: &str) -> Value {
    let client = reqwest::Client::new();
    let body = json!({
        "email": email,
        "username": username,
        "password": password
    });

    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());

    response.json().await.expect("Failed to parse response")
}

async fn login_player(app: &TestApp, email: &str, password: &str) -> Value {
    let client = reqwest::Client::new();
    let response = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    response.json().await.expect("Failed to parse response")
}

/// Fetch the caller's identity through /auth/me
async fn current_player_id(app: &TestApp, access_token: &str) -> String {
    let client = reqwest::Client::new();
    let response = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_str().expect("No id in response").to_string()
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_for_valid_credentials() {
    let app = spawn_app().await;

    let body = register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;

    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["token_type"], "Bearer");

    // Verify the player row was created
    let player = sqlx::query("SELECT email, username FROM players WHERE email = 'john@example.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created player");

    assert_eq!(player.get::<String, _>("email"), "john@example.com");
    assert_eq!(player.get::<String, _>("username"), "john_doe");
}

#[tokio::test]
async fn register_opens_a_session_backing_the_refresh_token() {
    let app = spawn_app().await;

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count sessions");
    assert_eq!(count, 1);

    // Only the hash of the refresh token is stored
    let hash: String = sqlx::query_scalar("SELECT token_hash FROM sessions")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch session");
    assert_eq!(hash.len(), 64);
    assert!(!hash.contains('.'));
}

#[tokio::test]
async fn register_returns_400_for_invalid_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid_emails = vec!["notanemail", "user@", "@example.com", "user@@example.com"];

    for invalid_email in invalid_emails {
        let body = json!({
            "email": invalid_email,
            "username": "test_user",
            "password": "SecurePass123"
        });

        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject invalid email: {}",
            invalid_email
        );
    }
}

#[tokio::test]
async fn register_returns_400_for_weak_password() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let weak_passwords = vec![
        ("short", "password too short"),
        ("nouppercase123", "no uppercase"),
        ("NOLOWERCASE123", "no lowercase"),
        ("NoDigitsHere", "no digits"),
    ];

    for (weak_password, reason) in weak_passwords {
        let body = json!({
            "email": "test@example.com",
            "username": "test_user",
            "password": weak_password
        });

        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject weak password: {}",
            reason
        );
    }
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;

    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({
            "email": "john@example.com",
            "username": "different_name",
            "password": "SecurePass123"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_username() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;

    let response = client
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({
            "email": "other@example.com",
            "username": "john_doe",
            "password": "SecurePass123"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());

    // The duplicate message must not reveal which field collided
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "DUPLICATE_ACCOUNT");
}

// --- Login Tests ---

#[tokio::test]
async fn register_then_login_yield_the_same_player() {
    let app = spawn_app().await;

    let registered = register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let registered_id =
        current_player_id(&app, registered["access_token"].as_str().unwrap()).await;

    let logged_in = login_player(&app, "john@example.com", "SecurePass123").await;
    let logged_in_id = current_player_id(&app, logged_in["access_token"].as_str().unwrap()).await;

    assert_eq!(registered_id, logged_in_id);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;

    // Wrong password for an existing account
    let wrong_password = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "john@example.com", "password": "WrongPass123"}))
        .send()
        .await
        .expect("Failed to execute request.");

    // Unknown email entirely
    let unknown_email = client
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({"email": "nobody@example.com", "password": "SecurePass123"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let body1: Value = wrong_password.json().await.unwrap();
    let body2: Value = unknown_email.json().await.unwrap();
    assert_eq!(body1["code"], body2["code"]);
    assert_eq!(body1["message"], body2["message"]);
}

// --- Auth Gateway Tests ---

#[tokio::test]
async fn protected_routes_return_401_without_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let attempts = vec![
        client.get(&format!("{}/auth/me", &app.address)),
        client.get(&format!("{}/auth/sessions", &app.address)),
        client.delete(&format!("{}/auth/sessions", &app.address)),
        client
            .post(&format!("{}/auth/logout", &app.address))
            .json(&json!({"refresh_token": "whatever"})),
    ];

    for attempt in attempts {
        let response = attempt.send().await.expect("Failed to execute request.");
        assert_eq!(401, response.status().as_u16());
    }
}

#[tokio::test]
async fn gateway_rejects_garbage_and_wrong_type_tokens() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let refresh_token = registered["refresh_token"].as_str().unwrap();

    // A refresh token is not an access token even though its signature checks out
    for bearer in ["invalid.token.here", refresh_token] {
        let response = client
            .get(&format!("{}/auth/me", &app.address))
            .header("Authorization", format!("Bearer {}", bearer))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(401, response.status().as_u16());
    }
}

// --- Token Refresh Tests ---

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let old_refresh_token = registered["refresh_token"].as_str().unwrap();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": old_refresh_token}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    let new_refresh_token = body["refresh_token"].as_str().expect("No new refresh token");
    assert_ne!(old_refresh_token, new_refresh_token);

    // Rotation preserves the row; no second session appears
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to count sessions");
    assert_eq!(count, 1);

    // The superseded token can never refresh again
    let replay = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": old_refresh_token}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, replay.status().as_u16());

    let replay_body: Value = replay.json().await.unwrap();
    assert_eq!(replay_body["code"], "SESSION_NOT_FOUND");

    // While the rotated token keeps working
    let rotated = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": new_refresh_token}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, rotated.status().as_u16());
}

#[tokio::test]
async fn concurrent_refreshes_of_one_token_let_exactly_one_win() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let refresh_token = registered["refresh_token"].as_str().unwrap();

    let body = json!({"refresh_token": refresh_token});
    let first = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&body)
        .send();
    let second = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&body)
        .send();

    let (first, second) = tokio::join!(first, second);
    let mut statuses = vec![
        first.expect("Failed to execute request.").status().as_u16(),
        second.expect("Failed to execute request.").status().as_u16(),
    ];
    statuses.sort();

    assert_eq!(statuses, vec![200, 404]);
}

#[tokio::test]
async fn refresh_returns_401_for_invalid_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": "definitely.not.valid"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_an_access_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let access_token = registered["access_token"].as_str().unwrap();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": access_token}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_kills_both_tokens_immediately() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let registered = register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let access_token = registered["access_token"].as_str().unwrap();
    let refresh_token = registered["refresh_token"].as_str().unwrap();

    let response = client
        .post(&format!("{}/auth/logout", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    // The access token is dead well before its natural expiry
    let me = client
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, me.status().as_u16());

    // And the refresh token's backing session is gone
    let refresh = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, refresh.status().as_u16());
}

#[tokio::test]
async fn full_lifecycle_register_login_refresh_logout() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "alice@x.com", "alice", "Password1x").await;
    let logged_in = login_player(&app, "alice@x.com", "Password1x").await;

    // Refresh once
    let refreshed = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": logged_in["refresh_token"].as_str().unwrap()}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, refreshed.status().as_u16());
    let refreshed: Value = refreshed.json().await.unwrap();
    let pre_logout_refresh = refreshed["refresh_token"].as_str().unwrap();

    // Logout with the refreshed pair
    let logout = client
        .post(&format!("{}/auth/logout", &app.address))
        .header(
            "Authorization",
            format!("Bearer {}", refreshed["access_token"].as_str().unwrap()),
        )
        .json(&json!({"refresh_token": pre_logout_refresh}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, logout.status().as_u16());

    // The pre-logout refresh token is gone for good
    let replay = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({"refresh_token": pre_logout_refresh}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

// --- Session Management Tests ---

#[tokio::test]
async fn list_sessions_returns_active_sessions_newest_first() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    login_player(&app, "john@example.com", "SecurePass123").await;
    let latest = login_player(&app, "john@example.com", "SecurePass123").await;

    let response = client
        .get(&format!("{}/auth/sessions", &app.address))
        .header(
            "Authorization",
            format!("Bearer {}", latest["access_token"].as_str().unwrap()),
        )
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let sessions: Vec<Value> = response.json().await.expect("Failed to parse response");
    assert_eq!(sessions.len(), 3);

    // Newest first
    let created: Vec<&str> = sessions
        .iter()
        .map(|s| s["created_at"].as_str().unwrap())
        .collect();
    for pair in created.windows(2) {
        assert!(pair[0] >= pair[1], "sessions not in newest-first order");
    }
}

#[tokio::test]
async fn revoke_single_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let latest = login_player(&app, "john@example.com", "SecurePass123").await;
    let access_token = latest["access_token"].as_str().unwrap();

    let sessions: Vec<Value> = client
        .get(&format!("{}/auth/sessions", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sessions.len(), 2);

    // Revoke the older one
    let victim = sessions[1]["id"].as_str().unwrap();
    let response = client
        .delete(&format!("{}/auth/sessions/{}", &app.address, victim))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    // Revoking it again is a 404
    let again = client
        .delete(&format!("{}/auth/sessions/{}", &app.address, victim))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, again.status().as_u16());

    let remaining: Vec<Value> = client
        .get(&format!("{}/auth/sessions", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn revoke_session_cannot_touch_another_players_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    let other = register_player(&app, "jane@example.com", "jane_doe", "SecurePass123").await;
    let other_token = other["access_token"].as_str().unwrap();

    // Jane lists her own session, then John tries to revoke it
    let janes: Vec<Value> = client
        .get(&format!("{}/auth/sessions", &app.address))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let jane_session = janes[0]["id"].as_str().unwrap();

    let john = login_player(&app, "john@example.com", "SecurePass123").await;
    let response = client
        .delete(&format!("{}/auth/sessions/{}", &app.address, jane_session))
        .header(
            "Authorization",
            format!("Bearer {}", john["access_token"].as_str().unwrap()),
        )
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn revoke_all_sessions_except_current_leaves_exactly_one() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    register_player(&app, "john@example.com", "john_doe", "SecurePass123").await;
    login_player(&app, "john@example.com", "SecurePass123").await;
    let latest = login_player(&app, "john@example.com", "SecurePass123").await;
    let access_token = latest["access_token"].as_str().unwrap();

    let sessions: Vec<Value> = client
        .get(&format!("{}/auth/sessions", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sessions.len(), 3);
    // Newest first: the current session is the most recent login
    let current = sessions[0]["id"].as_str().unwrap();

    let response = client
        .delete(&format!(
            "{}/auth/sessions?except={}",
            &app.address, current
        ))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["revoked"], 2);

    let remaining: Vec<Value> = client
        .get(&format!("{}/auth/sessions", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"].as_str().unwrap(), current);
}
