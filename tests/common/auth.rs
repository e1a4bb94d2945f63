use std::time::Duration;

use axum::http::{HeaderMap, Method};
use axum::Router;

use word_refresher::services::mailer::MemoryMailer;

use super::http::{request, response_json};

pub const TEST_PASSWORD: &str = "Passw0rd!";

pub struct Session {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

impl Session {
    pub fn bearer(&self) -> (&'static str, String) {
        ("authorization", auth_header(&self.token))
    }

    pub fn cookie(&self) -> (&'static str, String) {
        ("cookie", format!("auth_token={}", self.token))
    }
}

pub fn auth_header(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn unique_email(tag: &str) -> String {
    format!("{tag}-{}@test.com", uuid::Uuid::new_v4().simple())
}

/// Value of `cookie_name` from the `Set-Cookie` headers.
pub fn extract_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|s| {
            s.strip_prefix(&format!("{cookie_name}="))
                .map(|rest| rest.split(';').next().unwrap_or("").to_string())
        })
}

/// Waits for the background sender to deliver mail to `email` and returns the
/// raw token from its verification link.
pub async fn wait_for_verification_token(mailer: &MemoryMailer, email: &str) -> String {
    for _ in 0..100 {
        let sent = mailer.sent().await;
        if let Some(message) = sent.iter().rev().find(|m| m.to == email) {
            return message
                .action_url
                .split("token=")
                .nth(1)
                .expect("token in verification link")
                .to_string();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no verification email sent to {email}");
}

pub async fn signup(app: &Router, name: &str, email: &str, password: &str) -> serde_json::Value {
    let response = request(
        app,
        Method::POST,
        "/api/auth/signup",
        Some(serde_json::json!({
            "name": name,
            "email": email,
            "password": password,
        })),
        &[],
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert!(status.is_success(), "signup failed: {body}");
    body
}

pub async fn verify(app: &Router, token: &str) -> serde_json::Value {
    let response = request(
        app,
        Method::POST,
        "/api/auth/verify-email",
        Some(serde_json::json!({ "token": token })),
        &[],
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert!(status.is_success(), "verify failed: {body}");
    body
}

/// Signs up, verifies through the mailed link and logs in.
pub async fn register_and_login(app: &Router, mailer: &MemoryMailer) -> Session {
    let email = unique_email("learner");
    let body = signup(app, "Learner", &email, TEST_PASSWORD).await;
    assert_eq!(body["data"]["success"], true, "signup rejected: {body}");
    let user_id = body["data"]["user"]["id"]
        .as_str()
        .expect("user id in signup response")
        .to_string();

    let token = wait_for_verification_token(mailer, &email).await;
    let verified = verify(app, &token).await;
    assert_eq!(verified["data"]["success"], true, "verify rejected: {verified}");

    let response = request(
        app,
        Method::POST,
        "/api/auth/login",
        Some(serde_json::json!({ "email": email, "password": TEST_PASSWORD })),
        &[],
    )
    .await;
    let (status, headers, body) = response_json(response).await;
    assert!(status.is_success(), "login failed: {body}");
    assert_eq!(body["data"]["success"], true, "login rejected: {body}");

    let token = extract_cookie_value(&headers, "auth_token").expect("auth_token cookie");
    Session {
        token,
        user_id,
        email,
    }
}
