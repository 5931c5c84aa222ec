use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::firemon::request::{Request, Response};
use crate::firemon::session::{Body, Session};

const LOGIN_KEY: &str = "securitymanager/api/authentication/login";
const VERSION_KEY: &str = "securitymanager/api/version";
const PASSWORD_KEY: &str = "securitymanager/api/user/password";

/// `Authorization` header value for HTTP Basic credentials.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

#[derive(Debug, Serialize)]
struct LoginPayload<'a> {
    username: &'a str,
    password: &'a str,
}

/// Version information reported by Security Manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub fmos_version: String,
    #[serde(default)]
    pub platform_version: String,
    /// Additional fields returned by the API.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A Security Manager domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainInfo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Additional fields returned by the API.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// POST the login form to Security Manager.
///
/// The session is expected to carry the same credentials as Basic auth;
/// the login call only establishes the server-side session.
pub async fn login(session: &Session, base_url: &str, username: &str, password: &str) -> Result<()> {
    info!("Authenticating Firemon connection: {}", base_url);
    let payload = serde_json::to_value(LoginPayload { username, password })?;
    Request::new(session, base_url)
        .key(LOGIN_KEY)
        .post_json(&payload)
        .await?;
    Ok(())
}

/// Version details of the host.
pub async fn fetch_version(session: &Session, base_url: &str) -> Result<VersionInfo> {
    let json = Request::new(session, base_url).key(VERSION_KEY).get().await?;
    let version: VersionInfo = serde_json::from_value(json)?;
    debug!("{} runs FMOS {}", base_url, version.fmos_version);
    Ok(version)
}

/// Look up a domain by id.
pub async fn fetch_domain(session: &Session, base_url: &str, domain_id: i64) -> Result<DomainInfo> {
    let json = Request::new(session, base_url)
        .key(format!("securitymanager/api/domain/{domain_id}"))
        .get()
        .await?;
    Ok(serde_json::from_value(json)?)
}

/// Change a Security Manager password without an authenticated session.
pub async fn change_password(
    session: &Session,
    base_url: &str,
    username: &str,
    old_password: &str,
    new_password: &str,
) -> Result<Response> {
    let form = vec![
        ("username".to_string(), username.to_string()),
        ("oldPassword".to_string(), old_password.to_string()),
        ("newPassword".to_string(), new_password.to_string()),
        ("newPasswordConfirm".to_string(), new_password.to_string()),
    ];
    Request::new(session, base_url)
        .key(PASSWORD_KEY)
        .headers(vec![
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("Accept".to_string(), "application/json".to_string()),
            ("Suppress-Auth-Header".to_string(), "true".to_string()),
        ])
        .put(Body::Form(form))
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::firemon::testing::{self, BASE, FakeTransport};

    #[test]
    fn basic_header_is_base64_of_user_and_password() {
        assert_eq!(basic_auth_header("firemon", "firemon"), "Basic ZmlyZW1vbjpmaXJlbW9u");
    }

    #[tokio::test]
    async fn login_posts_json_credentials() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"authorized": true}));
        let session = testing::session(&transport);

        login(&session, BASE, "firemon", "s3cret").await.unwrap();

        let call = &transport.calls()[0];
        assert_eq!(call.url, format!("{BASE}/{LOGIN_KEY}"));
        let Body::Json(body) = &call.body else {
            panic!("expected json body");
        };
        assert_eq!(body, &json!({"username": "firemon", "password": "s3cret"}));
    }

    #[tokio::test]
    async fn version_keeps_unknown_fields() {
        let transport = FakeTransport::new();
        transport.push_json(
            200,
            json!({"version": "10.0.0", "fmosVersion": "2023.10", "platformVersion": "1.2", "build": 42}),
        );
        let session = testing::session(&transport);

        let version = fetch_version(&session, BASE).await.unwrap();
        assert_eq!(version.fmos_version, "2023.10");
        assert_eq!(version.platform_version, "1.2");
        assert_eq!(version.extra["build"], 42);
    }

    #[tokio::test]
    async fn change_password_sends_a_form_without_auth() {
        let transport = FakeTransport::new();
        transport.push_bytes(204, b"");
        let session = testing::session(&transport);

        let resp = change_password(&session, BASE, "bob", "old", "new").await.unwrap();
        assert_eq!(resp, Response::Empty);

        let call = &transport.calls()[0];
        assert_eq!(call.method, reqwest::Method::PUT);
        assert!(call.headers.iter().any(|(k, v)| k == "Suppress-Auth-Header" && v == "true"));
        let Body::Form(fields) = &call.body else {
            panic!("expected form body");
        };
        assert!(fields.contains(&("newPasswordConfirm".to_string(), "new".to_string())));
    }
}
