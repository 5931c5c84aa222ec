use log::{debug, info};

use crate::error::{Error, Result};
use crate::firemon::request::Request;
use crate::firemon::session::{Body, HttpResponse, Session};

const CPL_PORT: u16 = 55555;
const CPL_PROXY_PATH: &str = "__fmos-cpl__";

/// Root URL of the control panel API.
///
/// The control panel listens on its own port unless it is reached through
/// the proxied path on the main host.
pub fn cpl_url(base_url: &str, proxied: bool) -> String {
    if proxied {
        format!("{base_url}/{CPL_PROXY_PATH}")
    } else {
        format!("{base_url}:{CPL_PORT}")
    }
}

/// Log in to the control panel and return the `Cookie` header value
/// holding its session.
pub async fn login_cpl(
    session: &Session,
    base_url: &str,
    username: &str,
    password: &str,
    proxied: bool,
) -> Result<String> {
    info!("Authenticating Firemon Control Panel: {}", base_url);
    let form = vec![
        ("username".to_string(), username.to_string()),
        ("password".to_string(), password.to_string()),
    ];
    let resp = Request::new(session, &cpl_url(base_url, proxied))
        .key("api/login")
        .post_raw(Body::Form(form))
        .await?;

    let cookie = cookie_header(&resp);
    if cookie.is_empty() {
        return Err(Error::unexpected(format!(
            "{} set no session cookie",
            resp.url
        )));
    }
    debug!("Control panel login returned {} byte(s)", resp.body.len());
    Ok(cookie)
}

/// Fold every `Set-Cookie` header into one `Cookie` request value.
fn cookie_header(resp: &HttpResponse) -> String {
    resp.header_values("set-cookie")
        .filter_map(|raw| raw.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firemon::testing::{self, BASE, FakeTransport};

    #[test]
    fn cpl_url_by_access_mode() {
        assert_eq!(cpl_url("https://fm", false), "https://fm:55555");
        assert_eq!(cpl_url("https://fm", true), "https://fm/__fmos-cpl__");
    }

    #[tokio::test]
    async fn login_collects_session_cookies() {
        let transport = FakeTransport::new();
        let mut resp = testing::response(200, br#"{"ok":true}"#.to_vec());
        resp.headers = vec![
            ("set-cookie".into(), "cpl_session=abc123; Path=/; HttpOnly".into()),
            ("Set-Cookie".into(), "csrf=xyz; Secure".into()),
            ("content-type".into(), "application/json".into()),
        ];
        transport.push(Ok(resp));
        let session = testing::session(&transport);

        let cookie = login_cpl(&session, BASE, "admin", "pw", true).await.unwrap();
        assert_eq!(cookie, "cpl_session=abc123; csrf=xyz");

        let call = &transport.calls()[0];
        assert_eq!(call.url, format!("{BASE}/__fmos-cpl__/api/login"));
        assert!(matches!(call.body, Body::Form(_)));
    }

    #[tokio::test]
    async fn login_without_cookie_is_an_error() {
        let transport = FakeTransport::new();
        transport.push_bytes(200, b"{}");
        let session = testing::session(&transport);

        let err = login_cpl(&session, BASE, "admin", "pw", false).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse(_)));
    }
}
