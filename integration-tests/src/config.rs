use std::fs;
use std::path::Path;

use firemon_api_client::{ClientConfig, FiremonApi};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Secrets {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_domain")]
    pub domain_id: i64,
    #[serde(default)]
    pub verify_tls: bool,
    /// Name of a device known to exist on the host.
    pub sample_device: Option<String>,
}

fn default_domain() -> i64 {
    1
}

pub fn load_secrets() -> Result<Secrets, String> {
    let mut path = std::env::current_dir().map_err(|e| e.to_string())?;
    path.push("secrets.json");
    read_secrets(&path)
}

fn read_secrets(path: &Path) -> Result<Secrets, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read secrets.json: {e}"))?;
    serde_json::from_str(&contents).map_err(|e| format!("Invalid secrets.json: {e}"))
}

/// Authenticated client for the host in `secrets`.
pub async fn connect(secrets: &Secrets) -> Result<FiremonApi, String> {
    let config = ClientConfig::new(&secrets.host)
        .verify_tls(secrets.verify_tls)
        .domain_id(secrets.domain_id);
    let mut fm = FiremonApi::new(config).map_err(|e| e.to_string())?;
    fm.auth(&secrets.username, &secrets.password)
        .await
        .map_err(|e| e.to_string())?;
    Ok(fm)
}
