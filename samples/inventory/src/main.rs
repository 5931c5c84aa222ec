mod config;
mod scenarios;

use firemon_api_client::{ClientConfig, FiremonApi};

use config::load_secrets;

#[tokio::main]
async fn main() -> Result<(), String> {
    let secrets = load_secrets()?;

    let config = ClientConfig::new(&secrets.host).verify_tls(secrets.verify_tls);
    let mut fm = FiremonApi::new(config).map_err(|e| e.to_string())?;
    fm.auth(&secrets.username, &secrets.password)
        .await
        .map_err(|e| e.to_string())?;
    println!("{fm}");

    scenarios::devices::run(&fm).await?;
    scenarios::siql::run(&fm, &secrets).await?;

    Ok(())
}
