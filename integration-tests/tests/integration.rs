//! Run with `cargo test -- --ignored` and a `secrets.json` in place.

use firemon_api_integration_tests::config::{connect, load_secrets};

#[tokio::test]
#[ignore = "needs a live FireMon host"]
async fn login_smoke() -> Result<(), String> {
    let secrets = load_secrets()?;
    let fm = connect(&secrets).await?;

    let version = fm.version().ok_or("no version after login")?;
    assert!(!version.version.trim().is_empty());
    assert!(fm.domain().is_some(), "Expected access to domain {}", secrets.domain_id);

    Ok(())
}

#[tokio::test]
#[ignore = "needs a live FireMon host"]
async fn devices_smoke() -> Result<(), String> {
    let secrets = load_secrets()?;
    let fm = connect(&secrets).await?;
    let sm = fm.sm();

    let devices = sm.devices().all().await.map_err(|e| e.to_string())?;
    let count = sm.devices().count().await.map_err(|e| e.to_string())?;
    assert_eq!(devices.len() as u64, count, "Expected count to match the listing");

    if let Some(name) = &secrets.sample_device {
        let device = sm
            .devices()
            .get_by_name(name)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(device.to_string(), *name);
        let packs = sm.device_packs().all().await.map_err(|e| e.to_string())?;
        assert!(!packs.is_empty(), "Expected at least one device pack");
    }

    Ok(())
}

#[tokio::test]
#[ignore = "needs a live FireMon host"]
async fn siql_smoke() -> Result<(), String> {
    let secrets = load_secrets()?;
    let fm = connect(&secrets).await?;

    let query = format!("domain{{id={}}} | fields(name)", secrets.domain_id);
    let rows = fm.sm().siql().device(&query).await.map_err(|e| e.to_string())?;
    let devices = fm.sm().devices().all().await.map_err(|e| e.to_string())?;
    assert_eq!(rows.len(), devices.len());

    Ok(())
}
