use firemon_api_client::FiremonApi;

pub async fn run(fm: &FiremonApi) -> Result<(), String> {
    println!("Scenario: devices");

    let sm = fm.sm();
    let devices = sm.devices().all().await.map_err(|e| e.to_string())?;
    println!("Devices: {}", devices.len());

    for device in devices.iter().take(5) {
        let pack = device
            .nested("devicePack")
            .map(|p| p.to_string())
            .unwrap_or_default();
        println!(
            "  {} ({}) {}",
            device,
            device.get_str("managementIp").unwrap_or("-"),
            pack
        );
    }

    let packs = sm.device_packs().all().await.map_err(|e| e.to_string())?;
    println!("Device packs: {}", packs.len());

    Ok(())
}
