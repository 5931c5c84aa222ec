use firemon_api_client::FiremonApi;

use crate::config::Secrets;

pub async fn run(fm: &FiremonApi, secrets: &Secrets) -> Result<(), String> {
    println!("Scenario: siql");

    let rows = fm
        .sm()
        .siql()
        .secrule(&secrets.sample_siql)
        .await
        .map_err(|e| e.to_string())?;
    println!("Rules matching {:?}: {}", secrets.sample_siql, rows.len());

    Ok(())
}
