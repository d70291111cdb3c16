//! Audit trail of the logged-in user

use anyhow::Result;
use rcard_business::RcardApi;

use crate::app;
use crate::AuthArgs;

pub async fn show(api: &RcardApi, auth: &AuthArgs, limit: usize) -> Result<()> {
    let session = app::login(api, auth).await?;
    let events = api.history(&session, limit)?;

    if events.is_empty() {
        println!("No events");
    }
    for event in &events {
        println!("{}", event);
    }
    Ok(())
}
