//! Central wallet commands

use anyhow::{Context, Result};
use rcard_business::RcardApi;

use crate::app;
use crate::WalletAction;

pub async fn handle(api: &RcardApi, action: &WalletAction) -> Result<()> {
    match action {
        WalletAction::Balance { auth } => {
            let session = app::login(api, auth).await?;
            let balance = api.balance(&session).await?;
            println!("Central wallet: {}", balance);
        }
        WalletAction::Deposit { amount, auth } => {
            let session = app::login(api, auth).await?;
            let balance = api
                .deposit(&session, *amount)
                .await
                .context("Deposit failed")?;
            println!("Deposited {}. New balance: {}", amount, balance);
        }
    }
    Ok(())
}
