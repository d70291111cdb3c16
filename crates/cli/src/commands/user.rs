//! User account commands

use anyhow::{Context, Result};
use rcard_business::RcardApi;

use super::print_json;
use crate::app;
use crate::UserAction;

pub async fn handle(api: &RcardApi, action: &UserAction) -> Result<()> {
    match action {
        UserAction::Register { username, password } => {
            let user = api
                .register(username, password)
                .await
                .context("Registration failed")?;
            println!("Registered user {} (id {})", user.username, user.id);
        }
        UserAction::Login { auth } => {
            let session = app::login(api, auth).await?;
            if let Some(principal) = session.principal() {
                println!("Logged in as {} (id {})", principal.username, principal.user_id);
            }
        }
        UserAction::Show { auth } => {
            let session = app::login(api, auth).await?;
            let user = api.current_user(&session).await?;
            print_json(&user)?;
        }
    }
    Ok(())
}
