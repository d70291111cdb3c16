//! Fraud report commands

use anyhow::Result;
use rcard_business::RcardApi;

use crate::app;
use crate::FraudAction;

pub async fn handle(api: &RcardApi, action: &FraudAction) -> Result<()> {
    match action {
        FraudAction::Report {
            description,
            r#type,
            ip,
            auth,
        } => {
            let session = app::login(api, auth).await?;
            let report = api
                .report_fraud(&session, r#type.as_deref(), description, ip.as_deref())
                .await?;
            println!("Submitted report {} ({})", report.id, report.status.as_str());
        }
    }
    Ok(())
}
