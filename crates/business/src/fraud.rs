//! Fraud report submission

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use rcard_core::fraud::DEFAULT_REPORT_TYPE;
use rcard_core::{EventType, FraudReport, FraudReportStatus, UserId};
use rcard_persistence::FraudReportRepo;
use tracing::warn;
use uuid::Uuid;

pub struct FraudService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FraudService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record a report as pending. No detection is run.
    pub async fn submit(
        &self,
        user_id: UserId,
        report_type: Option<&str>,
        description: &str,
        ip_address: Option<&str>,
    ) -> BusinessResult<FraudReport> {
        let description = description.trim();
        if description.is_empty() {
            return Err(BusinessError::InvalidInput("description is required".to_string()));
        }
        self.ctx.ensure_user(self.ctx.pool(), user_id).await?;

        let report_type = report_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_REPORT_TYPE);

        let report = FraudReport {
            id: format!("fraud_{}", Uuid::new_v4().simple()),
            user_id,
            report_type: report_type.to_string(),
            description: description.to_string(),
            ip_address: ip_address.map(str::to_string),
            status: FraudReportStatus::Pending,
            created_at: self.ctx.now(),
        };
        FraudReportRepo::insert(self.ctx.pool(), &report).await?;

        warn!(user_id, report_id = %report.id, report_type = %report.report_type, "fraud report submitted");
        self.ctx.record(
            &self
                .ctx
                .event(EventType::FraudReported, user_id)
                .with_description(&report.report_type),
        );

        Ok(report)
    }

    pub async fn list(&self, user_id: UserId) -> BusinessResult<Vec<FraudReport>> {
        Ok(FraudReportRepo::list_by_user(self.ctx.pool(), user_id).await?)
    }
}
