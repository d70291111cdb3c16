//! Operation surface consumed by boundary layers
//!
//! Each operation resolves the session to a user, applies the per-user
//! API rate limit, then delegates to the owning service.

use crate::auth::{AuthProvider, Session, SessionAuth};
use crate::error::BusinessResult;
use crate::fraud::FraudService;
use crate::loan::{LoanLifecycle, LoanPreview, LoansOverview};
use crate::rate_limit::RateAction;
use crate::services::ServiceContext;
use crate::user::{CardGrantRequest, UserService};
use crate::wallet::WalletLedger;
use rcard_core::{
    CardGrant, Event, FraudReport, LoanStatus, LoanView, RepaymentOutcome, User, UserId,
};
use rcard_persistence::{EventFilter, EventReader};
use rust_decimal::Decimal;

pub struct RcardApi {
    ctx: ServiceContext,
    auth: Box<dyn AuthProvider>,
}

impl RcardApi {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            auth: Box::new(SessionAuth),
        }
    }

    pub fn with_auth(mut self, auth: Box<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    fn authorize(&self, session: &Session) -> BusinessResult<UserId> {
        let user_id = self.auth.require_authenticated_user(session)?;
        self.ctx.rate_limit(&user_id.to_string(), RateAction::Api)?;
        Ok(user_id)
    }

    // === Accounts ===

    pub async fn register(&self, username: &str, password: &str) -> BusinessResult<User> {
        UserService::new(&self.ctx).register(username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> BusinessResult<Session> {
        let principal = UserService::new(&self.ctx)
            .authenticate(username, password)
            .await?;
        Ok(Session::authenticated(principal))
    }

    pub async fn current_user(&self, session: &Session) -> BusinessResult<User> {
        let user_id = self.authorize(session)?;
        UserService::new(&self.ctx).get_user(user_id).await
    }

    pub async fn apply_card(
        &self,
        session: &Session,
        request: CardGrantRequest,
    ) -> BusinessResult<CardGrant> {
        let user_id = self.authorize(session)?;
        UserService::new(&self.ctx).grant_card(user_id, request).await
    }

    pub async fn list_cards(&self, session: &Session) -> BusinessResult<Vec<CardGrant>> {
        let user_id = self.authorize(session)?;
        UserService::new(&self.ctx).list_cards(user_id).await
    }

    // === Wallet ===

    pub async fn balance(&self, session: &Session) -> BusinessResult<Decimal> {
        let user_id = self.authorize(session)?;
        WalletLedger::new(&self.ctx).central_wallet(user_id).await
    }

    pub async fn deposit(&self, session: &Session, amount: Decimal) -> BusinessResult<Decimal> {
        let user_id = self.authorize(session)?;
        WalletLedger::new(&self.ctx).deposit(user_id, amount).await
    }

    // === Loans ===

    pub async fn preview_loan(
        &self,
        session: &Session,
        card_id: &str,
        principal: Decimal,
        days: u32,
    ) -> BusinessResult<LoanPreview> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx)
            .preview(user_id, card_id, principal, days)
            .await
    }

    pub async fn create_loan(
        &self,
        session: &Session,
        card_id: &str,
        principal: Decimal,
        days: u32,
    ) -> BusinessResult<LoanView> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx)
            .create(user_id, card_id, principal, days)
            .await
    }

    pub async fn list_loans(
        &self,
        session: &Session,
        status: Option<LoanStatus>,
    ) -> BusinessResult<Vec<LoanView>> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx).list(user_id, status).await
    }

    pub async fn get_current_loan(&self, session: &Session, loan_id: &str) -> BusinessResult<LoanView> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx).get_current(user_id, loan_id).await
    }

    pub async fn refresh_loan(&self, session: &Session, loan_id: &str) -> BusinessResult<LoanView> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx)
            .refresh_interest(user_id, loan_id)
            .await
    }

    pub async fn refresh_all_loans(&self, session: &Session) -> BusinessResult<usize> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx).refresh_all(user_id).await
    }

    pub async fn repay_loan(
        &self,
        session: &Session,
        loan_id: &str,
        amount: Decimal,
    ) -> BusinessResult<RepaymentOutcome> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx)
            .repay(user_id, loan_id, amount)
            .await
    }

    pub async fn loans_overview(&self, session: &Session) -> BusinessResult<LoansOverview> {
        let user_id = self.authorize(session)?;
        LoanLifecycle::new(&self.ctx).overview(user_id).await
    }

    // === Reports ===

    pub async fn report_fraud(
        &self,
        session: &Session,
        report_type: Option<&str>,
        description: &str,
        ip_address: Option<&str>,
    ) -> BusinessResult<FraudReport> {
        let user_id = self.authorize(session)?;
        FraudService::new(&self.ctx)
            .submit(user_id, report_type, description, ip_address)
            .await
    }

    /// The caller's audit trail, newest `limit` events
    pub fn history(&self, session: &Session, limit: usize) -> BusinessResult<Vec<Event>> {
        let user_id = self.authorize(session)?;
        let reader = EventReader::new(self.ctx.events().base_path());
        let events = reader.read_all()?;
        Ok(EventFilter::new().user(user_id).limit(limit).apply(events))
    }
}
