//! Repository implementations for SQLite
//!
//! CRUD operations for the ledger tables. Functions are generic over
//! `SqliteExecutor` so they run on the pool or inside a transaction.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, Utc};
use rcard_core::{
    CardGrant, FraudReport, Loan, LoanStatus, SponsorCard, User, UserId,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// User Repository
// ============================================================================

/// Repository for the users table
pub struct UserRepo;

impl UserRepo {
    /// Insert a user and return its generated id
    pub async fn insert<'e, E>(
        executor: E,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> PersistenceResult<UserId>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id<'e, E>(executor: E, id: UserId) -> PersistenceResult<Option<UserRow>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn get_by_username<'e, E>(
        executor: E,
        username: &str,
    ) -> PersistenceResult<Option<UserRow>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn update_last_login<'e, E>(
        executor: E,
        id: UserId,
        at: DateTime<Utc>,
    ) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", &id.to_string()));
        }
        Ok(())
    }

    pub async fn get_all<'e, E>(executor: E) -> PersistenceResult<Vec<UserRow>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn count<'e, E>(executor: E) -> PersistenceResult<i64>
    where
        E: SqliteExecutor<'e>,
    {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Card Grant Repository
// ============================================================================

/// Repository for the card_grants table
pub struct CardGrantRepo;

impl CardGrantRepo {
    pub async fn insert<'e, E>(executor: E, user_id: UserId, grant: &CardGrant) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO card_grants (user_id, card_id, card_identifier, card_type, applied_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&grant.id)
        .bind(&grant.card_identifier)
        .bind(&grant.card_type)
        .bind(grant.applied_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Grants of a user in the order they were applied for
    pub async fn list_by_user<'e, E>(executor: E, user_id: UserId) -> PersistenceResult<Vec<CardGrant>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, CardGrantRow>(
            "SELECT * FROM card_grants WHERE user_id = ? ORDER BY applied_at, rowid",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(CardGrant::from).collect())
    }
}

// ============================================================================
// Balance Repository
// ============================================================================

/// Repository for the balances table
pub struct BalanceRepo;

impl BalanceRepo {
    /// Balance of one type; None when never set
    pub async fn get<'e, E>(
        executor: E,
        user_id: UserId,
        balance_type: &str,
    ) -> PersistenceResult<Option<Decimal>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, BalanceRow>(
            "SELECT * FROM balances WHERE user_id = ? AND balance_type = ?",
        )
        .bind(user_id)
        .bind(balance_type)
        .fetch_optional(executor)
        .await?;
        row.map(|r| r.amount()).transpose()
    }

    /// Whole-value set (insert or update)
    pub async fn set<'e, E>(
        executor: E,
        user_id: UserId,
        balance_type: &str,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO balances (user_id, balance_type, amount, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, balance_type) DO UPDATE SET
                amount = excluded.amount,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(balance_type)
        .bind(amount.to_string())
        .bind(at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_by_user<'e, E>(
        executor: E,
        user_id: UserId,
    ) -> PersistenceResult<BTreeMap<String, Decimal>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, BalanceRow>("SELECT * FROM balances WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(executor)
            .await?;

        rows.into_iter()
            .map(|r| {
                let amount = r.amount()?;
                Ok((r.balance_type, amount))
            })
            .collect()
    }
}

// ============================================================================
// Loan Repository
// ============================================================================

/// Repository for the loans table. Loans are scoped by owning user.
pub struct LoanRepo;

impl LoanRepo {
    pub async fn insert<'e, E>(executor: E, loan: &Loan) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let row = LoanRow::from(loan);
        sqlx::query(
            r#"
            INSERT INTO loans (id, user_id, card_id, principal, original_principal,
                interest_rate_monthly, interest_accrued, created_at, due_date, status,
                last_interest_calc, days_duration, paid_at, paid_amount)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(row.user_id)
        .bind(&row.card_id)
        .bind(&row.principal)
        .bind(&row.original_principal)
        .bind(&row.interest_rate_monthly)
        .bind(&row.interest_accrued)
        .bind(row.created_at)
        .bind(row.due_date)
        .bind(&row.status)
        .bind(row.last_interest_calc)
        .bind(row.days_duration)
        .bind(row.paid_at)
        .bind(&row.paid_amount)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Write back the mutable fields of a loan
    pub async fn update<'e, E>(executor: E, loan: &Loan) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let row = LoanRow::from(loan);
        let result = sqlx::query(
            r#"
            UPDATE loans SET
                principal = ?, interest_accrued = ?, status = ?,
                last_interest_calc = ?, paid_at = ?, paid_amount = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&row.principal)
        .bind(&row.interest_accrued)
        .bind(&row.status)
        .bind(row.last_interest_calc)
        .bind(row.paid_at)
        .bind(&row.paid_amount)
        .bind(&row.id)
        .bind(row.user_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Loan", &loan.id));
        }
        Ok(())
    }

    pub async fn get<'e, E>(
        executor: E,
        user_id: UserId,
        loan_id: &str,
    ) -> PersistenceResult<Option<Loan>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = ? AND user_id = ?")
            .bind(loan_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
        row.map(Loan::try_from).transpose()
    }

    /// Loans of a user, newest first, optionally filtered by status
    pub async fn list_by_user<'e, E>(
        executor: E,
        user_id: UserId,
        status: Option<LoanStatus>,
    ) -> PersistenceResult<Vec<Loan>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, LoanRow>(
                    "SELECT * FROM loans WHERE user_id = ? AND status = ?
                     ORDER BY created_at DESC, rowid DESC",
                )
                .bind(user_id)
                .bind(status.as_str())
                .fetch_all(executor)
                .await?
            }
            None => {
                sqlx::query_as::<_, LoanRow>(
                    "SELECT * FROM loans WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
                )
                .bind(user_id)
                .fetch_all(executor)
                .await?
            }
        };

        rows.into_iter().map(Loan::try_from).collect()
    }
}

// ============================================================================
// Sponsor Card Repository
// ============================================================================

/// Repository for the sponsor_cards table
pub struct SponsorCardRepo;

impl SponsorCardRepo {
    pub async fn insert<'e, E>(executor: E, card: &SponsorCard) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let spec = serde_json::to_string(&card.spec)?;
        sqlx::query(
            "INSERT INTO sponsor_cards (id, org_id, public_identifier, spec, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&card.id)
        .bind(&card.org_id)
        .bind(&card.public_identifier)
        .bind(spec)
        .bind(card.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_by_public_id<'e, E>(
        executor: E,
        public_identifier: &str,
    ) -> PersistenceResult<Option<SponsorCard>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, SponsorCardRow>(
            "SELECT * FROM sponsor_cards WHERE public_identifier = ?",
        )
        .bind(public_identifier)
        .fetch_optional(executor)
        .await?;
        row.map(SponsorCard::try_from).transpose()
    }

    pub async fn list_by_org<'e, E>(executor: E, org_id: &str) -> PersistenceResult<Vec<SponsorCard>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, SponsorCardRow>(
            "SELECT * FROM sponsor_cards WHERE org_id = ? ORDER BY created_at, rowid",
        )
        .bind(org_id)
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(SponsorCard::try_from).collect()
    }

    pub async fn delete<'e, E>(executor: E, org_id: &str, id: &str) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM sponsor_cards WHERE id = ? AND org_id = ?")
            .bind(id)
            .bind(org_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("SponsorCard", id));
        }
        Ok(())
    }
}

// ============================================================================
// Fraud Report Repository
// ============================================================================

/// Repository for the fraud_reports table
pub struct FraudReportRepo;

impl FraudReportRepo {
    pub async fn insert<'e, E>(executor: E, report: &FraudReport) -> PersistenceResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO fraud_reports (id, user_id, report_type, description, ip_address, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.id)
        .bind(report.user_id)
        .bind(&report.report_type)
        .bind(&report.description)
        .bind(&report.ip_address)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_by_user<'e, E>(executor: E, user_id: UserId) -> PersistenceResult<Vec<FraudReport>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, FraudReportRow>(
            "SELECT * FROM fraud_reports WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(FraudReport::try_from).collect()
    }
}

// ============================================================================
// Aggregate loads
// ============================================================================

/// Load a full user document (row + cards + balances) on one connection
pub async fn load_user(conn: &mut SqliteConnection, id: UserId) -> PersistenceResult<Option<User>> {
    let Some(row) = UserRepo::get_by_id(&mut *conn, id).await? else {
        return Ok(None);
    };
    let cards = CardGrantRepo::list_by_user(&mut *conn, id).await?;
    let balances = BalanceRepo::list_by_user(&mut *conn, id).await?;

    Ok(Some(User {
        id: row.id,
        username: row.username,
        password_hash: row.password_hash,
        cards,
        balances,
        created_at: row.created_at,
        last_login: row.last_login,
    }))
}

// ============================================================================
// Database initialization
// ============================================================================

/// Connect to an existing or new SQLite database
pub async fn connect(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Connect and bring the schema up to date
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = connect(database_url).await?;
    run_migrations(&pool).await?;
    tracing::debug!(url = database_url, "database ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("test.db").display());
        let pool = init_database(&url).await.unwrap();
        (dir, pool)
    }

    fn loan(id: &str, user_id: UserId, created: NaiveDate) -> Loan {
        Loan::new(
            id.to_string(),
            user_id,
            "default".to_string(),
            dec!(100),
            dec!(15),
            7,
            created,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_user_insert_and_load() {
        let (_dir, pool) = test_pool().await;
        let id = UserRepo::insert(&pool, "alice", "hash", Utc::now()).await.unwrap();
        assert!(id > 0);

        BalanceRepo::set(&pool, id, "central_wallet", dec!(10000), Utc::now())
            .await
            .unwrap();
        CardGrantRepo::insert(
            &pool,
            id,
            &CardGrant {
                id: "gold-credit".to_string(),
                card_identifier: "4111".to_string(),
                card_type: "credit".to_string(),
                applied_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let user = load_user(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.central_wallet(), dec!(10000));
        assert!(user.has_card("gold-credit"));

        assert!(load_user(&mut conn, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_unique() {
        let (_dir, pool) = test_pool().await;
        UserRepo::insert(&pool, "alice", "hash", Utc::now()).await.unwrap();
        let err = UserRepo::insert(&pool, "alice", "hash", Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_duplicate_card_grant_rejected() {
        let (_dir, pool) = test_pool().await;
        let id = UserRepo::insert(&pool, "bob", "hash", Utc::now()).await.unwrap();
        let grant = CardGrant {
            id: "7".to_string(),
            card_identifier: "abc".to_string(),
            card_type: "custom".to_string(),
            applied_at: Utc::now(),
        };
        CardGrantRepo::insert(&pool, id, &grant).await.unwrap();
        let err = CardGrantRepo::insert(&pool, id, &grant).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_balance_set_is_whole_value() {
        let (_dir, pool) = test_pool().await;
        let id = UserRepo::insert(&pool, "carol", "hash", Utc::now()).await.unwrap();
        assert_eq!(BalanceRepo::get(&pool, id, "central_wallet").await.unwrap(), None);

        BalanceRepo::set(&pool, id, "central_wallet", dec!(50.25), Utc::now())
            .await
            .unwrap();
        BalanceRepo::set(&pool, id, "central_wallet", dec!(20), Utc::now())
            .await
            .unwrap();
        assert_eq!(
            BalanceRepo::get(&pool, id, "central_wallet").await.unwrap(),
            Some(dec!(20))
        );
    }

    #[tokio::test]
    async fn test_loans_listed_newest_first_with_filter() {
        let (_dir, pool) = test_pool().await;
        let id = UserRepo::insert(&pool, "dave", "hash", Utc::now()).await.unwrap();
        let jan = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mar = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();

        LoanRepo::insert(&pool, &loan("loan_a", id, jan)).await.unwrap();
        let mut paid = loan("loan_b", id, mar);
        paid.status = LoanStatus::Paid;
        LoanRepo::insert(&pool, &paid).await.unwrap();

        let all = LoanRepo::list_by_user(&pool, id, None).await.unwrap();
        assert_eq!(
            all.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            vec!["loan_b", "loan_a"]
        );

        let active = LoanRepo::list_by_user(&pool, id, Some(LoanStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "loan_a");
    }

    #[tokio::test]
    async fn test_loan_scoped_to_owner() {
        let (_dir, pool) = test_pool().await;
        let alice = UserRepo::insert(&pool, "alice", "hash", Utc::now()).await.unwrap();
        let bob = UserRepo::insert(&pool, "bob", "hash", Utc::now()).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        LoanRepo::insert(&pool, &loan("loan_a", alice, today)).await.unwrap();

        assert!(LoanRepo::get(&pool, alice, "loan_a").await.unwrap().is_some());
        assert!(LoanRepo::get(&pool, bob, "loan_a").await.unwrap().is_none());

        let mut foreign = loan("loan_a", bob, today);
        foreign.principal = dec!(1);
        let err = LoanRepo::update(&pool, &foreign).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_loan_update_in_transaction_rolls_back() {
        let (_dir, pool) = test_pool().await;
        let id = UserRepo::insert(&pool, "erin", "hash", Utc::now()).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let original = loan("loan_t", id, today);
        LoanRepo::insert(&pool, &original).await.unwrap();

        {
            let mut tx = pool.begin().await.unwrap();
            let mut changed = original.clone();
            changed.principal = dec!(1);
            LoanRepo::update(&mut *tx, &changed).await.unwrap();
            BalanceRepo::set(&mut *tx, id, "central_wallet", dec!(5), Utc::now())
                .await
                .unwrap();
            // dropped without commit
        }

        let stored = LoanRepo::get(&pool, id, "loan_t").await.unwrap().unwrap();
        assert_eq!(stored, original);
        assert_eq!(BalanceRepo::get(&pool, id, "central_wallet").await.unwrap(), None);
    }
}
