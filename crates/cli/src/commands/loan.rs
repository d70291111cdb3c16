//! Loan commands

use anyhow::{Context, Result};
use rcard_business::RcardApi;
use rcard_core::{round_money, LoanView};

use super::print_json;
use crate::app;
use crate::LoanAction;

fn print_loan_row(view: &LoanView) {
    let loan = &view.loan;
    println!(
        "{:<38} {:<16} {:>10} {:>10} {:>10} {:<7} due {}",
        loan.id,
        loan.card_id,
        round_money(loan.principal),
        round_money(loan.interest_accrued),
        round_money(view.total_due),
        loan.status.as_str(),
        loan.due_date
    );
}

pub async fn handle(api: &RcardApi, action: &LoanAction) -> Result<()> {
    match action {
        LoanAction::Preview {
            card_id,
            principal,
            days,
            auth,
        } => {
            let session = app::login(api, auth).await?;
            let preview = api
                .preview_loan(&session, card_id, *principal, *days)
                .await?;
            print_json(&preview)?;
        }
        LoanAction::Create {
            card_id,
            principal,
            days,
            auth,
        } => {
            let session = app::login(api, auth).await?;
            let loan = api
                .create_loan(&session, card_id, *principal, *days)
                .await
                .context("Loan creation failed")?;
            println!("Created {}", loan.loan);
            println!("   Due: {}", loan.loan.due_date);
        }
        LoanAction::List { status, auth } => {
            let session = app::login(api, auth).await?;
            let loans = api
                .list_loans(&session, status.map(|s| s.to_core_status()))
                .await?;
            if loans.is_empty() {
                println!("No loans");
            }
            for view in &loans {
                print_loan_row(view);
            }
        }
        LoanAction::Show { loan_id, auth } => {
            let session = app::login(api, auth).await?;
            let loan = api.get_current_loan(&session, loan_id).await?;
            print_json(&loan)?;
        }
        LoanAction::Overview { auth } => {
            let session = app::login(api, auth).await?;
            let overview = api.loans_overview(&session).await?;
            print_json(&overview)?;
        }
        LoanAction::Refresh { loan_id, auth } => {
            let session = app::login(api, auth).await?;
            match loan_id {
                Some(loan_id) => {
                    let loan = api.refresh_loan(&session, loan_id).await?;
                    print_loan_row(&loan);
                }
                None => {
                    let count = api.refresh_all_loans(&session).await?;
                    println!("Refreshed {} loan(s)", count);
                }
            }
        }
        LoanAction::Repay {
            loan_id,
            amount,
            auth,
        } => {
            let session = app::login(api, auth).await?;
            let outcome = api
                .repay_loan(&session, loan_id, *amount)
                .await
                .context("Repayment failed")?;
            print_json(&outcome)?;
        }
    }
    Ok(())
}
