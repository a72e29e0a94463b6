use ledgerly::config::CONFIG;
use ledgerly::core::models::money::format_minor;
use ledgerly::{
    BalanceService, Expense, InMemoryCache, InMemoryLogging, InMemoryStorage, LedgerError, Settlement,
    SettlementStatus, Split,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Service = BalanceService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

// Ledger file layout
#[derive(Deserialize)]
struct LedgerFile {
    group_id: String,
    #[serde(default)]
    expenses: Vec<ExpenseRecord>,
    #[serde(default)]
    settlements: Vec<SettlementRecord>,
}

#[derive(Deserialize)]
struct ExpenseRecord {
    payer_id: String,
    amount: i64,
    /// Explicit shares per member. When absent the amount is split equally
    /// between `members`.
    #[serde(default)]
    splits: Option<BTreeMap<String, i64>>,
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct SettlementRecord {
    payer_id: String,
    payee_id: String,
    amount: i64,
    #[serde(default = "completed")]
    status: SettlementStatus,
}

fn completed() -> SettlementStatus {
    SettlementStatus::Completed
}

#[derive(Serialize)]
struct Report {
    group_id: String,
    version: u64,
    balances: BTreeMap<String, String>,
    transfers: Vec<String>,
}

async fn replay(service: &Service, ledger: LedgerFile) -> Result<(), LedgerError> {
    for record in ledger.expenses {
        let expense = match record.splits {
            Some(splits) => {
                let splits = splits.into_iter().map(|(user, amount)| Split::new(user, amount)).collect();
                Expense::new(&ledger.group_id, record.payer_id, record.amount, splits, record.description)
            }
            None => Expense::split_equally(
                &ledger.group_id,
                record.payer_id,
                record.amount,
                &record.members,
                record.description,
            )?,
        };
        service.add_expense(expense).await?;
    }
    for record in ledger.settlements {
        let settlement = Settlement::new(
            &ledger.group_id,
            record.payer_id,
            record.payee_id,
            record.amount,
            record.status,
        );
        service.record_settlement(settlement).await?;
    }
    Ok(())
}

async fn report(service: &Service, group_id: &str) -> Result<Report, LedgerError> {
    let entry = service.cached_balance(group_id).await?;
    let plan = service.settlement_plan(group_id).await?;
    Ok(Report {
        group_id: group_id.to_string(),
        version: entry.version,
        balances: entry
            .balances
            .iter()
            .map(|(member, amount)| (member.to_string(), format_minor(amount)))
            .collect(),
        transfers: plan
            .iter()
            .map(|t| format!("{} pays {} {}", t.from_user_id, t.to_user_id, format_minor(t.amount)))
            .collect(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&CONFIG.log_level))
        .init();

    let service = Service::new(
        InMemoryStorage::new(),
        InMemoryCache::new(),
        InMemoryLogging::new(),
        &CONFIG,
    );

    let Some(path) = CONFIG.ledger_file.as_deref() else {
        info!("LEDGER_FILE is not set, nothing to compute");
        return Ok(());
    };

    info!("Loading ledger from {}", path);
    let raw = tokio::fs::read_to_string(path).await?;
    let ledger: LedgerFile = serde_json::from_str(&raw)?;
    let group_id = ledger.group_id.clone();

    if let Err(e) = replay(&service, ledger).await {
        warn!("Ledger {} rejected: {}", path, e);
        return Err(e.into());
    }

    let report = report(&service, &group_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
