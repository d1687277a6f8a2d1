use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub organizer_id: Option<String>,
    pub amount: f64,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Count and sum over a set of transactions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionTotals {
    pub count: usize,
    pub amount: f64,
    pub latest: Option<DateTime<Utc>>,
}

impl TransactionTotals {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        transactions.iter().fold(Self::default(), |mut totals, t| {
            totals.count += 1;
            totals.amount += t.amount;
            totals.latest = totals.latest.max(t.created_at);
            totals
        })
    }
}
