//! # Balance Math
//!
//! Per-article stock snapshot.
//!
//! ```text
//! income   = kg as registered or imported
//! sent     = Σ allocation weight of SOLD products
//! reserved = Σ allocation weight of RESERVED products
//! balance  = income − sent
//! free     = balance − reserved
//! ```
//!
//! All figures are rounded to 0.01 kg.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::numeric::round2;

/// One row of the balance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArticleBalance {
    pub service_id: i64,
    pub id: i64,
    pub code: String,
    pub description: String,
    pub income: f64,
    pub sent: f64,
    pub reserved: f64,
    pub balance: f64,
    pub free: f64,
}

/// Raw sums for one article, as aggregated by the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFlows {
    pub service_id: i64,
    pub id: i64,
    pub code: String,
    pub description: String,
    pub income: f64,
    pub sent: f64,
    pub reserved: f64,
}

impl From<ArticleFlows> for ArticleBalance {
    fn from(flows: ArticleFlows) -> Self {
        let balance = flows.income - flows.sent;
        let free = balance - flows.reserved;
        ArticleBalance {
            service_id: flows.service_id,
            id: flows.id,
            code: flows.code,
            description: flows.description,
            income: round2(flows.income),
            sent: round2(flows.sent),
            reserved: round2(flows.reserved),
            balance: round2(balance),
            free: round2(free),
        }
    }
}
