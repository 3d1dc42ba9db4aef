use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

// ---------------------------------------------------------------------------
// SubscriptionKind – Paid / Free classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SubscriptionKind {
    Paid,
    Free,
}

impl SubscriptionKind {
    /// Paid iff the yearly subscription revenue is positive; missing counts as 0.
    pub fn from_revenue(subscription_revenue: Option<f64>) -> Self {
        if subscription_revenue.unwrap_or(0.0) > 0.0 {
            SubscriptionKind::Paid
        } else {
            SubscriptionKind::Free
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionKind::Paid => write!(f, "Paid"),
            SubscriptionKind::Free => write!(f, "Free"),
        }
    }
}

// ---------------------------------------------------------------------------
// CustomerRecord – one cleaned row of the customer export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    pub name: String,
    pub contract_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub start_year: Option<i32>,
    pub total_revenue: f64,
    pub subscription_revenue: Option<f64>,
    pub fee_revenue: Option<f64>,
    /// `total_revenue - fee_revenue`, absent when the fee is.
    pub invoiced_revenue: Option<f64>,
    pub subscription_kind: SubscriptionKind,
}

impl CustomerRecord {
    /// Build a record and fill in the derived columns.
    pub fn new(
        name: String,
        contract_type: Option<String>,
        start_date: Option<NaiveDate>,
        total_revenue: f64,
        subscription_revenue: Option<f64>,
        fee_revenue: Option<f64>,
    ) -> Self {
        CustomerRecord {
            name,
            contract_type,
            start_year: start_date.map(|d| d.year()),
            start_date,
            total_revenue,
            subscription_revenue,
            fee_revenue,
            invoiced_revenue: fee_revenue.map(|fee| total_revenue - fee),
            subscription_kind: SubscriptionKind::from_revenue(subscription_revenue),
        }
    }
}

/// Monetary columns of a customer record that can rank or be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerMeasure {
    TotalRevenue,
    SubscriptionRevenue,
    FeeRevenue,
    InvoicedRevenue,
}

impl CustomerMeasure {
    pub fn of(self, record: &CustomerRecord) -> Option<f64> {
        match self {
            CustomerMeasure::TotalRevenue => Some(record.total_revenue),
            CustomerMeasure::SubscriptionRevenue => record.subscription_revenue,
            CustomerMeasure::FeeRevenue => record.fee_revenue,
            CustomerMeasure::InvoicedRevenue => record.invoiced_revenue,
        }
    }
}

// ---------------------------------------------------------------------------
// FeeRecord – one cleaned row of the organizer fee export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeRecord {
    pub organizer: String,
    pub period_start: NaiveDate,
    pub fee_amount: f64,
    pub year: i32,
}

impl FeeRecord {
    pub fn new(organizer: String, period_start: NaiveDate, fee_amount: f64) -> Self {
        FeeRecord {
            organizer,
            year: period_start.year(),
            period_start,
            fee_amount,
        }
    }
}

/// An organizer and its fee total across all years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizerTotal {
    pub organizer: String,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// ParseWarning – a cell that was coerced to null
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    Number,
    Date,
}

/// A non-empty cell that failed to parse and was treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseWarning {
    /// 0-based index of the data row (the row after the header is 0).
    pub row: usize,
    pub column: String,
    pub value: String,
    pub kind: WarningKind,
}

// ---------------------------------------------------------------------------
// Loaded tables
// ---------------------------------------------------------------------------

/// The cleaned customer export plus the names of the columns it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerTable {
    pub records: Vec<CustomerRecord>,
    pub revenue_column: String,
    pub subscription_column: String,
    pub fee_column: String,
    pub warnings: Vec<ParseWarning>,
}

impl CustomerTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The cleaned fee export with its top organizers precomputed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeTable {
    pub records: Vec<FeeRecord>,
    /// Highest fee totals first.
    pub top_organizers: Vec<OrganizerTotal>,
    /// Rows of `records` whose organizer is in `top_organizers`.
    pub top25: Vec<FeeRecord>,
    pub warnings: Vec<ParseWarning>,
}

impl FeeTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_top_organizer(&self, organizer: &str) -> bool {
        self.top_organizers.iter().any(|t| t.organizer == organizer)
    }
}
