use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Workflow status of an invoice, decoded from the upstream integer code.
///
/// The set is closed: any code outside `1..=6` is `Unknown`, so a raw code
/// never reaches the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Unpaid,
    Overdue,
    Cancel,
    Unknown,
}

impl InvoiceStatus {
    /// The labels offered as status filter options, in code order.
    pub const KNOWN: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Unpaid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancel,
    ];

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => InvoiceStatus::Draft,
            2 => InvoiceStatus::Sent,
            3 => InvoiceStatus::Paid,
            4 => InvoiceStatus::Unpaid,
            5 => InvoiceStatus::Overdue,
            6 => InvoiceStatus::Cancel,
            _ => InvoiceStatus::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Sent => "Sent",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Unpaid => "Unpaid",
            InvoiceStatus::Overdue => "Overdue",
            InvoiceStatus::Cancel => "Cancel",
            InvoiceStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display label for a raw status code.
pub fn status_label(code: i64) -> &'static str {
    InvoiceStatus::from_code(code).label()
}

/// One record of the invoice API's `merged_data` array.
///
/// Every field is coerced on the way in so later stages can treat them as
/// plain text: numbers are rendered in decimal, and null, missing or nested
/// values become empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Invoice {
    #[serde(default, deserialize_with = "lenient_text")]
    pub prefix: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub number: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub total: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_code")]
    pub status: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub customer_phone: String,
}

impl Invoice {
    /// `prefix` followed by `number`, the identity shown to users.
    pub fn invoice_number(&self) -> String {
        format!("{}{}", self.prefix, self.number)
    }

    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_code(self.status)
    }

    /// Calendar date of the invoice.
    ///
    /// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps; anything else is
    /// `None`.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        let raw = self.date.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }

    /// `YYYY-MM` of a parseable date.
    pub fn month(&self) -> Option<String> {
        self.parsed_date().map(|date| date.format("%Y-%m").to_string())
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

fn lenient_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    // 0 is outside the status table and therefore renders as Unknown
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
