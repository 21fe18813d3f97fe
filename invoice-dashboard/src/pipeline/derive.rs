//! Pure derivations over a loaded invoice collection.
//!
//! Nothing here mutates the collection or fails: every call recomputes from
//! the canonical slice, so the same input and criteria always yield the
//! same ordered output.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{status_label, Invoice};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Newest => "Newest First",
            SortOrder::Oldest => "Oldest First",
        }
    }

    /// Unrecognised values fall back to the default order.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "oldest" => SortOrder::Oldest,
            _ => SortOrder::Newest,
        }
    }
}

/// Raw filter/sort query parameters, as sent by the filter bar.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct CriteriaParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// Filter and sort criteria. `None` means "no filter".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Criteria {
    /// `YYYY-MM` prefix the invoice date must start with.
    pub month: Option<String>,
    /// Status label the invoice must map to.
    pub status: Option<String>,
    pub order: SortOrder,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<CriteriaParams> for Criteria {
    fn from(params: CriteriaParams) -> Self {
        Self {
            month: non_empty(params.month),
            status: non_empty(params.status),
            order: params
                .order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
        }
    }
}

impl Criteria {
    pub fn to_params(&self) -> CriteriaParams {
        CriteriaParams {
            month: self.month.clone(),
            status: self.status.clone(),
            order: Some(self.order.as_str().to_string()),
        }
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        let matches_month = self
            .month
            .as_deref()
            .map_or(true, |month| {
                // The normalized month is what the facets offer, so a padded
                // or unpadded date still matches its own option
                invoice.date.starts_with(month)
                    || invoice
                        .month()
                        .is_some_and(|parsed| parsed.starts_with(month))
            });
        let matches_status = self
            .status
            .as_deref()
            .map_or(true, |status| status_label(invoice.status) == status);

        matches_month && matches_status
    }
}

/// Distinct `YYYY-MM` months of the collection, most recent first.
///
/// Invoices without a parseable date contribute no facet.
pub fn month_facets(invoices: &[Invoice]) -> Vec<String> {
    let months: BTreeSet<(i32, u32)> = invoices
        .iter()
        .filter_map(Invoice::parsed_date)
        .map(|date| (date.year(), date.month()))
        .collect();

    months
        .into_iter()
        .rev()
        .map(|(year, month)| format!("{:04}-{:02}", year, month))
        .collect()
}

pub fn filter<'a>(invoices: &'a [Invoice], criteria: &Criteria) -> Vec<&'a Invoice> {
    invoices
        .iter()
        .filter(|invoice| criteria.matches(invoice))
        .collect()
}

fn compare_dates(a: Option<NaiveDate>, b: Option<NaiveDate>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Newest => b.cmp(&a),
            SortOrder::Oldest => a.cmp(&b),
        },
        // Undated invoices trail in either order
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort by date. Stable: invoices sharing a date keep their fetch order.
pub fn sort(invoices: &mut [&Invoice], order: SortOrder) {
    invoices.sort_by(|a, b| compare_dates(a.parsed_date(), b.parsed_date(), order));
}

/// One invoice as the table and cards render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRow {
    pub invoice_number: String,
    pub date: String,
    pub amount: String,
    pub status: &'static str,
    pub customer_name: String,
    pub customer_phone: String,
    pub whatsapp_link: Option<String>,
}

impl From<&Invoice> for InvoiceRow {
    fn from(invoice: &Invoice) -> Self {
        Self {
            invoice_number: invoice.invoice_number(),
            date: invoice.date.clone(),
            amount: format!("{} {}", invoice.total, invoice.symbol)
                .trim()
                .to_string(),
            status: status_label(invoice.status),
            customer_name: invoice.customer_name.clone(),
            customer_phone: invoice.customer_phone.clone(),
            whatsapp_link: whatsapp_link(&invoice.customer_phone),
        }
    }
}

/// `https://wa.me/<digits>` for a phone number, keeping only ASCII digits.
pub fn whatsapp_link(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        Some(format!("https://wa.me/{}", digits))
    }
}

/// Everything the dashboard renders for a ready collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub months: Vec<String>,
    pub rows: Vec<InvoiceRow>,
}

pub fn derive_listing(invoices: &[Invoice], criteria: &Criteria) -> Listing {
    let mut selected = filter(invoices, criteria);
    sort(&mut selected, criteria.order);

    Listing {
        months: month_facets(invoices),
        rows: selected.into_iter().map(InvoiceRow::from).collect(),
    }
}
