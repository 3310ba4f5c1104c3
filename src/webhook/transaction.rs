//! Transaction records carried by charge events
//!
//! Decoded lazily from an envelope's `data`, and only for charge events.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::webhook::flexible::{deserialize_bool, deserialize_metadata};

/// Typed projection of a charge event's `data`
///
/// `amount` is in the currency's minor unit (kobo, pesewas, cents) exactly
/// as sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Paystack transaction ID
    #[serde(default)]
    pub id: i64,
    /// `test` or `live`
    pub domain: Option<String>,
    /// Raw status string; see [`TransactionRecord::status`]
    #[serde(rename = "status")]
    pub status_raw: Option<String>,
    /// Merchant transaction reference
    pub reference: Option<String>,
    /// Amount in minor units
    #[serde(default)]
    pub amount: i64,
    pub message: Option<String>,
    pub gateway_response: Option<String>,
    /// RFC 3339 timestamp of settlement
    pub paid_at: Option<String>,
    /// RFC 3339 timestamp of creation
    pub created_at: Option<String>,
    /// Payment channel (card, bank, ussd, ...)
    pub channel: Option<String>,
    /// ISO 4217 currency code
    pub currency: Option<String>,
    pub ip_address: Option<String>,
    /// Custom fields; double-encoded or blank values are tolerated
    #[serde(default, deserialize_with = "deserialize_metadata")]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub authorization: Option<Authorization>,
    #[serde(default)]
    pub customer: Option<Customer>,
}

impl TransactionRecord {
    /// Classified transaction status
    pub fn status(&self) -> TransactionStatus {
        self.status_raw
            .as_deref()
            .map(|s| TransactionStatus::from_str(s).unwrap_or_default())
            .unwrap_or_default()
    }

    /// `paid_at` parsed as a UTC timestamp
    pub fn paid_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.paid_at.as_deref())
    }

    /// `created_at` parsed as a UTC timestamp
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Transaction status; unrecognised strings classify as `Pending`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Failed,
    Abandoned,
    #[default]
    Pending,
}

impl FromStr for TransactionStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "abandoned" => Self::Abandoned,
            _ => Self::Pending,
        })
    }
}

impl TransactionStatus {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Pending => "pending",
        }
    }
}

/// Card/bank authorization used for the charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    /// Reusable authorization code (AUTH_...)
    pub authorization_code: Option<String>,
    pub bin: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<String>,
    pub exp_year: Option<String>,
    pub channel: Option<String>,
    pub card_type: Option<String>,
    pub bank: Option<String>,
    pub country_code: Option<String>,
    pub brand: Option<String>,
    /// Whether the authorization can be charged again; sent as bool, 0/1 or string
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub reusable: Option<bool>,
}

/// Customer that paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Customer code (CUS_...)
    pub customer_code: Option<String>,
    pub phone: Option<String>,
}

/// Merchant-supplied custom fields attached to a transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Look up a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Entries of the `custom_fields` array that checkout forms populate
    ///
    /// Entries that are not objects with a `variable_name` are skipped.
    pub fn custom_fields(&self) -> Vec<CustomField> {
        match self.0.get("custom_fields") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| CustomField::deserialize(item).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One entry of `metadata.custom_fields`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default)]
    pub display_name: Option<String>,
    pub variable_name: String,
    #[serde(default)]
    pub value: Value,
}
