//! Payment types and data structures
//!
//! Inbound STK push requests, the Daraja payload they are turned into, and the
//! OAuth token response.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Token lifetime assumed when Daraja omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3599;

/// STK push request as received over HTTP
///
/// Every field is optional at this stage so that a missing field surfaces as a
/// validation failure rather than a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Amount to charge, in whole shillings
    pub amount: Option<Number>,
    /// Customer MSISDN, e.g. 2547XXXXXXXX
    pub phone_number: Option<String>,
    /// Reference shown to the customer on the prompt
    pub account_reference: Option<String>,
    /// Free-text description of the transaction
    pub transaction_desc: Option<String>,
}

impl PaymentRequest {
    /// Returns the request with every required field present, or `None`.
    ///
    /// A zero or negative amount and a blank string count as missing. Formats
    /// are not checked here; Daraja is the authority on phone number layout.
    pub fn validate(self) -> Option<StkPushRequest> {
        let amount = self.amount.filter(|a| a.as_f64().is_some_and(|v| v > 0.0))?;

        Some(StkPushRequest {
            amount,
            phone_number: present(self.phone_number)?,
            account_reference: present(self.account_reference)?,
            transaction_desc: present(self.transaction_desc)?,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A validated STK push request
#[derive(Debug, Clone, PartialEq)]
pub struct StkPushRequest {
    pub amount: Number,
    pub phone_number: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

/// Daraja `TransactionType` values accepted by the STK push endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Paybill numbers
    #[default]
    CustomerPayBillOnline,
    /// Till (buy goods) numbers
    CustomerBuyGoodsOnline,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerPayBillOnline => "CustomerPayBillOnline",
            Self::CustomerBuyGoodsOnline => "CustomerBuyGoodsOnline",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CustomerPayBillOnline" => Ok(Self::CustomerPayBillOnline),
            "CustomerBuyGoodsOnline" => Ok(Self::CustomerBuyGoodsOnline),
            other => Err(format!(
                "transaction type must be CustomerPayBillOnline or CustomerBuyGoodsOnline, got {}",
                other
            )),
        }
    }
}

/// Body of `POST /mpesa/stkpush/v1/processrequest`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: TransactionType,
    pub amount: Number,
    /// Paying MSISDN
    #[serde(rename = "PartyA")]
    pub party_a: String,
    /// Receiving shortcode
    #[serde(rename = "PartyB")]
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

/// Response of `GET /oauth/v1/generate`
///
/// Only `access_token` is required. `expires_in` is kept as raw JSON so that an
/// unexpected shape never rejects an otherwise usable token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    expires_in: Option<Value>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>, expires_in_secs: u64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in: Some(Value::from(expires_in_secs)),
        }
    }

    /// How long the provider says the token is valid for.
    ///
    /// Daraja sends `expires_in` as a string ("3599"); plain and fractional
    /// numbers are accepted too. Anything else falls back to
    /// [`DEFAULT_TOKEN_LIFETIME_SECS`].
    pub fn lifetime(&self) -> Duration {
        let secs = match &self.expires_in {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        };
        Duration::from_secs(secs.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS))
    }
}
