//! Payment link codec
//!
//! A payment intent travels as the query string of a `<origin>/pay` link:
//!
//! ```text
//! https://pay.example/pay?recipient=<addr>&amount=<decimal>&label=<text>&message=<text>&total=<decimal>&splitCount=<int>&shareIndex=<int>
//! ```
//!
//! Only non-empty fields are written, always in the order above. Values are form encoded.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::address::Address;
use crate::error::Error;
use crate::intent::PaymentIntent;

/// Path the payment page is served from
pub const PAY_PATH: &str = "pay";

/// Query parameter names
pub mod param {
    /// Recipient address
    pub const RECIPIENT: &str = "recipient";
    /// Share amount
    pub const AMOUNT: &str = "amount";
    /// Label
    pub const LABEL: &str = "label";
    /// Message
    pub const MESSAGE: &str = "message";
    /// Split total
    pub const TOTAL: &str = "total";
    /// Split count
    pub const SPLIT_COUNT: &str = "splitCount";
    /// Share index
    pub const SHARE_INDEX: &str = "shareIndex";
}

/// Link decoding error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No recipient in the link
    #[error("Payment link is missing a recipient")]
    MissingRecipient,
    /// Recipient is not a ledger address
    #[error("Payment link recipient `{0}` is not a valid address")]
    InvalidRecipient(String),
    /// No amount in the link
    #[error("Payment link is missing an amount")]
    MissingAmount,
    /// Amount is not a positive decimal
    #[error("Payment link amount `{0}` is not a positive amount")]
    InvalidAmount(String),
    /// Split parameters are inconsistent
    #[error("Payment link split is invalid: {0}")]
    InvalidSplit(String),
}

/// Origin payment links are served from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkOrigin(Url);

impl LinkOrigin {
    /// Full link to the pay page
    fn pay_url(&self) -> Url {
        let mut url = self.0.clone();
        let path = match url.path().trim_end_matches('/') {
            "" => format!("/{PAY_PATH}"),
            base => format!("{base}/{PAY_PATH}"),
        };
        url.set_path(&path);
        url
    }
}

impl FromStr for LinkOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut url = Url::parse(s.trim())?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::InvalidOrigin(s.to_string()));
        }

        url.set_query(None);
        url.set_fragment(None);
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);

        Ok(Self(url))
    }
}

impl fmt::Display for LinkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str().trim_end_matches('/'))
    }
}

impl Serialize for LinkOrigin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LinkOrigin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LinkOrigin::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Encode an intent as a shareable link
pub fn encode(intent: &PaymentIntent, origin: &LinkOrigin) -> Result<Url, Error> {
    intent.validate()?;

    let mut url = origin.pay_url();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair(param::RECIPIENT, &intent.recipient.to_string());
        query.append_pair(param::AMOUNT, &intent.amount.to_string());
        if !intent.label.is_empty() {
            query.append_pair(param::LABEL, &intent.label);
        }
        if let Some(message) = &intent.message {
            query.append_pair(param::MESSAGE, message);
        }
        if let Some(total) = intent.total {
            query.append_pair(param::TOTAL, &total.to_string());
        }
        if let Some(split_count) = intent.split_count {
            query.append_pair(param::SPLIT_COUNT, &split_count.to_string());
        }
        if let Some(share_index) = intent.share_index {
            query.append_pair(param::SHARE_INDEX, &share_index.to_string());
        }
    }

    Ok(url)
}

/// Raw query values, first occurrence of each key wins
#[derive(Debug, Default)]
struct RawQuery {
    recipient: Option<String>,
    amount: Option<String>,
    label: Option<String>,
    message: Option<String>,
    total: Option<String>,
    split_count: Option<String>,
    share_index: Option<String>,
}

impl RawQuery {
    fn parse(query: &str) -> Self {
        let mut raw = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                param::RECIPIENT => &mut raw.recipient,
                param::AMOUNT => &mut raw.amount,
                param::LABEL => &mut raw.label,
                param::MESSAGE => &mut raw.message,
                param::TOTAL => &mut raw.total,
                param::SPLIT_COUNT => &mut raw.split_count,
                param::SHARE_INDEX => &mut raw.share_index,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        raw
    }
}

/// Pull the query string out of a full link, a relative link or a bare query
fn query_of(input: &str) -> String {
    let input = input.trim();

    if let Ok(url) = Url::parse(input) {
        return url.query().unwrap_or_default().to_string();
    }

    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None => input,
    };

    query.split('#').next().unwrap_or_default().to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_split_field<T: FromStr>(
    name: &str,
    value: Option<String>,
) -> Result<Option<T>, DecodeError> {
    non_empty(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| DecodeError::InvalidSplit(format!("{name} `{v}` is not valid")))
        })
        .transpose()
}

/// Decode a payment link or its query string into a validated intent
pub fn decode(input: &str) -> Result<PaymentIntent, DecodeError> {
    let raw = RawQuery::parse(&query_of(input));

    let recipient = non_empty(raw.recipient).ok_or(DecodeError::MissingRecipient)?;
    let recipient = Address::from_str(&recipient)
        .map_err(|_| DecodeError::InvalidRecipient(recipient.clone()))?;

    let amount = non_empty(raw.amount).ok_or(DecodeError::MissingAmount)?;
    let amount_value =
        Decimal::from_str(&amount).map_err(|_| DecodeError::InvalidAmount(amount.clone()))?;

    let intent = PaymentIntent {
        recipient,
        amount: amount_value,
        label: raw.label.unwrap_or_default(),
        message: non_empty(raw.message),
        total: parse_split_field::<Decimal>(param::TOTAL, raw.total)?,
        split_count: parse_split_field::<u32>(param::SPLIT_COUNT, raw.split_count)?,
        share_index: parse_split_field::<u32>(param::SHARE_INDEX, raw.share_index)?,
    };

    intent
        .validate_amount()
        .map_err(|_| DecodeError::InvalidAmount(amount))?;

    intent.validate_split().map_err(|err| match err {
        Error::InvalidSplit(reason) => DecodeError::InvalidSplit(reason),
        other => DecodeError::InvalidSplit(other.to_string()),
    })?;

    tracing::debug!(
        "Decoded payment link for {} amount {}",
        intent.recipient,
        intent.amount
    );

    Ok(intent)
}

impl FromStr for PaymentIntent {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}
