//! Payment Intent
//!
//! Declarative record of a requested payment: who gets paid, how much, and why. A split intent
//! represents one share of a larger total divided among several participants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::address::Address;
use crate::amount::{cents_from_decimal, is_whole_cents};
use crate::codec::{self, LinkOrigin};
use crate::error::Error;
use crate::{ensure_paylink, split};

/// Payment Intent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Owner of the funds being requested
    pub recipient: Address,
    /// Decimal amount of one share
    pub amount: Decimal,
    /// Short description
    pub label: String,
    /// Optional note, never `Some("")`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Total being split, only present on split intents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    /// Number of shares including the requester
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_count: Option<u32>,
    /// Zero based share this intent represents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_index: Option<u32>,
}

impl PaymentIntent {
    /// Create a new [`PaymentIntentBuilder`]
    pub fn builder() -> PaymentIntentBuilder {
        PaymentIntentBuilder::default()
    }

    /// Both `total` and `split_count` are set
    pub fn is_split(&self) -> bool {
        self.total.is_some() && self.split_count.is_some()
    }

    /// Encode as a shareable link under `origin`
    pub fn to_link(&self, origin: &LinkOrigin) -> Result<Url, Error> {
        codec::encode(self, origin)
    }

    /// Check the amount, message and split invariants
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_amount()?;
        ensure_paylink!(self.message.as_deref() != Some(""), Error::EmptyMessage);
        self.validate_split()
    }

    /// Amount is positive and `amount * 10^scale` fits in base units
    pub(crate) fn validate_amount(&self) -> Result<(), Error> {
        ensure_paylink!(self.amount > Decimal::ZERO, Error::NonPositiveAmount);
        ensure_paylink!(
            u64::try_from(self.amount.mantissa()).is_ok(),
            Error::Amount(crate::amount::Error::AmountOverflow)
        );
        Ok(())
    }

    /// Split fields are consistent with the amount
    pub(crate) fn validate_split(&self) -> Result<(), Error> {
        let (total, split_count) = match (self.total, self.split_count) {
            (None, None) => {
                ensure_paylink!(
                    self.share_index.is_none(),
                    Error::InvalidSplit("share index without split count".to_string())
                );
                return Ok(());
            }
            (Some(total), Some(split_count)) => (total, split_count),
            _ => {
                return Err(Error::InvalidSplit(
                    "total and split count must be given together".to_string(),
                ))
            }
        };

        ensure_paylink!(
            split_count >= 2,
            Error::InvalidSplit(format!("split count {split_count} is below 2"))
        );
        ensure_paylink!(
            split_count <= split::MAX_SPLIT_COUNT,
            Error::InvalidSplit(format!(
                "split count {split_count} exceeds {}",
                split::MAX_SPLIT_COUNT
            ))
        );
        ensure_paylink!(
            is_whole_cents(self.amount),
            Error::InvalidSplit(format!("amount {} is not whole cents", self.amount))
        );

        let total_cents = cents_from_decimal(total)?;
        let amount_cents = cents_from_decimal(self.amount)?;
        let (base, remainder) = split::base_and_remainder(total_cents, split_count)?;

        match self.share_index {
            Some(index) => {
                let expected = split::share_of(total_cents, split_count, index)?.ok_or_else(|| {
                    Error::InvalidSplit(format!(
                        "share index {index} out of range for {split_count} shares"
                    ))
                })?;
                ensure_paylink!(
                    expected == amount_cents,
                    Error::InvalidSplit(format!(
                        "amount {} does not match share {index} of {total}",
                        self.amount
                    ))
                );
            }
            None => {
                let is_share = amount_cents == base || (remainder > 0 && amount_cents == base + 1);
                ensure_paylink!(
                    is_share,
                    Error::InvalidSplit(format!(
                        "amount {} is not a share of {total} split {split_count} ways",
                        self.amount
                    ))
                );
            }
        }

        Ok(())
    }
}

/// Builder for [`PaymentIntent`]
#[derive(Debug, Default, Clone)]
pub struct PaymentIntentBuilder {
    recipient: Option<Address>,
    amount: Option<Decimal>,
    label: Option<String>,
    message: Option<String>,
    total: Option<Decimal>,
    split_count: Option<u32>,
    share_index: Option<u32>,
}

impl PaymentIntentBuilder {
    /// Set recipient
    pub fn recipient(mut self, recipient: Address) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Set amount
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set label
    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set message, empty messages are dropped
    pub fn message<S: Into<String>>(mut self, message: S) -> Self {
        let message = message.into();
        self.message = (!message.is_empty()).then_some(message);
        self
    }

    /// Mark as one share of `total` split `split_count` ways
    pub fn split(mut self, total: Decimal, split_count: u32) -> Self {
        self.total = Some(total);
        self.split_count = Some(split_count);
        self
    }

    /// Set share index
    pub fn share_index(mut self, share_index: u32) -> Self {
        self.share_index = Some(share_index);
        self
    }

    /// Build and validate the [`PaymentIntent`]
    pub fn build(self) -> Result<PaymentIntent, Error> {
        let label = self.label.unwrap_or_default();
        ensure_paylink!(!label.trim().is_empty(), Error::MissingLabel);

        let intent = PaymentIntent {
            recipient: self.recipient.ok_or(Error::MissingRecipient)?,
            amount: self.amount.ok_or(Error::MissingAmount)?,
            label,
            message: self.message,
            total: self.total,
            split_count: self.split_count,
            share_index: self.share_index,
        };

        intent.validate()?;

        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn builder() -> PaymentIntentBuilder {
        PaymentIntent::builder()
            .recipient(Address::from_str(RECIPIENT).unwrap())
            .label("Dinner")
    }

    #[test]
    fn test_simple_intent() {
        let intent = builder().amount(dec("12.50")).build().unwrap();
        assert!(!intent.is_split());
        assert_eq!(intent.message, None);
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            PaymentIntent::builder()
                .amount(dec("1"))
                .label("x")
                .build()
                .unwrap_err(),
            Error::MissingRecipient
        );
        assert_eq!(builder().build().unwrap_err(), Error::MissingAmount);
        assert_eq!(
            PaymentIntent::builder()
                .recipient(Address::from_str(RECIPIENT).unwrap())
                .amount(dec("1"))
                .build()
                .unwrap_err(),
            Error::MissingLabel
        );
    }

    #[test]
    fn test_non_positive_amount() {
        assert_eq!(
            builder().amount(dec("0")).build().unwrap_err(),
            Error::NonPositiveAmount
        );
        assert_eq!(
            builder().amount(dec("-5")).build().unwrap_err(),
            Error::NonPositiveAmount
        );
    }

    #[test]
    fn test_empty_message_dropped() {
        let intent = builder().amount(dec("1")).message("").build().unwrap();
        assert_eq!(intent.message, None);
    }

    #[test]
    fn test_empty_message_rejected_on_validate() {
        let mut intent = builder().amount(dec("1")).build().unwrap();
        intent.message = Some(String::new());
        assert_eq!(intent.validate(), Err(Error::EmptyMessage));
    }

    #[test]
    fn test_split_share_must_match_total() {
        // 10.00 / 3 = [3.34, 3.33, 3.33]
        assert!(builder().amount(dec("3.33")).split(dec("10"), 3).build().is_ok());
        assert!(builder().amount(dec("3.34")).split(dec("10"), 3).build().is_ok());
        assert!(matches!(
            builder().amount(dec("3.35")).split(dec("10"), 3).build(),
            Err(Error::InvalidSplit(_))
        ));
        assert!(matches!(
            builder().amount(dec("3.333")).split(dec("10"), 3).build(),
            Err(Error::InvalidSplit(_))
        ));
    }

    #[test]
    fn test_split_share_index() {
        assert!(builder()
            .amount(dec("3.34"))
            .split(dec("10"), 3)
            .share_index(0)
            .build()
            .is_ok());
        assert!(matches!(
            builder()
                .amount(dec("3.34"))
                .split(dec("10"), 3)
                .share_index(1)
                .build(),
            Err(Error::InvalidSplit(_))
        ));
        assert!(matches!(
            builder()
                .amount(dec("3.33"))
                .split(dec("10"), 3)
                .share_index(3)
                .build(),
            Err(Error::InvalidSplit(_))
        ));
    }

    #[test]
    fn test_split_count_below_two() {
        assert!(matches!(
            builder().amount(dec("10")).split(dec("10"), 1).build(),
            Err(Error::InvalidSplit(_))
        ));
    }

    #[test]
    fn test_split_count_above_cap() {
        let err = builder()
            .amount(dec("0.01"))
            .split(dec("10"), u32::MAX)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSplit(_)));

        let err = builder()
            .amount(dec("0.01"))
            .split(dec("10"), split::MAX_SPLIT_COUNT + 1)
            .share_index(split::MAX_SPLIT_COUNT)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSplit(_)));
    }

    #[test]
    fn test_half_split_fields() {
        let mut intent = builder().amount(dec("5")).build().unwrap();
        intent.total = Some(dec("10"));
        assert!(matches!(intent.validate(), Err(Error::InvalidSplit(_))));

        intent.total = None;
        intent.share_index = Some(0);
        assert!(matches!(intent.validate(), Err(Error::InvalidSplit(_))));
    }
}
