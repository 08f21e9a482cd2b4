//! Split allocation
//!
//! Partitions a requested total into integer cent shares. The sum of the shares always equals the
//! total in cents and no two shares differ by more than one cent. The first `remainder` shares
//! carry the extra cent.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::amount::{self, cents_from_decimal, decimal_from_cents};
use crate::ensure_paylink;
use crate::intent::PaymentIntent;

/// Most participants a total can be split among
pub const MAX_SPLIT_COUNT: u32 = 1_000;

/// Split Error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Cannot split among zero participants
    #[error("Split count must be at least 1")]
    ZeroParticipants,
    /// Split count above [`MAX_SPLIT_COUNT`]
    #[error("Split count {0} exceeds {MAX_SPLIT_COUNT}")]
    TooManyParticipants(u32),
    /// Total cannot be negative
    #[error("Total cannot be negative")]
    NegativeTotal,
    /// Amount overflow
    #[error("Amount Overflow")]
    AmountOverflow,
    /// Unknown split mode
    #[error("Unknown split mode: `{0}`")]
    UnknownMode(String),
}

impl From<amount::Error> for Error {
    fn from(err: amount::Error) -> Self {
        match err {
            amount::Error::NegativeAmount => Error::NegativeTotal,
            _ => Error::AmountOverflow,
        }
    }
}

fn check_split_count(split_count: u32) -> Result<(), Error> {
    ensure_paylink!(split_count >= 1, Error::ZeroParticipants);
    ensure_paylink!(
        split_count <= MAX_SPLIT_COUNT,
        Error::TooManyParticipants(split_count)
    );
    Ok(())
}

/// Base share and remainder of `total_cents` split `split_count` ways
pub fn base_and_remainder(total_cents: u64, split_count: u32) -> Result<(u64, u64), Error> {
    check_split_count(split_count)?;
    let count = u64::from(split_count);
    Ok((total_cents / count, total_cents % count))
}

/// Cents owed for share `index`, `None` when the index is out of range
pub fn share_of(total_cents: u64, split_count: u32, index: u32) -> Result<Option<u64>, Error> {
    let (base, remainder) = base_and_remainder(total_cents, split_count)?;
    if index >= split_count {
        return Ok(None);
    }
    Ok(Some(base + u64::from(u64::from(index) < remainder)))
}

/// Allocate `total` among `split_count` participants in integer cents.
///
/// `total` is rounded to the nearest cent first.
pub fn allocate(total: Decimal, split_count: u32) -> Result<Vec<u64>, Error> {
    let total_cents = cents_from_decimal(total)?;
    let (base, remainder) = base_and_remainder(total_cents, split_count)?;

    Ok((0..u64::from(split_count))
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect())
}

/// How split links are handed out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// One link with the base share for everybody.
    ///
    /// Collection falls short of the total by `remainder` cents.
    #[default]
    SharedLink,
    /// A distinct link per participant, remainder cents included
    PerParticipantLinks,
}

impl SplitMode {
    /// Select the mode from a `per_participant_links` flag
    pub fn from_per_participant_links(per_participant_links: bool) -> Self {
        if per_participant_links {
            Self::PerParticipantLinks
        } else {
            Self::SharedLink
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::SharedLink => write!(f, "shared_link"),
            SplitMode::PerParticipantLinks => write!(f, "per_participant_links"),
        }
    }
}

impl FromStr for SplitMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared_link" | "shared" => Ok(Self::SharedLink),
            "per_participant_links" | "per_participant" => Ok(Self::PerParticipantLinks),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

/// Allocation of a total among participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    total: Decimal,
    total_cents: u64,
    shares: Vec<u64>,
    mode: SplitMode,
}

impl SplitPlan {
    /// Share index kept by the requester
    pub const REQUESTER_SHARE_INDEX: usize = 0;

    /// Create new [`SplitPlan`]
    pub fn new(total: Decimal, split_count: u32, mode: SplitMode) -> Result<Self, Error> {
        let shares = allocate(total, split_count)?;
        let total_cents = cents_from_decimal(total)?;

        Ok(Self {
            total,
            total_cents,
            shares,
            mode,
        })
    }

    /// Requested total
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Requested total in cents
    pub fn total_cents(&self) -> u64 {
        self.total_cents
    }

    /// Split mode
    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    /// Number of participants, requester included
    pub fn split_count(&self) -> u32 {
        self.shares.len() as u32
    }

    /// Exact allocation, summing to the total
    pub fn shares(&self) -> &[u64] {
        &self.shares
    }

    /// Smallest share
    pub fn base_share(&self) -> u64 {
        self.total_cents / self.shares.len() as u64
    }

    /// Cents that do not divide evenly
    pub fn remainder(&self) -> u64 {
        self.total_cents % self.shares.len() as u64
    }

    /// Share index kept by the requester
    pub fn requester_share_index(&self) -> usize {
        Self::REQUESTER_SHARE_INDEX
    }

    /// Amount each participant is asked for under the plan's mode
    pub fn participant_amounts(&self) -> Vec<u64> {
        match self.mode {
            SplitMode::SharedLink => vec![self.base_share(); self.shares.len()],
            SplitMode::PerParticipantLinks => self.shares.clone(),
        }
    }

    /// Sum of what the participants are asked for
    pub fn collected_total(&self) -> u64 {
        self.participant_amounts().iter().sum()
    }

    /// Cents the requester will not collect
    pub fn shortfall(&self) -> u64 {
        self.total_cents - self.collected_total()
    }

    /// Payment intents to hand out to the payers.
    ///
    /// Shared mode produces a single intent for the base share. Per-participant mode produces one
    /// intent per payer share, skipping the requester's share.
    pub fn intents(
        &self,
        recipient: Address,
        label: &str,
        message: Option<&str>,
    ) -> Result<Vec<PaymentIntent>, crate::Error> {
        let split_count = self.split_count();

        let intent = |cents: u64, share_index: Option<u32>| {
            let mut builder = PaymentIntent::builder()
                .recipient(recipient)
                .amount(decimal_from_cents(cents))
                .label(label)
                .split(self.total, split_count);
            if let Some(message) = message {
                builder = builder.message(message);
            }
            if let Some(index) = share_index {
                builder = builder.share_index(index);
            }
            builder.build()
        };

        match self.mode {
            SplitMode::SharedLink => {
                if self.shortfall() > 0 {
                    tracing::warn!(
                        "Shared split link collects {} of {} cents, short by {}",
                        self.collected_total(),
                        self.total_cents,
                        self.shortfall()
                    );
                }
                Ok(vec![intent(self.base_share(), None)?])
            }
            SplitMode::PerParticipantLinks => self
                .shares
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != Self::REQUESTER_SHARE_INDEX)
                .map(|(index, cents)| intent(*cents, Some(index as u32)))
                .collect(),
        }
    }
}
