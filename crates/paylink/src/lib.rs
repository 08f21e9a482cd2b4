//! Paylink shared types and functions.
//!
//! This crate is the base foundation for building and resolving payment request links. It holds
//! the payment intent model, the link codec, the split allocator and the ledger address types used
//! by the settlement engine in `paylink-wallet`.
//!
//! Everything in here is pure and synchronous.

pub mod address;
pub mod amount;
pub mod codec;
pub mod error;
pub mod intent;
pub mod preview;
pub mod split;
pub mod util;

// re-exporting external crates
pub use {rust_decimal, url};

pub use self::address::{Address, Asset, HoldingAccount};
pub use self::amount::Amount;
pub use self::codec::{DecodeError, LinkOrigin};
pub use self::error::Error;
pub use self::intent::{PaymentIntent, PaymentIntentBuilder};
pub use self::preview::PreviewMetadata;
pub use self::split::{SplitMode, SplitPlan};
