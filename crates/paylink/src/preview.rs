//! Link preview metadata
//!
//! Title and description shown when a payment link is unfurled by a chat client or social
//! network. Derived only from the intent fields, so the same link always previews the same way.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::intent::PaymentIntent;

const FALLBACK_TITLE: &str = "Payment request";
const FALLBACK_DESCRIPTION: &str = "Open the link to view and pay this request";

/// Preview metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewMetadata {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
}

impl PreviewMetadata {
    /// Preview for a decoded intent
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        let label = intent.label.trim();

        match (intent.total, intent.split_count) {
            (Some(total), Some(split_count)) => {
                let subject = if label.is_empty() { "a bill" } else { label };
                Self {
                    title: format!("Your share: {:.2}", intent.amount),
                    description: format!(
                        "Split {subject} {split_count} ways, {:.2} in total",
                        total
                    ),
                }
            }
            _ => Self {
                title: format!("{FALLBACK_TITLE}: {:.2}", intent.amount),
                description: match (label.is_empty(), intent.message.as_deref()) {
                    (false, Some(message)) => format!("{label}: {message}"),
                    (false, None) => label.to_string(),
                    (true, Some(message)) => message.to_string(),
                    (true, None) => FALLBACK_DESCRIPTION.to_string(),
                },
            },
        }
    }

    /// Preview for a raw link, falling back to a generic preview when it does not decode
    pub fn from_query(query: &str) -> Self {
        match codec::decode(query) {
            Ok(intent) => Self::from_intent(&intent),
            Err(err) => {
                tracing::debug!("Previewing undecodable link: {}", err);
                Self::default()
            }
        }
    }
}

impl Default for PreviewMetadata {
    fn default() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            description: FALLBACK_DESCRIPTION.to_string(),
        }
    }
}
