use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Resolution;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    pub credit_balance: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, credits: u64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            credit_balance: credits,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_afford(&self, cost: u64) -> bool {
        self.credit_balance >= cost
    }
}

/// What the controller hands to a history store; the store assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub account_id: String,
    pub prompt: String,
    pub image_reference: String,
    pub model_identifier: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub account_id: String,
    pub prompt: String,
    pub image_reference: String,
    pub model_identifier: String,
    pub resolution: Resolution,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn record(entry: NewHistoryEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: entry.account_id,
            prompt: entry.prompt,
            image_reference: entry.image_reference,
            model_identifier: entry.model_identifier,
            resolution: entry.resolution,
            timestamp: Utc::now(),
        }
    }
}
