//! Sender decay scoring: which senders keep mailing while their mail goes unread.

use std::fmt;

use chrono::{DateTime, Local};

use super::group_in_order;
use crate::model::record::MessageRecord;

/// Engagement verdict for one sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecayStatus {
    Active,
    /// Mail is rarely opened.
    Cold,
    /// Nothing received for a long time.
    Ghost,
    /// High volume that is almost never opened.
    Spammer,
}

impl DecayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Cold => "COLD",
            Self::Ghost => "GHOST",
            Self::Spammer => "SPAMMER",
        }
    }
}

impl fmt::Display for DecayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-sender engagement metrics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SenderDecayScore {
    pub address: String,
    /// First record's display name, or the address when it has none.
    pub display_name: String,
    pub total: usize,
    pub unread: usize,
    /// Fraction of read messages, in `[0, 1]`.
    pub open_rate: f64,
    pub last_received: DateTime<Local>,
    pub wasted_bytes: u64,
    pub status: DecayStatus,
}

/// Cut-off values for the status rules.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecayThresholds {
    /// Senders with fewer messages are not scored.
    pub min_messages: usize,
    pub spammer_open_rate: f64,
    /// A spammer needs strictly more messages than this.
    pub spammer_min_total: usize,
    /// A ghost's last message is strictly older than this many days.
    pub ghost_days: i64,
    pub cold_open_rate: f64,
}

impl Default for DecayThresholds {
    fn default() -> Self {
        Self {
            min_messages: 3,
            spammer_open_rate: 0.10,
            spammer_min_total: 10,
            ghost_days: 90,
            cold_open_rate: 0.30,
        }
    }
}

impl DecayThresholds {
    /// First matching rule wins: spammer, ghost, cold, else active.
    pub fn status(&self, open_rate: f64, days_since_last: i64, total: usize) -> DecayStatus {
        if open_rate < self.spammer_open_rate && total > self.spammer_min_total {
            DecayStatus::Spammer
        } else if days_since_last > self.ghost_days {
            DecayStatus::Ghost
        } else if open_rate < self.cold_open_rate {
            DecayStatus::Cold
        } else {
            DecayStatus::Active
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecayAnalyzer {
    thresholds: DecayThresholds,
}

impl DecayAnalyzer {
    pub fn new(thresholds: DecayThresholds) -> Self {
        Self { thresholds }
    }

    /// Score senders against the current time.
    pub fn analyze(&self, records: &[MessageRecord]) -> Vec<SenderDecayScore> {
        self.analyze_at(records, Local::now())
    }

    /// Score senders as of `now`.
    ///
    /// Only non-active senders are returned, largest `wasted_bytes` first.
    pub fn analyze_at(&self, records: &[MessageRecord], now: DateTime<Local>) -> Vec<SenderDecayScore> {
        let mut scores: Vec<SenderDecayScore> =
            group_in_order(records, |r| Some(r.from.address.clone()))
                .into_iter()
                .filter(|(_, group)| group.len() >= self.thresholds.min_messages)
                .filter_map(|(address, group)| self.score(address, &group, now))
                .collect();

        scores.sort_by(|a, b| b.wasted_bytes.cmp(&a.wasted_bytes));
        scores
    }

    fn score(
        &self,
        address: String,
        group: &[&MessageRecord],
        now: DateTime<Local>,
    ) -> Option<SenderDecayScore> {
        let total = group.len();
        let unread = group.iter().filter(|r| !r.is_read).count();
        let open_rate = (total - unread) as f64 / total as f64;
        let last_received = group.iter().filter_map(|r| r.date).max().unwrap_or(now);
        let days_since_last = (now - last_received).num_days();
        let wasted_bytes = group.iter().map(|r| r.size_bytes).sum();

        let status = self.thresholds.status(open_rate, days_since_last, total);
        if status == DecayStatus::Active {
            return None;
        }

        let display_name = group
            .first()
            .and_then(|r| r.from.display_name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| address.clone());

        Some(SenderDecayScore {
            address,
            display_name,
            total,
            unread,
            open_rate,
            last_received,
            wasted_bytes,
            status,
        })
    }
}
