//! Read-only analyses over a snapshot of records.
//!
//! Every analyzer takes `&[MessageRecord]`, never mutates it and returns fresh
//! values, so running one twice on the same input gives the same output.
//! Grouping always follows first-seen order and every sort is stable, which
//! keeps ties in encounter order.

pub mod clusters;
pub mod decay;
pub mod privacy;
pub mod senders;

use std::collections::HashMap;
use std::hash::Hash;

use crate::model::record::MessageRecord;

pub use clusters::{normalize_subject, ClusterEngine, SubjectCluster};
pub use decay::{DecayAnalyzer, DecayStatus, DecayThresholds, SenderDecayScore};
pub use privacy::{PrivacyRisk, PrivacyScanner, RiskCategory, RiskLevel};
pub use senders::{
    cleanup_candidates, sender_aggregates, summarize, CategoryCount, MailboxSummary, SenderAggregate,
};

/// Group records by `key`, keeping groups (and members) in first-seen order.
/// Records for which `key` returns `None` are left out.
pub(crate) fn group_in_order<'a, K, F>(
    records: &'a [MessageRecord],
    mut key: F,
) -> Vec<(K, Vec<&'a MessageRecord>)>
where
    K: Eq + Hash + Clone,
    F: FnMut(&'a MessageRecord) -> Option<K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a MessageRecord>)> = Vec::new();

    for record in records {
        let Some(k) = key(record) else { continue };
        match slots.get(&k) {
            Some(&i) => groups[i].1.push(record),
            None => {
                slots.insert(k.clone(), groups.len());
                groups.push((k, vec![record]));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_in_order_keeps_first_seen_order() {
        let records: Vec<MessageRecord> = ["b", "a", "b", "c", "a"]
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let mut r = MessageRecord::new(i.to_string());
                r.subject = k.to_string();
                r
            })
            .collect();
        let groups = group_in_order(&records, |r| {
            (r.subject != "c").then(|| r.subject.clone())
        });
        let keys: Vec<_> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(
            groups[0].1.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["0", "2"]
        );
    }
}
