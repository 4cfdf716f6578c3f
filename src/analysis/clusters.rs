//! Subject clustering: groups messages whose subjects differ only in reply
//! prefixes, numbers or spacing ("Order #123 Confirmed", "Fwd: Order #456 Confirmed").

use once_cell::sync::Lazy;
use regex::Regex;

use super::group_in_order;
use crate::model::record::MessageRecord;

static REPLY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(re|fwd|fw):\s*").unwrap());
static NUMBERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"#?[0-9]+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Default minimum number of members for a cluster to be reported.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 3;

/// Reduce a subject to its clustering key.
///
/// One leading `re:`/`fwd:`/`fw:` is removed, every digit run (with an
/// optional `#` in front, as in `#123`) becomes `#`, whitespace runs collapse
/// to one space and the result is trimmed.
pub fn normalize_subject(subject: &str) -> String {
    let s = REPLY_PREFIX.replace(subject, "");
    let s = NUMBERS.replace_all(&s, "#");
    let s = WHITESPACE.replace_all(&s, " ");
    s.trim().to_string()
}

/// Messages sharing one normalized subject.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubjectCluster<'a> {
    pub key: String,
    pub count: usize,
    pub total_bytes: u64,
    pub members: Vec<&'a MessageRecord>,
}

#[derive(Debug, Clone)]
pub struct ClusterEngine {
    min_size: usize,
}

impl Default for ClusterEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CLUSTER_SIZE)
    }
}

impl ClusterEngine {
    pub fn new(min_size: usize) -> Self {
        Self { min_size }
    }

    /// Clusters with at least `min_size` members, largest `total_bytes` first.
    /// Blank subjects never cluster.
    pub fn cluster<'a>(&self, records: &'a [MessageRecord]) -> Vec<SubjectCluster<'a>> {
        let mut clusters: Vec<SubjectCluster<'a>> = group_in_order(records, |r| {
            (!r.subject.trim().is_empty()).then(|| normalize_subject(&r.subject))
        })
        .into_iter()
        .filter(|(_, members)| members.len() >= self.min_size)
        .map(|(key, members)| SubjectCluster {
            key,
            count: members.len(),
            total_bytes: members.iter().map(|r| r.size_bytes).sum(),
            members,
        })
        .collect();

        clusters.sort_by(|a, b| b.total_bytes.cmp(&a.total_bytes));
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, subject: &str, size: u64) -> MessageRecord {
        let mut r = MessageRecord::new(id);
        r.subject = subject.into();
        r.size_bytes = size;
        r
    }

    #[test]
    fn test_normalize_subject() {
        assert_eq!(normalize_subject("Re: Order #123 Confirmed"), "Order # Confirmed");
        assert_eq!(normalize_subject("FWD:Order  #456\tConfirmed "), "Order # Confirmed");
        assert_eq!(normalize_subject("Re: Re: Hi"), "Re: Hi");
        assert_eq!(normalize_subject("Invoice 2024-05-01"), "Invoice #-#-#");
        assert_eq!(normalize_subject("Ticket 42 / #7"), "Ticket # / #");
        assert_eq!(normalize_subject("Are: you there"), "Are: you there");
    }

    #[test]
    fn test_order_confirmations_cluster() {
        let records = vec![
            rec("1", "Re: Order #123 Confirmed", 100),
            rec("2", "Order #456 Confirmed", 200),
            rec("3", "Fwd: Order #789 Confirmed", 300),
            rec("4", "Weekly report 1", 10),
            rec("5", "Weekly report 2", 10),
        ];
        let clusters = ClusterEngine::default().cluster(&records);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].key, "Order # Confirmed");
        assert_eq!(clusters[0].count, 3);
        assert_eq!(clusters[0].total_bytes, 600);
        let ids: Vec<_> = clusters[0].members.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn test_blank_subjects_skipped_and_sorted_by_size() {
        let mut records: Vec<_> = (0..3).map(|i| rec(&format!("s{i}"), "  ", 1_000)).collect();
        records.extend((0..3).map(|i| rec(&format!("a{i}"), &format!("Alert {i}"), 1)));
        records.extend((0..3).map(|i| rec(&format!("b{i}"), &format!("Bill {i}"), 5)));
        let clusters = ClusterEngine::default().cluster(&records);
        let keys: Vec<_> = clusters.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["Bill #", "Alert #"]);
    }

    #[test]
    fn test_custom_min_size() {
        let records = vec![rec("1", "Ping 1", 1), rec("2", "Ping 2", 1)];
        assert!(ClusterEngine::default().cluster(&records).is_empty());
        assert_eq!(ClusterEngine::new(2).cluster(&records).len(), 1);
    }
}
