//! Mailbox rollups: per-sender volume, per-category breakdown and cleanup
//! candidate selection.

use super::group_in_order;
use crate::model::record::{Category, MessageRecord};

/// Message count and storage for one sender address.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SenderAggregate {
    pub address: String,
    pub display_name: Option<String>,
    pub count: usize,
    pub total_bytes: u64,
    pub unread: usize,
}

/// One row of the category breakdown. `category` is `None` for unclassified records.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CategoryCount {
    pub category: Option<Category>,
    pub count: usize,
    pub total_bytes: u64,
}

/// Whole-mailbox totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MailboxSummary {
    pub total_messages: usize,
    pub total_bytes: u64,
    pub unread: usize,
    pub with_unsubscribe: usize,
    /// Sorted by count, largest first.
    pub categories: Vec<CategoryCount>,
}

/// Group by sender address, largest `total_bytes` first.
///
/// The display name is the first non-empty one seen for the address.
pub fn sender_aggregates(records: &[MessageRecord]) -> Vec<SenderAggregate> {
    let mut aggregates: Vec<SenderAggregate> =
        group_in_order(records, |r| Some(r.from.address.clone()))
            .into_iter()
            .map(|(address, group)| SenderAggregate {
                display_name: group.iter().find_map(|r| r.from.display_name.clone()),
                count: group.len(),
                total_bytes: group.iter().map(|r| r.size_bytes).sum(),
                unread: group.iter().filter(|r| !r.is_read).count(),
                address,
            })
            .collect();

    aggregates.sort_by(|a, b| b.total_bytes.cmp(&a.total_bytes));
    aggregates
}

pub fn summarize(records: &[MessageRecord]) -> MailboxSummary {
    let mut categories: Vec<CategoryCount> = group_in_order(records, |r| Some(r.category))
        .into_iter()
        .map(|(category, group)| CategoryCount {
            category,
            count: group.len(),
            total_bytes: group.iter().map(|r| r.size_bytes).sum(),
        })
        .collect();
    categories.sort_by(|a, b| b.count.cmp(&a.count));

    MailboxSummary {
        total_messages: records.len(),
        total_bytes: records.iter().map(|r| r.size_bytes).sum(),
        unread: records.iter().filter(|r| !r.is_read).count(),
        with_unsubscribe: records.iter().filter(|r| r.has_unsubscribe()).count(),
        categories,
    }
}

/// Records classified as `category`, in input order.
pub fn cleanup_candidates(records: &[MessageRecord], category: Category) -> Vec<&MessageRecord> {
    records
        .iter()
        .filter(|r| r.category == Some(category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::Sender;

    fn rec(id: &str, from: &str, category: Option<Category>, size: u64) -> MessageRecord {
        let mut r = MessageRecord::new(id);
        r.from = Sender::parse(from);
        r.category = category;
        r.size_bytes = size;
        r
    }

    fn sample() -> Vec<MessageRecord> {
        vec![
            rec("1", "shop@x.example", Some(Category::Promotional), 100),
            rec("2", "Shop <shop@x.example>", Some(Category::Promotional), 100),
            rec("3", "boss@x.example", Some(Category::Important), 50),
            rec("4", "news@x.example", Some(Category::Newsletter), 500),
            rec("5", "boss@x.example", None, 10),
        ]
    }

    #[test]
    fn test_sender_aggregates() {
        let aggs = sender_aggregates(&sample());
        let rows: Vec<_> = aggs
            .iter()
            .map(|a| (a.address.as_str(), a.count, a.total_bytes))
            .collect();
        assert_eq!(
            rows,
            [
                ("news@x.example", 1, 500),
                ("shop@x.example", 2, 200),
                ("boss@x.example", 2, 60)
            ]
        );
        assert_eq!(aggs[1].display_name.as_deref(), Some("Shop"));
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&sample());
        assert_eq!(summary.total_messages, 5);
        assert_eq!(summary.total_bytes, 760);
        assert_eq!(summary.unread, 5);
        assert_eq!(summary.categories[0].category, Some(Category::Promotional));
        assert_eq!(summary.categories[0].count, 2);
        assert_eq!(summary.categories.len(), 4);
        assert!(summary.categories.iter().any(|c| c.category.is_none()));
    }

    #[test]
    fn test_cleanup_candidates() {
        let records = sample();
        let ids: Vec<_> = cleanup_candidates(&records, Category::Promotional)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["1", "2"]);
        assert!(cleanup_candidates(&records, Category::Spam).is_empty());
    }
}
