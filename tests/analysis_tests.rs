//! Integration tests for the analyzers, run over the scanned MBOX fixture and
//! over generated records.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use inboxsweep::analysis::{
    cleanup_candidates, normalize_subject, sender_aggregates, summarize, ClusterEngine,
    DecayAnalyzer, DecayStatus, PrivacyScanner, RiskCategory, RiskLevel,
};
use inboxsweep::classify::Categorizer;
use inboxsweep::ingest::{MboxSource, Pipeline, ScanEvent, ScanOptions};
use inboxsweep::model::{Category, MessageRecord, Sender};
use inboxsweep::store::MemoryStore;

fn fixture_records() -> Vec<MessageRecord> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample.mbox");
    let source = MboxSource::open(path, 100).unwrap();
    let mut p = Pipeline::new(
        source,
        MemoryStore::new(),
        Categorizer::default(),
        ScanOptions::default(),
    );
    p.run(&mut |_: &ScanEvent| {}).unwrap();
    p.into_parts().1.records().to_vec()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Local> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0)
        .unwrap()
        .with_timezone(&Local)
}

/// Deterministic mixed mailbox: a few senders, repeating subjects, some unread.
fn generated(n: usize) -> Vec<MessageRecord> {
    let base = at(2024, 1, 1);
    (0..n)
        .map(|i| {
            let mut r = MessageRecord::new(format!("g{i}"));
            r.from = Sender::parse(&format!("sender{}@x.example", i % 7));
            r.subject = match i % 4 {
                0 => format!("Invoice #{i}"),
                1 => format!("Re: Weekly report {}", i % 5),
                2 => "Your verification code".to_string(),
                _ => String::new(),
            };
            r.size_bytes = (i as u64 % 13 + 1) * 100;
            r.is_read = i % 3 == 0;
            r.date = Some(base + Duration::days(i as i64 % 200));
            r
        })
        .collect()
}

// ─── Fixture mailbox ────────────────────────────────────────────────

#[test]
fn test_summary_of_fixture() {
    let records = fixture_records();
    let summary = summarize(&records);
    assert_eq!(summary.total_messages, 7);
    assert_eq!(summary.unread, 3);
    assert_eq!(summary.with_unsubscribe, 2);

    let rows: Vec<_> = summary
        .categories
        .iter()
        .map(|c| (c.category, c.count))
        .collect();
    assert_eq!(
        rows,
        [
            (Some(Category::Important), 4),
            (Some(Category::Promotional), 1),
            (Some(Category::Newsletter), 1),
            (Some(Category::Automated), 1),
        ]
    );
}

#[test]
fn test_order_confirmations_cluster_in_fixture() {
    let records = fixture_records();
    let clusters = ClusterEngine::default().cluster(&records);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].key, "Order # Confirmed");
    let ids: Vec<_> = clusters[0].members.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "<order101@shop.example>",
            "<order102@shop.example>",
            "<order103@shop.example>",
        ]
    );
}

#[test]
fn test_privacy_scan_of_fixture() {
    let records = fixture_records();
    let risks = PrivacyScanner::new().scan(&records);
    assert_eq!(risks.len(), 1);
    assert_eq!(risks[0].record.id, "<otp7@bank.example>");
    assert_eq!(risks[0].category, RiskCategory::Credentials);
    assert_eq!(risks[0].level, RiskLevel::High);
}

#[test]
fn test_decay_of_fixture_depends_on_now() {
    let records = fixture_records();
    let analyzer = DecayAnalyzer::default();

    // Two of three order mails were read and the last one is recent.
    assert!(analyzer.analyze_at(&records, at(2024, 2, 1)).is_empty());

    let later = analyzer.analyze_at(&records, at(2024, 6, 1));
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].address, "orders@shop.example");
    assert_eq!(later[0].display_name, "Shop Orders");
    assert_eq!(later[0].status, DecayStatus::Ghost);
    assert_eq!(later[0].total, 3);
    assert_eq!(later[0].unread, 1);
}

#[test]
fn test_sender_rollup_and_candidates() {
    let records = fixture_records();
    let senders = sender_aggregates(&records);
    assert_eq!(senders.len(), 5);
    assert_eq!(senders[0].address, "orders@shop.example");
    assert_eq!(senders[0].count, 3);

    let candidates = cleanup_candidates(&records, Category::Important);
    let important: Vec<_> = candidates.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(important.len(), 4);
    // Alice's lunch mail has no Message-ID, so its id is content-derived.
    assert!(important.last().is_some_and(|id| id.starts_with("mbox-")));
    assert_eq!(candidates.last().map(|r| r.subject.as_str()), Some("Lunch tomorrow?"));
    assert!(cleanup_candidates(&records, Category::Spam).is_empty());
}

// ─── Properties over generated records ──────────────────────────────

#[test]
fn test_analyses_do_not_mutate_and_are_repeatable() {
    let records = generated(300);
    let before = records.clone();
    let now = at(2024, 12, 1);

    let engine = ClusterEngine::new(2);
    let analyzer = DecayAnalyzer::default();
    let scanner = PrivacyScanner::new();

    assert_eq!(engine.cluster(&records), engine.cluster(&records));
    assert_eq!(
        analyzer.analyze_at(&records, now),
        analyzer.analyze_at(&records, now)
    );
    assert_eq!(scanner.scan(&records), scanner.scan(&records));
    assert_eq!(summarize(&records), summarize(&records));
    assert_eq!(records, before);
}

#[test]
fn test_cluster_invariants() {
    let records = generated(300);
    let clusters = ClusterEngine::new(2).cluster(&records);
    assert!(!clusters.is_empty());

    for c in &clusters {
        assert!(c.count >= 2);
        assert_eq!(c.count, c.members.len());
        assert_eq!(
            c.total_bytes,
            c.members.iter().map(|r| r.size_bytes).sum::<u64>()
        );
        assert!(c.members.iter().all(|r| normalize_subject(&r.subject) == c.key));
        assert!(!c.key.is_empty());
    }
    assert!(clusters
        .windows(2)
        .all(|w| w[0].total_bytes >= w[1].total_bytes));
}

#[test]
fn test_decay_invariants() {
    let records = generated(300);
    let scores = DecayAnalyzer::default().analyze_at(&records, at(2024, 12, 1));
    assert!(!scores.is_empty());

    for s in &scores {
        assert!(s.total >= 3);
        assert!(s.unread <= s.total);
        assert!((0.0..=1.0).contains(&s.open_rate));
        assert_ne!(s.status, DecayStatus::Active);
    }
    assert!(scores
        .windows(2)
        .all(|w| w[0].wasted_bytes >= w[1].wasted_bytes));
}

#[test]
fn test_privacy_invariants() {
    let records = generated(100);
    let risks = PrivacyScanner::new().scan(&records);
    // 25 verification codes (high) and 25 invoices (medium), once each.
    assert_eq!(risks.len(), 50);
    assert!(risks[..25].iter().all(|r| r.level == RiskLevel::High));
    assert!(risks[25..]
        .iter()
        .all(|r| r.category == RiskCategory::Financial));
    let ids: HashSet<_> = risks.iter().map(|r| r.record.id.as_str()).collect();
    assert_eq!(ids.len(), risks.len());
}
