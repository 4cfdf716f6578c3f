//! Privacy risk scan: flags messages whose subject or snippet suggests they
//! carry credentials, financial details or identity documents.

use std::fmt;

use crate::classify::keywords::first_match;
use crate::model::record::MessageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum RiskCategory {
    Credentials,
    Financial,
    Identity,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Credentials => "Credentials",
            Self::Financial => "Financial",
            Self::Identity => "Identity",
        };
        f.pad(name)
    }
}

/// Severity; ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.pad(name)
    }
}

/// One flagged message.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PrivacyRisk<'a> {
    pub record: &'a MessageRecord,
    pub category: RiskCategory,
    pub level: RiskLevel,
    /// The keyword phrase that matched.
    pub trigger: &'static str,
}

struct RiskGroup {
    category: RiskCategory,
    level: RiskLevel,
    keywords: &'static [&'static str],
}

/// Checked in order; the first group with a matching phrase claims the record.
const GROUPS: &[RiskGroup] = &[
    RiskGroup {
        category: RiskCategory::Credentials,
        level: RiskLevel::High,
        keywords: &[
            "password reset",
            "verification code",
            "security code",
            "login alert",
            "2fa",
            "otp",
        ],
    },
    RiskGroup {
        category: RiskCategory::Financial,
        level: RiskLevel::Medium,
        keywords: &[
            "bank statement",
            "account summary",
            "payment confirmation",
            "invoice #",
            "receipt for",
        ],
    },
    RiskGroup {
        category: RiskCategory::Identity,
        level: RiskLevel::High,
        keywords: &[
            "passport application",
            "visa granted",
            "tax return",
            "aadhaar",
            "social security",
        ],
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct PrivacyScanner;

impl PrivacyScanner {
    pub fn new() -> Self {
        Self
    }

    /// At most one risk per record, highest level first; equal levels keep
    /// record order.
    pub fn scan<'a>(&self, records: &'a [MessageRecord]) -> Vec<PrivacyRisk<'a>> {
        let mut risks: Vec<PrivacyRisk<'a>> = records.iter().filter_map(assess).collect();
        risks.sort_by(|a, b| b.level.cmp(&a.level));
        risks
    }
}

/// The risk `record` carries, if any.
pub fn assess(record: &MessageRecord) -> Option<PrivacyRisk<'_>> {
    let text = format!("{} {}", record.subject, record.snippet).to_lowercase();
    GROUPS.iter().find_map(|group| {
        first_match(&text, group.keywords).map(|trigger| PrivacyRisk {
            record,
            category: group.category,
            level: group.level,
            trigger,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, subject: &str, snippet: &str) -> MessageRecord {
        let mut r = MessageRecord::new(id);
        r.subject = subject.into();
        r.snippet = snippet.into();
        r
    }

    #[test]
    fn test_verification_code_is_high_credentials() {
        let records = vec![rec("1", "Your verification code is ready", "")];
        let risks = PrivacyScanner::new().scan(&records);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].category, RiskCategory::Credentials);
        assert_eq!(risks[0].level, RiskLevel::High);
        assert_eq!(risks[0].trigger, "verification code");
        assert_eq!(risks[0].record.id, "1");
    }

    #[test]
    fn test_overlap_yields_single_entry_from_first_group() {
        let records = vec![rec("1", "Bank statement available", "use security code 1234")];
        let risks = PrivacyScanner::new().scan(&records);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].category, RiskCategory::Credentials);
        assert_eq!(risks[0].trigger, "security code");
    }

    #[test]
    fn test_sorted_by_level_with_stable_ties() {
        let records = vec![
            rec("f1", "Invoice #12", ""),
            rec("i1", "Your tax return", ""),
            rec("none", "Lunch", ""),
            rec("c1", "Login alert", ""),
            rec("f2", "Receipt for your order", ""),
        ];
        let risks = PrivacyScanner::new().scan(&records);
        let ids: Vec<_> = risks.iter().map(|r| r.record.id.as_str()).collect();
        assert_eq!(ids, ["i1", "c1", "f1", "f2"]);
    }

    #[test]
    fn test_level_ordering() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
    }
}
