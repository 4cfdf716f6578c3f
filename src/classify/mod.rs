//! Rule-based message categorization.
//!
//! A record (plus its optional HTML body) is reduced to a handful of boolean
//! [`Signals`], then an ordered rule table is walked top to bottom. The first
//! rule whose predicate holds decides the [`Category`]; the last rule always
//! holds, so classification is total.

pub mod keywords;

pub use keywords::KeywordSets;

use crate::model::record::{Category, MessageRecord};

/// Precomputed facts about one message that the rules consult.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub has_unsubscribe: bool,
    pub automated_sender: bool,
    pub promotional: bool,
    pub social: bool,
    pub newsletter: bool,
    pub spam_label: bool,
    pub promotions_label: bool,
    pub social_label: bool,
    pub updates_label: bool,
}

/// One entry of the rule table.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&Signals) -> bool,
    pub category: Category,
}

/// The rule table, in evaluation order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "unsubscribe+newsletter",
        applies: |s| s.has_unsubscribe && s.newsletter,
        category: Category::Newsletter,
    },
    Rule {
        name: "unsubscribe+promotional",
        applies: |s| s.has_unsubscribe && s.promotional,
        category: Category::Promotional,
    },
    Rule {
        name: "unsubscribe+social",
        applies: |s| s.has_unsubscribe && s.social,
        category: Category::Social,
    },
    Rule {
        name: "unsubscribe",
        applies: |s| s.has_unsubscribe,
        category: Category::Promotional,
    },
    Rule {
        name: "automated+social",
        applies: |s| s.automated_sender && s.social,
        category: Category::Social,
    },
    Rule {
        name: "automated",
        applies: |s| s.automated_sender,
        category: Category::Automated,
    },
    Rule {
        name: "promotional",
        applies: |s| s.promotional,
        category: Category::Promotional,
    },
    Rule {
        name: "social",
        applies: |s| s.social,
        category: Category::Social,
    },
    Rule {
        name: "newsletter",
        applies: |s| s.newsletter,
        category: Category::Newsletter,
    },
    Rule {
        name: "label:spam",
        applies: |s| s.spam_label,
        category: Category::Spam,
    },
    Rule {
        name: "label:promotions",
        applies: |s| s.promotions_label,
        category: Category::Promotional,
    },
    Rule {
        name: "label:social",
        applies: |s| s.social_label,
        category: Category::Social,
    },
    Rule {
        name: "label:updates",
        applies: |s| s.updates_label,
        category: Category::Newsletter,
    },
    Rule {
        name: "fallback",
        applies: |_| true,
        category: Category::Important,
    },
];

/// Assigns a [`Category`] to parsed records.
#[derive(Debug, Clone, Default)]
pub struct Categorizer {
    keywords: KeywordSets,
}

impl Categorizer {
    pub fn new(keywords: KeywordSets) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &KeywordSets {
        &self.keywords
    }

    /// Category for `record`, optionally looking at its HTML body as well.
    pub fn classify(&self, record: &MessageRecord, html_body: Option<&str>) -> Category {
        self.matching_rule(record, html_body).category
    }

    /// Name of the rule that decides `record`'s category.
    pub fn explain(&self, record: &MessageRecord, html_body: Option<&str>) -> &'static str {
        self.matching_rule(record, html_body).name
    }

    /// Compute the signals the rule table is evaluated against.
    pub fn signals(&self, record: &MessageRecord, html_body: Option<&str>) -> Signals {
        let text = format!(
            "{} {} {}",
            record.subject,
            record.snippet,
            html_body.unwrap_or("")
        )
        .to_lowercase();
        let address = record.from.address.to_lowercase();
        let labels: Vec<String> = record.labels.iter().map(|l| l.to_lowercase()).collect();
        let any_label = |needle: &str| labels.iter().any(|l| l.contains(needle));

        Signals {
            has_unsubscribe: record.has_unsubscribe(),
            automated_sender: keywords::first_match(&address, keywords::AUTOMATED_SENDER).is_some(),
            promotional: keywords::first_match(&text, &self.keywords.promotional).is_some(),
            social: keywords::first_match(&text, &self.keywords.social).is_some(),
            newsletter: keywords::first_match(&text, &self.keywords.newsletter).is_some(),
            spam_label: any_label("spam"),
            promotions_label: any_label("promotions"),
            social_label: any_label("social"),
            updates_label: any_label("updates"),
        }
    }

    fn matching_rule(&self, record: &MessageRecord, html_body: Option<&str>) -> &'static Rule {
        let signals = self.signals(record, html_body);
        RULES
            .iter()
            .find(|rule| (rule.applies)(&signals))
            .unwrap_or(&RULES[RULES.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::Sender;

    fn record(from: &str, subject: &str) -> MessageRecord {
        let mut rec = MessageRecord::new("m");
        rec.from = Sender::parse(from);
        rec.subject = subject.to_string();
        rec
    }

    fn with_unsubscribe(mut rec: MessageRecord) -> MessageRecord {
        rec.unsubscribe_url = Some("https://x.example/u".into());
        rec
    }

    #[test]
    fn test_fallback_rule_is_last_and_total() {
        let last = RULES.last().unwrap();
        assert_eq!(last.category, Category::Important);
        assert!((last.applies)(&Signals::default()));
    }

    #[test]
    fn test_unsubscribe_only_defaults_to_promotional() {
        let c = Categorizer::default();
        let rec = with_unsubscribe(record("shop@store.example", "Hello"));
        assert_eq!(c.classify(&rec, Some("<a href=\"#\">unsubscribe</a>")), Category::Promotional);
        assert_eq!(c.classify(&rec, None), Category::Promotional);
        assert_eq!(c.explain(&rec, None), "unsubscribe");
    }

    #[test]
    fn test_bare_subscribe_is_not_a_newsletter_keyword() {
        let rec = record("ana@club.example", "Subscribe to our list");
        assert_eq!(Categorizer::default().classify(&rec, None), Category::Important);
    }

    #[test]
    fn test_unsubscribe_prefers_newsletter_keywords() {
        let c = Categorizer::default();
        let rec = with_unsubscribe(record("team@blog.example", "Our weekly digest: 50% off"));
        assert_eq!(c.classify(&rec, None), Category::Newsletter);
    }

    #[test]
    fn test_unsubscribe_social() {
        let c = Categorizer::default();
        let rec = with_unsubscribe(record("friends@net.example", "Ana liked your photo"));
        assert_eq!(c.classify(&rec, None), Category::Social);
    }

    #[test]
    fn test_automated_sender() {
        let c = Categorizer::default();
        let rec = record("No-Reply@bank.example", "Your statement is ready");
        assert_eq!(c.classify(&rec, None), Category::Automated);

        let social = record("notifications@net.example", "Bob commented on your post");
        assert_eq!(c.classify(&social, None), Category::Social);
        assert_eq!(c.explain(&social, None), "automated+social");
    }

    #[test]
    fn test_automated_match_uses_address_only() {
        let c = Categorizer::default();
        let rec = record("\"Mailer Team\" <ops@corp.example>", "Lunch?");
        assert_eq!(c.classify(&rec, None), Category::Important);
    }

    #[test]
    fn test_keyword_precedence_without_unsubscribe() {
        let c = Categorizer::default();
        let rec = record("a@b.example", "Newsletter: huge sale");
        assert_eq!(c.classify(&rec, None), Category::Promotional);
        let rec = record("a@b.example", "Monthly update");
        assert_eq!(c.classify(&rec, None), Category::Newsletter);
    }

    #[test]
    fn test_body_is_searched() {
        let c = Categorizer::default();
        let rec = record("a@b.example", "Hi");
        assert_eq!(c.classify(&rec, Some("<p>FREE SHIPPING today</p>")), Category::Promotional);
        assert_eq!(c.classify(&rec, None), Category::Important);
    }

    #[test]
    fn test_label_rules() {
        let c = Categorizer::default();
        let mut rec = record("a@b.example", "Hi");
        rec.labels = vec!["INBOX".into(), "SPAM".into()];
        assert_eq!(c.classify(&rec, None), Category::Spam);
        rec.labels = vec!["CATEGORY_PROMOTIONS".into()];
        assert_eq!(c.classify(&rec, None), Category::Promotional);
        rec.labels = vec!["CATEGORY_SOCIAL".into()];
        assert_eq!(c.classify(&rec, None), Category::Social);
        rec.labels = vec!["CATEGORY_UPDATES".into()];
        assert_eq!(c.classify(&rec, None), Category::Newsletter);
        assert_eq!(c.explain(&rec, None), "label:updates");
    }

    #[test]
    fn test_invoice_is_important() {
        let c = Categorizer::default();
        let rec = record("billing@service.com", "Your Invoice #4821");
        assert_eq!(c.classify(&rec, None), Category::Important);
        assert_eq!(c.explain(&rec, None), "fallback");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let c = Categorizer::default();
        let rec = with_unsubscribe(record("deals@shop.example", "Clearance event"));
        let first = c.classify(&rec, Some("<b>buy now</b>"));
        for _ in 0..5 {
            assert_eq!(c.classify(&rec, Some("<b>buy now</b>")), first);
        }
    }

    #[test]
    fn test_injected_keywords() {
        let sets = KeywordSets::default().extended(&[], &[], &["zine".to_string()]);
        let c = Categorizer::new(sets);
        let rec = record("a@b.example", "The Friday Zine");
        assert_eq!(c.classify(&rec, None), Category::Newsletter);
        assert_eq!(Categorizer::default().classify(&rec, None), Category::Important);
    }
}
