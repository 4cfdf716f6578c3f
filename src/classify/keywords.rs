//! Keyword phrase lists used by the categorizer.
//!
//! Every phrase is lowercase; matching is plain substring containment against
//! lowercased text.

/// Phrases that mark marketing mail.
pub const PROMOTIONAL: &[&str] = &[
    "sale",
    "discount",
    "offer",
    "deal",
    "promotion",
    "coupon",
    "save",
    "free shipping",
    "limited time",
    "exclusive",
    "special offer",
    "buy now",
    "shop now",
    "clearance",
    "% off",
    "unsubscribe",
    "newsletter",
    "marketing",
    "advertisement",
];

/// Phrases that mark social-network activity notifications.
pub const SOCIAL: &[&str] = &[
    "liked",
    "commented",
    "shared",
    "followed",
    "mentioned",
    "tagged",
    "notification",
    "activity",
    "update from",
    "friend request",
    "message from",
];

/// Phrases that mark periodic editorial mail.
///
/// `"subscribers"` rather than `"subscribe"`: the bare word is a substring of
/// `"unsubscribe"`, which appears in nearly every bulk footer.
pub const NEWSLETTER: &[&str] = &[
    "newsletter",
    "weekly digest",
    "monthly update",
    "daily brief",
    "subscribers",
    "subscription",
    "bulletin",
    "roundup",
];

/// Address fragments that identify machine senders.
pub const AUTOMATED_SENDER: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "do-not-reply",
    "notifications",
    "automated",
    "mailer",
];

/// The three keyword groups the categorizer consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSets {
    pub promotional: Vec<String>,
    pub social: Vec<String>,
    pub newsletter: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            promotional: owned(PROMOTIONAL),
            social: owned(SOCIAL),
            newsletter: owned(NEWSLETTER),
        }
    }
}

impl KeywordSets {
    /// Add extra phrases to each group. Phrases are lowercased and trimmed;
    /// blanks and duplicates are dropped.
    pub fn extended(
        mut self,
        promotional: &[String],
        social: &[String],
        newsletter: &[String],
    ) -> Self {
        merge(&mut self.promotional, promotional);
        merge(&mut self.social, social);
        merge(&mut self.newsletter, newsletter);
        self
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn merge(target: &mut Vec<String>, extra: &[String]) {
    for phrase in extra {
        let phrase = phrase.trim().to_lowercase();
        if !phrase.is_empty() && !target.contains(&phrase) {
            target.push(phrase);
        }
    }
}

/// First phrase of `list` contained in `text`, if any.
pub fn first_match<'a, S: AsRef<str>>(text: &str, list: &'a [S]) -> Option<&'a str> {
    list.iter().map(AsRef::as_ref).find(|k| text.contains(k))
}
