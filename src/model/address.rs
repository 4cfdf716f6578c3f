//! Sender identity parsed from a `From:` header value.

/// The sender of a message.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = Some("Juan García")`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = None`, `address = "user@example.com"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Sender {
    /// The sender address. Used case-sensitively as the grouping key.
    pub address: String,
    /// Human-readable display name, if the header carried one.
    pub display_name: Option<String>,
}

impl Sender {
    /// Split a `From`-style header value into address and display name.
    ///
    /// - `"Name <addr>"`: the text between the first `<` and the next `>` is
    ///   the address, the trimmed prefix (with every `"` removed) is the name.
    /// - No brackets but an `@`: the trimmed value is the address.
    /// - Anything else is kept verbatim as an opaque address.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        if let Some(start) = raw.find('<') {
            let name = raw[..start].replace('"', "");
            let display_name = Some(name.trim().to_string()).filter(|n| !n.is_empty());

            if let Some(len) = raw[start..].find('>') {
                return Self {
                    address: raw[start + 1..start + len].to_string(),
                    display_name,
                };
            }

            return Self {
                address: bare_address(raw),
                display_name,
            };
        }

        Self {
            address: bare_address(raw),
            display_name: None,
        }
    }

    /// The display name when present, otherwise the address.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.address)
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        match &self.display_name {
            Some(name) => format!("{name} <{}>", self.address),
            None => self.address.clone(),
        }
    }
}

fn bare_address(raw: &str) -> String {
    if raw.contains('@') {
        raw.trim().to_string()
    } else {
        raw.to_string()
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
