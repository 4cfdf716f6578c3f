//! Core data model types: raw payloads, parsed records, sender identity.

pub mod address;
pub mod raw;
pub mod record;

pub use address::Sender;
pub use raw::{BodyEncoding, Header, MessagePart, RawMessage};
pub use record::{Category, MessageRecord};
