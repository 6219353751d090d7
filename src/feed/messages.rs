use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of media attached to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// Record written to the remote log (the log assigns the id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub username: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Epoch milliseconds at send time
    pub timestamp: i64,
    /// Data URL (`data:<mime>;base64,...`)
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

/// Full copy of the last N records, keyed by log-assigned id.
///
/// Ids are zero-padded hex sequence numbers, so the map's key order is the
/// log order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: BTreeMap<String, MessageRecord>,
}

/// Request for the current snapshot, sent on `<prefix>.fetch`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub limit: usize,
}

/// Format a log sequence number as a record id
pub fn log_id(sequence: u64) -> String {
    format!("{:016x}", sequence)
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep only the `limit` most recent records
    pub fn tail(mut self, limit: usize) -> Self {
        while self.records.len() > limit {
            self.records.pop_first();
        }
        self
    }

    /// Decode into messages, preserving log order
    pub fn into_messages(self) -> Vec<Message> {
        self.records
            .into_iter()
            .map(|(id, record)| Message::from_record(id, record))
            .collect()
    }
}

/// A message as held in the local message list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub username: String,
    pub text: Option<String>,
    pub timestamp: i64,
    pub media: Option<String>,
    pub media_type: Option<MediaType>,
}

impl Message {
    pub fn from_record(id: String, record: MessageRecord) -> Self {
        Self {
            id,
            username: record.username,
            text: record.text,
            timestamp: record.timestamp,
            media: record.media,
            media_type: record.media_type,
        }
    }

    /// Text if present and non-empty
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    pub fn code_block(&self) -> Option<CodeBlock> {
        self.text().and_then(CodeBlock::parse)
    }
}

/// A fenced code message: ```` ```lang\ncode``` ````
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

impl CodeBlock {
    const FENCE: &'static str = "```";

    /// Parse a message text that starts and ends with a fence.
    ///
    /// The first line inside the fence names the language (`text` when blank),
    /// the remaining lines are the code.
    pub fn parse(text: &str) -> Option<Self> {
        if !text.starts_with(Self::FENCE) || !text.ends_with(Self::FENCE) {
            return None;
        }

        // Overlapping fences ("```", "````") leave an empty block
        let inner = text
            .get(Self::FENCE.len()..text.len().saturating_sub(Self::FENCE.len()))
            .unwrap_or("")
            .trim();
        let mut lines = inner.split('\n');
        let language = match lines.next().map(str::trim) {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => "text".to_string(),
        };
        let code = lines.collect::<Vec<_>>().join("\n");

        Some(Self { language, code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_block_language_and_body() {
        let block = CodeBlock::parse("```rust\nfn main() {}\nlet x = 1;\n```").unwrap();
        assert_eq!(block.language, "rust");
        assert_eq!(block.code, "fn main() {}\nlet x = 1;");

        let block = CodeBlock::parse("```\nplain\n```").unwrap();
        assert_eq!(block.language, "text");
        assert_eq!(block.code, "plain");
    }

    #[test]
    fn test_bare_fences_are_empty_blocks() {
        for text in ["```", "````", "`````", "``````"] {
            let block = CodeBlock::parse(text).unwrap();
            assert_eq!(block.language, "text", "{:?}", text);
            assert_eq!(block.code, "", "{:?}", text);
        }
    }

    #[test]
    fn test_unfenced_text_is_not_code() {
        assert_eq!(CodeBlock::parse("hello"), None);
        assert_eq!(CodeBlock::parse("```rust\nunterminated"), None);
        assert_eq!(CodeBlock::parse("``"), None);
    }
}
