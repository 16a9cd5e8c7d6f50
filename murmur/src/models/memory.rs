use serde::{Deserialize, Serialize};

use super::Metadata;

pub const COLLECTION_PREFIX: &str = "bot";

/// One recalled memory with its relevance to the query (higher is closer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryHit {
    pub text: String,
    pub metadata: Metadata,
    pub relevance: f32,
}

/// Collection name for a bot's memories: `bot_<id>`.
pub fn collection_name(bot_id: i64) -> String {
    format!("{COLLECTION_PREFIX}_{bot_id}")
}

/// Recover the bot id from a collection name. Any other shape yields `None`.
pub fn parse_collection_name(name: &str) -> Option<i64> {
    let mut parts = name.split('_');
    let (prefix, id, rest) = (parts.next()?, parts.next()?, parts.next());
    if prefix != COLLECTION_PREFIX || rest.is_some() {
        return None;
    }
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// Metadata attached to memories formed while reacting to social content.
pub fn context_metadata(context_type: &str, context_id: impl ToString) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "context_type".to_string(),
        serde_json::Value::String(context_type.to_string()),
    );
    metadata.insert(
        "context_id".to_string(),
        serde_json::Value::String(context_id.to_string()),
    );
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_round_trip() {
        assert_eq!(collection_name(42), "bot_42");
        assert_eq!(parse_collection_name("bot_42"), Some(42));
    }

    #[test]
    fn test_parse_collection_name_rejects_other_shapes() {
        assert_eq!(parse_collection_name("bot_"), None);
        assert_eq!(parse_collection_name("bot_x1"), None);
        assert_eq!(parse_collection_name("bot_1_2"), None);
        assert_eq!(parse_collection_name("user_3"), None);
        assert_eq!(parse_collection_name("bot_-3"), None);
        assert_eq!(parse_collection_name("legacy"), None);
    }

    #[test]
    fn test_context_metadata() {
        let metadata = context_metadata("post", 17);
        assert_eq!(metadata["context_type"], "post");
        assert_eq!(metadata["context_id"], "17");
    }
}
