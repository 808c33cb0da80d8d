//! Wire types for one line of a session JSONL file.
//!
//! Deliberately permissive: unknown `message.content` part types and unknown
//! top-level record `type`s deserialize successfully and are simply not counted
//! as contributing text, per the parser's acceptance rule (spec §3.1).

use serde::Deserialize;

/// One decoded line of a session file.
#[derive(Debug, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(rename = "isMeta", default)]
    pub is_meta: bool,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<MessageEnvelope>,
}

impl SessionRecord {
    /// Whether this record can contribute to a document's full text, per spec §3.1:
    /// `type` must be user/assistant, `isMeta` must not be true, and there must be a
    /// message with both a role and non-empty content.
    pub fn contributes(&self) -> bool {
        if self.is_meta {
            return false;
        }
        if self.record_type != "user" && self.record_type != "assistant" {
            return false;
        }
        match &self.message {
            Some(envelope) => envelope.role.is_some() && !envelope.content.is_empty(),
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageEnvelope {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: MessageContent,
}

/// `message.content` is either a plain string or an ordered sequence of parts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Parts(Vec::new())
    }
}

impl MessageContent {
    fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(s) => s.is_empty(),
            MessageContent::Parts(parts) => parts.is_empty(),
        }
    }

    /// Extract contributing text (joined with spaces) and tool names referenced.
    pub fn extract(&self) -> (String, Vec<String>) {
        match self {
            MessageContent::Text(s) => (s.clone(), Vec::new()),
            MessageContent::Parts(parts) => {
                let mut text = String::new();
                let mut tools = Vec::new();
                for part in parts {
                    match part {
                        ContentPart::Text { text: t } => {
                            if !text.is_empty() {
                                text.push(' ');
                            }
                            text.push_str(t);
                        }
                        ContentPart::ToolUse { name } => tools.push(name.clone()),
                        ContentPart::ToolResult {} | ContentPart::Other => {}
                    }
                }
                (text, tools)
            }
        }
    }
}

/// A single content block. Unknown `type` tags fall through to `Other` and are ignored,
/// matching the design note that models `message.content` as a tagged union iterated
/// over with unrecognised tags skipped rather than rejected.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { name: String },
    #[serde(rename = "tool_result")]
    ToolResult {},
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_content_contributes() {
        let line = r#"{"type":"user","sessionId":"s1","message":{"role":"user","content":"hello world"}}"#;
        let rec: SessionRecord = serde_json::from_str(line).unwrap();
        assert!(rec.contributes());
        let (text, tools) = rec.message.unwrap().content.extract();
        assert_eq!(text, "hello world");
        assert!(tools.is_empty());
    }

    #[test]
    fn blocks_content_extracts_text_and_tools() {
        let line = r#"{"type":"assistant","sessionId":"s1","message":{"role":"assistant","content":[
            {"type":"text","text":"let me check"},
            {"type":"tool_use","name":"Bash","input":{}},
            {"type":"tool_result","content":"ignored"},
            {"type":"thinking","thinking":"pondering"}
        ]}}"#;
        let rec: SessionRecord = serde_json::from_str(line).unwrap();
        assert!(rec.contributes());
        let (text, tools) = rec.message.unwrap().content.extract();
        assert_eq!(text, "let me check");
        assert_eq!(tools, vec!["Bash".to_string()]);
    }

    #[test]
    fn meta_record_does_not_contribute() {
        let line = r#"{"type":"user","isMeta":true,"sessionId":"s1","message":{"role":"user","content":"hidden"}}"#;
        let rec: SessionRecord = serde_json::from_str(line).unwrap();
        assert!(!rec.contributes());
    }

    #[test]
    fn summary_type_does_not_contribute() {
        let line = r#"{"type":"summary","summary":"a long chat"}"#;
        let rec: SessionRecord = serde_json::from_str(line).unwrap();
        assert!(!rec.contributes());
    }

    #[test]
    fn missing_message_does_not_contribute() {
        let line = r#"{"type":"system","sessionId":"s1"}"#;
        let rec: SessionRecord = serde_json::from_str(line).unwrap();
        assert!(!rec.contributes());
    }

    #[test]
    fn empty_content_does_not_contribute() {
        let line = r#"{"type":"user","sessionId":"s1","message":{"role":"user","content":""}}"#;
        let rec: SessionRecord = serde_json::from_str(line).unwrap();
        assert!(!rec.contributes());
    }
}
