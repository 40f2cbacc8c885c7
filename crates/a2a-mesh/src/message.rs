//! Message — the communication unit exchanged within a task.
//!
//! A Message has a role (user, agent, or system), an ordered list of Parts
//! (text, file, or structured data), and an optional sub-role `name` used to
//! label injected messages (e.g. retrieved memories).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// A message exchanged between agents during a task.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Role of the sender.
    pub role: Role,

    /// Content parts of the message.
    pub parts: Vec<Part>,

    /// Optional sub-role identity (e.g. "memory" for injected context).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// Create a message from the calling user.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
            name: None,
            metadata: None,
        }
    }

    /// Create a message from the agent.
    pub fn agent(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Agent,
            parts,
            name: None,
            metadata: None,
        }
    }

    /// Create a system message, optionally carrying a sub-role name.
    pub fn system(parts: Vec<Part>, name: Option<String>) -> Self {
        Self {
            role: Role::System,
            parts,
            name,
            metadata: None,
        }
    }

    /// Convenience: create a user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::text(text)])
    }

    /// Convenience: create an agent message with a single text part.
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::agent(vec![Part::text(text)])
    }

    /// Extract all text content from this message.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Validate every part of this message.
    pub fn validate(&self) -> MeshResult<()> {
        for part in &self.parts {
            part.validate()?;
        }
        Ok(())
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The calling user or client agent.
    User,
    /// The responding agent.
    Agent,
    /// Framework-injected context (e.g. retrieved memories).
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A part of a message — a fully-formed piece of content.
///
/// Each part has a specific type: text, file, or structured data.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Part {
    /// Plain UTF-8 text content.
    #[serde(rename = "text")]
    Text { text: String },

    /// File content (inline base64 or by URI reference).
    #[serde(rename = "file")]
    File { file: FileContent },

    /// Structured data (arbitrary JSON object).
    #[serde(rename = "data")]
    Data { data: serde_json::Value },
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a file part from inline bytes.
    pub fn file_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        use base64::Engine;
        Self::File {
            file: FileContent {
                name: Some(name.into()),
                mime_type: Some(mime_type.into()),
                bytes: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                uri: None,
            },
        }
    }

    /// Create a file part from a URI reference.
    pub fn file_uri(uri: impl Into<String>, name: Option<String>) -> Self {
        Self::File {
            file: FileContent {
                name,
                mime_type: None,
                bytes: None,
                uri: Some(uri.into()),
            },
        }
    }

    /// Create a structured data part.
    pub fn data(value: serde_json::Value) -> Self {
        Self::Data { data: value }
    }

    /// Validate structural constraints (file parts carry exactly one source).
    pub fn validate(&self) -> MeshResult<()> {
        match self {
            Part::File { file } => file.validate(),
            _ => Ok(()),
        }
    }
}

/// File content — either inline (base64) or by URI reference, never both.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Optional filename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// MIME type of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Base64-encoded inline payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,

    /// URI reference to the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl FileContent {
    /// Exactly one of `bytes` or `uri` must be present.
    pub fn validate(&self) -> MeshResult<()> {
        match (&self.bytes, &self.uri) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (Some(_), Some(_)) => Err(MeshError::InvalidPart(
                "file part carries both inline bytes and a URI".into(),
            )),
            (None, None) => Err(MeshError::InvalidPart(
                "file part carries neither inline bytes nor a URI".into(),
            )),
        }
    }
}

/// Structured form payload carried in a `Data` part by input-required tasks.
///
/// The agent attaches this to the status message when it needs user input;
/// the next `tasks/send` supplies the filled `form_data`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FormPayload {
    /// Payload discriminator — always "form".
    #[serde(rename = "type", default = "form_kind")]
    pub kind: String,

    /// JSON schema describing the requested fields.
    pub form: serde_json::Value,

    /// Initial (or filled) field values.
    pub form_data: serde_json::Value,

    /// Human-readable instructions.
    pub instructions: String,
}

fn form_kind() -> String {
    "form".into()
}

impl FormPayload {
    pub fn new(
        form: serde_json::Value,
        form_data: serde_json::Value,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            kind: form_kind(),
            form,
            form_data,
            instructions: instructions.into(),
        }
    }

    /// Wrap this payload in a `Data` part.
    pub fn into_part(self) -> Part {
        Part::Data {
            data: serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Extract a form payload from a `Data` part, if it carries one.
    pub fn from_part(part: &Part) -> Option<Self> {
        match part {
            Part::Data { data } => {
                let payload: FormPayload = serde_json::from_value(data.clone()).ok()?;
                (payload.kind == "form").then_some(payload)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_creation() {
        let msg = Message::user_text("Hello, summarize this document");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.parts.len(), 1);
        assert_eq!(msg.text_content(), "Hello, summarize this document");
    }

    #[test]
    fn test_message_round_trip() {
        let msg = Message::user(vec![
            Part::text("Check this file"),
            Part::file_uri("https://example.com/doc.pdf", Some("doc.pdf".into())),
            Part::data(serde_json::json!({"priority": "high"})),
        ]);

        let json = serde_json::to_string_pretty(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.parts.len(), 3);
        assert_eq!(parsed.role, Role::User);
    }

    #[test]
    fn test_part_discriminator() {
        let json = serde_json::to_string(&Part::text("hi")).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"hi"}"#);
    }

    #[test]
    fn test_file_part_validation() {
        assert!(Part::file_uri("https://example.com/a.txt", None)
            .validate()
            .is_ok());
        assert!(Part::file_bytes("a.txt", "text/plain", b"hi".to_vec())
            .validate()
            .is_ok());

        let both = Part::File {
            file: FileContent {
                name: None,
                mime_type: None,
                bytes: Some("aGk=".into()),
                uri: Some("https://example.com/a.txt".into()),
            },
        };
        assert!(both.validate().is_err());

        let neither = Part::File {
            file: FileContent {
                name: None,
                mime_type: None,
                bytes: None,
                uri: None,
            },
        };
        assert!(neither.validate().is_err());
    }

    #[test]
    fn test_form_payload_round_trip() {
        let payload = FormPayload::new(
            serde_json::json!({"properties": {"date": {"type": "string"}}}),
            serde_json::json!({}),
            "Fill in the travel date",
        );
        let part = payload.into_part();
        let recovered = FormPayload::from_part(&part).unwrap();
        assert_eq!(recovered.instructions, "Fill in the travel date");

        assert!(FormPayload::from_part(&Part::text("not a form")).is_none());
    }

    #[test]
    fn test_system_message_name() {
        let msg = Message::system(vec![Part::text("recalled fact")], Some("memory".into()));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""name":"memory""#));
        assert!(json.contains(r#""role":"system""#));
    }
}
