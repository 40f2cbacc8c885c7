//! Agent Card — the self-describing metadata document for agent discovery.
//!
//! Every A2A-compatible agent publishes an Agent Card at:
//!   `/.well-known/agent.json`
//!
//! The card describes the agent's capabilities, skills, authentication
//! schemes, and input/output modes. It is immutable after publish.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MeshError, MeshResult};
use crate::notification::AuthenticationInfo;

/// An A2A Agent Card — metadata describing an agent's capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Human-readable name of the agent.
    pub name: String,

    /// Base URL where the agent serves the protocol.
    pub url: Url,

    /// Semantic version of the agent.
    pub version: String,

    /// Description of what the agent does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The provider/organization that operates this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,

    /// Capabilities declared by this agent.
    #[serde(default)]
    pub capabilities: AgentCapabilities,

    /// Authentication requirements for calling this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationInfo>,

    /// Default input content modes accepted (e.g. "text", "file", "data").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_input_modes: Vec<String>,

    /// Default output content modes produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_output_modes: Vec<String>,

    /// Skills (specific abilities) of this agent, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Discover an agent by fetching its card from the well-known endpoint.
    ///
    /// Fetches `{base_url}/.well-known/agent.json`.
    pub async fn discover(base_url: &str) -> MeshResult<Self> {
        let url = format!("{}/.well-known/agent.json", base_url.trim_end_matches('/'));

        tracing::info!(url = %url, "Discovering A2A agent");

        let response = reqwest::get(&url)
            .await
            .map_err(|e| MeshError::DiscoveryFailed(format!("failed to fetch agent card: {e}")))?;

        if !response.status().is_success() {
            return Err(MeshError::DiscoveryFailed(format!(
                "agent card endpoint returned {}",
                response.status()
            )));
        }

        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| MeshError::InvalidAgentCard(format!("failed to parse agent card: {e}")))?;

        card.validate()?;

        tracing::info!(
            name = %card.name,
            skills = card.skills.len(),
            "Discovered A2A agent"
        );

        Ok(card)
    }

    /// Validate the agent card has required fields.
    pub fn validate(&self) -> MeshResult<()> {
        if self.name.is_empty() {
            return Err(MeshError::InvalidAgentCard("name is required".into()));
        }
        if self.version.is_empty() {
            return Err(MeshError::InvalidAgentCard("version is required".into()));
        }
        for skill in &self.skills {
            if skill.id.is_empty() || skill.name.is_empty() {
                return Err(MeshError::InvalidAgentCard(
                    "skills require an id and a name".into(),
                ));
            }
        }
        Ok(())
    }

    /// Check if this agent supports streaming.
    pub fn supports_streaming(&self) -> bool {
        self.capabilities.streaming
    }

    /// Check if this agent supports push notifications.
    pub fn supports_push_notifications(&self) -> bool {
        self.capabilities.push_notifications
    }

    /// Find a skill by id.
    pub fn find_skill(&self, skill_id: &str) -> Option<&AgentSkill> {
        self.skills.iter().find(|s| s.id == skill_id)
    }
}

/// Information about the agent's provider/operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    /// Name of the organization.
    pub organization: String,

    /// URL of the organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
}

/// Capabilities declared by the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Whether the agent supports SSE streaming (`tasks/sendSubscribe`).
    #[serde(default)]
    pub streaming: bool,

    /// Whether the agent supports push notifications (webhooks).
    #[serde(default)]
    pub push_notifications: bool,

    /// Whether the agent records full state transition history.
    #[serde(default)]
    pub state_transition_history: bool,
}

/// A specific skill/ability of the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique identifier for this skill.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Description of what this skill does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tags for categorization and search.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Example prompts that demonstrate this skill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_card() -> AgentCard {
        AgentCard {
            name: "summarizer".into(),
            url: Url::parse("https://agent.example.com").unwrap(),
            version: "1.0.0".into(),
            description: Some("Summarizes documents with citations".into()),
            provider: Some(AgentProvider {
                organization: "AgentMesh".into(),
                url: Some(Url::parse("https://agentmesh.dev").unwrap()),
            }),
            capabilities: AgentCapabilities {
                streaming: true,
                push_notifications: true,
                state_transition_history: false,
            },
            authentication: Some(AuthenticationInfo {
                schemes: vec!["bearer".into()],
                credentials: None,
            }),
            default_input_modes: vec!["text".into()],
            default_output_modes: vec!["text".into(), "data".into()],
            skills: vec![AgentSkill {
                id: "summarize".into(),
                name: "Document Summarization".into(),
                description: Some("Summarizes long documents".into()),
                tags: vec!["summarization".into(), "nlp".into()],
                examples: vec!["Summarize this quarterly report".into()],
            }],
        }
    }

    #[test]
    fn test_card_round_trip() {
        let card = sample_card();
        let json = serde_json::to_string_pretty(&card).unwrap();
        assert!(json.contains("summarizer"));
        assert!(json.contains("pushNotifications"));

        let parsed: AgentCard = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, card);
    }

    #[test]
    fn test_validate_card() {
        let mut card = sample_card();
        assert!(card.validate().is_ok());

        card.name = String::new();
        assert!(card.validate().is_err());

        card.name = "summarizer".into();
        card.skills[0].id = String::new();
        assert!(card.validate().is_err());
    }

    #[test]
    fn test_find_skill() {
        let card = sample_card();
        assert!(card.find_skill("summarize").is_some());
        assert!(card.find_skill("translate").is_none());
    }
}
