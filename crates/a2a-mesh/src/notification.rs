//! Push notification configuration — webhook delivery for task updates.
//!
//! Callers register a webhook URL per task; when the task reaches a terminal
//! state the serving agent POSTs the task snapshot there, signed with an
//! RS256 JWT whose public key is published in the sender's JWKS document.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Webhook configuration stored per task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationConfig {
    /// The webhook URL where the task snapshot will be POSTed.
    pub url: Url,

    /// Opaque correlation token echoed back to the receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Authentication hint for the receiving endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationInfo>,
}

/// Authentication schemes plus an optional credentials hint.
///
/// Shared between agent cards and push configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationInfo {
    /// Supported/required schemes (e.g. "bearer", "apiKey").
    pub schemes: Vec<String>,

    /// Optional credentials hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_config_round_trip() {
        let config = PushNotificationConfig {
            url: Url::parse("https://client.example.com/hooks/tasks").unwrap(),
            token: Some("corr-42".into()),
            authentication: Some(AuthenticationInfo {
                schemes: vec!["bearer".into()],
                credentials: None,
            }),
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: PushNotificationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
