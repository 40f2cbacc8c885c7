//! Push Sender — signed webhook delivery for terminal task transitions.
//!
//! A 2048-bit RSA key pair is generated at process start; the public half is
//! published as a JWKS document at `/.well-known/jwks.json` before any
//! delivery uses it. Each delivery POSTs the task snapshot with an RS256
//! bearer JWT whose `kid` resolves in that document.
//!
//! Delivery is at-least-once with bounded exponential backoff: 2xx is
//! success, 4xx is permanent failure, 5xx and network errors retry until the
//! attempt count or total time budget runs out. Deliveries for the same task
//! are serialized (per-task FIFO); failures are logged and never roll back
//! the task transition.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use a2a_mesh::{PushNotificationConfig, Task};

use crate::error::{CoreError, CoreResult};

/// Lifetime of a delivery JWT.
const TOKEN_TTL_SECS: i64 = 600;

/// Correlation token header echoed back to the receiver.
const NOTIFICATION_TOKEN_HEADER: &str = "X-A2A-Notification-Token";

// ── Signing key + JWKS ───────────────────────────────────────

/// Process-wide RS256 signing key. Read-only after construction.
pub struct SigningKey {
    kid: String,
    encoding: EncodingKey,
    public: RsaPublicKey,
}

impl SigningKey {
    /// Generate a fresh 2048-bit key with a random key id.
    pub fn generate() -> CoreResult<Self> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048)
            .map_err(|e| CoreError::Push(format!("RSA key generation failed: {e}")))?;
        let der = private
            .to_pkcs1_der()
            .map_err(|e| CoreError::Push(format!("RSA key encoding failed: {e}")))?;
        let public = RsaPublicKey::from(&private);

        Ok(Self {
            kid: Uuid::new_v4().to_string(),
            encoding: EncodingKey::from_rsa_der(der.as_bytes()),
            public,
        })
    }

    /// The key id carried in JWT headers and the JWKS document.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The JWKS document publishing the public half of this key.
    pub fn jwks(&self) -> Jwks {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        Jwks {
            keys: vec![Jwk {
                kty: "RSA".into(),
                usage: "sig".into(),
                alg: "RS256".into(),
                kid: self.kid.clone(),
                n: engine.encode(self.public.n().to_bytes_be()),
                e: engine.encode(self.public.e().to_bytes_be()),
            }],
        }
    }

    /// Mint a short-lived RS256 bearer token for one delivery.
    pub fn sign(&self, issuer: &str) -> CoreResult<String> {
        let now = Utc::now().timestamp();
        let claims = PushClaims {
            iss: issuer.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, &claims, &self.encoding)
            .map_err(|e| CoreError::Push(format!("JWT signing failed: {e}")))
    }
}

/// JWT claims attached to push deliveries. Task identity travels in the
/// request body, not the token.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A JWKS document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Look up a key by id.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// A single JWK entry (RSA public key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use")]
    pub usage: String,
    pub alg: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

// ── Delivery ─────────────────────────────────────────────────

/// Retry policy for webhook delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// First backoff delay; doubles per retry.
    pub initial_backoff: Duration,

    /// Per-attempt HTTP timeout.
    pub attempt_timeout: Duration,

    /// Overall budget across all attempts.
    pub total_budget: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
            total_budget: Duration::from_secs(300),
        }
    }
}

/// Delivers signed task snapshots to caller-configured webhooks.
pub struct PushSender {
    http: reqwest::Client,
    key: Arc<SigningKey>,
    issuer: String,
    policy: RetryPolicy,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PushSender {
    pub fn new(key: Arc<SigningKey>, issuer: String, policy: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            key,
            issuer,
            policy,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The signing key whose JWKS document this process serves.
    pub fn signing_key(&self) -> &Arc<SigningKey> {
        &self.key
    }

    /// Probe a webhook URL with a HEAD request; 2xx/3xx counts as reachable.
    /// Callers may gate acceptance of a push config on this.
    pub async fn verify_url(&self, url: &Url) -> bool {
        match self
            .http
            .head(url.clone())
            .timeout(self.policy.attempt_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Webhook verification failed");
                false
            }
        }
    }

    /// Deliver the task snapshot to the configured webhook.
    ///
    /// Returns whether a 2xx was received. Deliveries for the same task are
    /// serialized so a later terminal delivery never precedes an earlier one.
    pub async fn deliver(&self, task: &Task, config: &PushNotificationConfig) -> bool {
        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(
                in_flight
                    .entry(task.id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _fifo = gate.lock().await;

        let deadline = Instant::now() + self.policy.total_budget;
        let mut backoff = self.policy.initial_backoff;

        for attempt in 0..=self.policy.max_retries {
            let jwt = match self.key.sign(&self.issuer) {
                Ok(jwt) => jwt,
                Err(e) => {
                    tracing::error!(task_id = %task.id, error = %e, "Could not sign push delivery");
                    return false;
                }
            };

            let mut request = self
                .http
                .post(config.url.clone())
                .bearer_auth(jwt)
                .timeout(self.policy.attempt_timeout)
                .json(task);
            if let Some(ref token) = config.token {
                request = request.header(NOTIFICATION_TOKEN_HEADER, token);
            }

            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(
                        task_id = %task.id,
                        url = %config.url,
                        attempt,
                        "Push delivery succeeded"
                    );
                    return true;
                }
                Ok(resp) if resp.status().is_client_error() => {
                    tracing::warn!(
                        task_id = %task.id,
                        url = %config.url,
                        status = %resp.status(),
                        "Push delivery rejected by peer; not retrying"
                    );
                    return false;
                }
                Ok(resp) => {
                    tracing::warn!(
                        task_id = %task.id,
                        status = %resp.status(),
                        attempt,
                        "Push delivery failed; will retry"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        task_id = %task.id,
                        error = %e,
                        attempt,
                        "Push delivery error; will retry"
                    );
                }
            }

            if attempt == self.policy.max_retries || Instant::now() + backoff > deadline {
                break;
            }
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        tracing::error!(
            task_id = %task.id,
            url = %config.url,
            "Push delivery gave up after exhausting its retry budget"
        );
        false
    }
}
