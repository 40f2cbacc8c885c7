//! Catalog — the discovery registry mapping agents to their cards.
//!
//! Agents register their card at startup and re-register on a heartbeat
//! interval; the catalog expires entries that have not been refreshed within
//! a grace period of three heartbeats. Registration upserts by card URL;
//! lookup accepts the agent name or its URL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use a2a_mesh::AgentCard;

use crate::error::{CoreError, CoreResult};

/// Default heartbeat re-registration interval.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

/// Entries expire after this many missed heartbeats.
const GRACE_FACTOR: u32 = 3;

struct CatalogEntry {
    card: AgentCard,
    last_seen: DateTime<Utc>,
}

/// In-memory agent card registry with heartbeat expiry.
pub struct Catalog {
    entries: RwLock<HashMap<String, CatalogEntry>>,
    heartbeat: Duration,
}

impl Catalog {
    pub fn new(heartbeat: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            heartbeat,
        }
    }

    fn grace(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::from_std(self.heartbeat * GRACE_FACTOR)
            .unwrap_or_else(|_| chrono::TimeDelta::seconds(90))
    }

    /// Register (or refresh) an agent card. Upserts by card URL.
    pub async fn register(&self, card: AgentCard) -> CoreResult<()> {
        card.validate()
            .map_err(|e| CoreError::InvalidParams(e.to_string()))?;

        let mut entries = self.entries.write().await;
        tracing::info!(name = %card.name, url = %card.url, "Registered agent");
        entries.insert(
            card.url.to_string(),
            CatalogEntry {
                card,
                last_seen: Utc::now(),
            },
        );
        Ok(())
    }

    /// Look up a live agent by name or URL.
    pub async fn get(&self, id: &str) -> Option<AgentCard> {
        let cutoff = Utc::now() - self.grace();
        let entries = self.entries.read().await;
        entries
            .values()
            .find(|e| e.last_seen >= cutoff && (e.card.name == id || e.card.url.as_str() == id))
            .map(|e| e.card.clone())
    }

    /// All live agent cards.
    pub async fn list(&self) -> Vec<AgentCard> {
        let cutoff = Utc::now() - self.grace();
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|e| e.last_seen >= cutoff)
            .map(|e| e.card.clone())
            .collect()
    }

    /// Drop entries past the grace period. Lookups already ignore them;
    /// this reclaims the memory.
    pub async fn purge_expired(&self) {
        let cutoff = Utc::now() - self.grace();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.last_seen >= cutoff);
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT)
    }
}

// ── HTTP surface ─────────────────────────────────────────────

/// Routes for running the catalog as its own process.
pub fn catalog_router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/agent", post(register_agent))
        .route("/agent/:id", get(get_agent))
        .route("/.well-known/catalog.json", get(list_agents))
        .with_state(catalog)
}

async fn register_agent(
    State(catalog): State<Arc<Catalog>>,
    Json(card): Json<AgentCard>,
) -> Response {
    match catalog.register(card).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn get_agent(State(catalog): State<Arc<Catalog>>, Path(id): Path<String>) -> Response {
    match catalog.get(&id).await {
        Some(card) => Json(card).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_agents(State(catalog): State<Arc<Catalog>>) -> Json<Vec<AgentCard>> {
    Json(catalog.list().await)
}

// ── Client side ──────────────────────────────────────────────

/// Client an agent uses to register itself with a catalog process.
pub struct CatalogClient {
    http: reqwest::Client,
    catalog_url: String,
}

impl CatalogClient {
    pub fn new(catalog_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            catalog_url: catalog_url.into(),
        }
    }

    /// Register our card with the catalog.
    pub async fn register(&self, card: &AgentCard) -> CoreResult<()> {
        let url = format!("{}/agent", self.catalog_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(card)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("catalog registration failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Internal(format!(
                "catalog registration returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Fetch all live agents from the catalog.
    pub async fn list(&self) -> CoreResult<Vec<AgentCard>> {
        let url = format!(
            "{}/.well-known/catalog.json",
            self.catalog_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("catalog listing failed: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("catalog listing failed: {e}")))
    }

    /// Register now and keep re-registering on the heartbeat interval.
    pub fn spawn_heartbeat(self: Arc<Self>, card: AgentCard, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.register(&card).await {
                    tracing::warn!(error = %e, "Catalog heartbeat failed");
                }
            }
        })
    }
}
