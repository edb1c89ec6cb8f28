//! Typed client for the backend REST API.
//!
//! # Responsibilities
//! - Build resource URLs against one resolved API base
//! - Fetch and decode backend records
//! - Optionally share one in-flight request per resource between views
//!
//! # Design Decisions
//! - Non-2xx answers are errors for views, even though the gateway relays
//!   them verbatim
//! - Deduplication is keyed by resource identity, not URL text
//! - Only overlapping callers share a response; the entry is dropped as soon
//!   as the shared fetch settles, so a later call always reaches the backend

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

use crate::dashboard::types::{
    AdminStats, BillingRecord, Member, MemberId, MembershipPlan, Recommendation,
    RecommendationsEnvelope, WeeklySchedule, WeeklyScheduleEnvelope,
};

/// A backend resource, by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Members,
    Member(MemberId),
    Billing(MemberId),
    Plans,
    Recommendations { member: MemberId, top_n: u32 },
    WeeklySchedule(MemberId),
    AdminStats,
}

impl Resource {
    /// Path and query relative to the API base.
    pub fn path(&self) -> String {
        match self {
            Resource::Members => "/members/".to_string(),
            Resource::Member(id) => format!("/members/{}", id),
            Resource::Billing(id) => format!("/members/{}/billing", id),
            Resource::Plans => "/membership-plans/".to_string(),
            Resource::Recommendations { member, top_n } => {
                format!("/members/{}/recommendations?top_n={}", member, top_n)
            }
            Resource::WeeklySchedule(id) => format!("/members/{}/weekly-schedule", id),
            Resource::AdminStats => "/admin/stats".to_string(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Errors fetching a resource.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("unexpected payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

type InFlight = DashMap<Resource, Arc<OnceCell<Value>>>;

/// Client for the backend API, shared by every view.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Arc<str>,
    in_flight: Option<Arc<InFlight>>,
}

impl ApiClient {
    pub fn new(base: &Url) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            http,
            base: Arc::from(base.as_str().trim_end_matches('/')),
            in_flight: None,
        })
    }

    /// Let concurrent fetches of one resource, from any clone of this
    /// client, share a single backend request.
    pub fn with_dedup(mut self) -> Self {
        self.in_flight = Some(Arc::new(DashMap::new()));
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url_for(&self, resource: Resource) -> String {
        format!("{}{}", self.base, resource.path())
    }

    /// Number of resources with a shared fetch still pending.
    pub fn in_flight(&self) -> usize {
        self.in_flight.as_ref().map_or(0, |map| map.len())
    }

    /// Fetch a resource as raw JSON.
    pub async fn get_value(&self, resource: Resource) -> Result<Value, ApiError> {
        let Some(in_flight) = &self.in_flight else {
            return self.fetch_value(resource).await;
        };

        let cell = in_flight.entry(resource).or_default().value().clone();
        let result = cell
            .get_or_try_init(|| self.fetch_value(resource))
            .await
            .cloned();
        // A newer cell may already sit under this key; leave it alone.
        in_flight.remove_if(&resource, |_, current| Arc::ptr_eq(current, &cell));
        result
    }

    async fn fetch_value(&self, resource: Resource) -> Result<Value, ApiError> {
        let url = self.url_for(resource);
        tracing::debug!(url = %url, "Fetching resource");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        let bytes = response.bytes().await.map_err(|source| ApiError::Request {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
    }

    async fn get<T: DeserializeOwned>(&self, resource: Resource) -> Result<T, ApiError> {
        let value = self.get_value(resource).await?;
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            url: self.url_for(resource),
            source,
        })
    }

    pub async fn members(&self) -> Result<Vec<Member>, ApiError> {
        self.get(Resource::Members).await
    }

    pub async fn member(&self, id: MemberId) -> Result<Member, ApiError> {
        self.get(Resource::Member(id)).await
    }

    pub async fn billing(&self, id: MemberId) -> Result<Vec<BillingRecord>, ApiError> {
        self.get(Resource::Billing(id)).await
    }

    pub async fn plans(&self) -> Result<Vec<MembershipPlan>, ApiError> {
        self.get(Resource::Plans).await
    }

    pub async fn recommendations(
        &self,
        member: MemberId,
        top_n: u32,
    ) -> Result<Vec<Recommendation>, ApiError> {
        let envelope: RecommendationsEnvelope =
            self.get(Resource::Recommendations { member, top_n }).await?;
        Ok(envelope.recommendations)
    }

    pub async fn weekly_schedule(&self, id: MemberId) -> Result<WeeklySchedule, ApiError> {
        let envelope: WeeklyScheduleEnvelope = self.get(Resource::WeeklySchedule(id)).await?;
        Ok(envelope.weekly_schedule)
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        self.get(Resource::AdminStats).await
    }
}
