//! HTTP client for the incident-reporting backend.
//!
//! # Endpoints
//!
//! - `POST /auth/login` - Exchange credentials for a token
//! - `GET /incidents?page=&size=` - One page of incidents
//! - `POST /incidents` - Report a new incident
//! - `PATCH /incidents/{id}/status` - Change status
//! - `PATCH /incidents/{id}/priority` - Change priority
//! - `DELETE /incidents/{id}` - Delete an incident
//! - `GET /users?page=&size=` - One page of user accounts
//! - `PATCH /users/{id}/role` - Change a user's role
//! - `DELETE /users/{id}` - Delete a user account
//!
//! Authenticated calls carry `Authorization: Bearer <token>`. The token is
//! never logged.

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::backend::{IncidentBackend, UserBackend};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::model::{
    Incident, LoginRequest, LoginResponse, NewIncident, Priority, PriorityUpdate, RoleUpdate,
    Status, StatusUpdate, User,
};
use crate::role_gate::Role;
use crate::session::Session;

/// Client for the backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    /// Create a client from configuration. A configured token becomes the
    /// initial session.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session: config.token.clone().map(Session::from_token),
        })
    }

    /// Create a client with a custom base URL and default settings (for testing).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Exchange credentials for a session.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let request = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                username: username.trim().to_string(),
                password: password.to_string(),
            });
        let response: LoginResponse = self.send_json(request).await?;
        let session = Session::from_token(response.token);

        info!(role = ?session.role(), "Logged in");
        Ok(session)
    }

    /// Submit a new incident after validating it locally.
    #[instrument(skip(self, incident), fields(category = %incident.category))]
    pub async fn report_incident(&self, incident: &NewIncident) -> Result<Incident, ClientError> {
        incident.validate()?;

        let request = self.authorized(self.client.post(self.url("/incidents")).json(incident));
        let created: Incident = self.send_json(request).await?;

        info!(id = created.id, "Incident reported");
        Ok(created)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session {
            Some(session) => request.bearer_auth(session.token()),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Backend request failed");
            ClientError::from(e)
        })?;

        let status = response.status();
        debug!(%status, "Backend responded");
        response.error_for_status().map_err(|e| {
            warn!(%status, "Backend rejected request");
            ClientError::from(e)
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Unknown(format!("malformed response body: {e}")))
    }

    async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        self.send(request).await.map(|_| ())
    }

    fn page_request(&self, path: &str, page: u32, page_size: u32) -> reqwest::RequestBuilder {
        self.authorized(
            self.client
                .get(self.url(path))
                .query(&[("page", page), ("size", page_size)]),
        )
    }
}

impl IncidentBackend for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_incidents_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Incident>, ClientError> {
        let incidents: Vec<Incident> = self
            .send_json(self.page_request("/incidents", page, page_size))
            .await?;
        debug!(count = incidents.len(), "Incidents page fetched");
        Ok(incidents)
    }

    #[instrument(skip(self))]
    async fn update_incident_status(&self, id: i64, status: Status) -> Result<Incident, ClientError> {
        let request = self.authorized(
            self.client
                .patch(self.url(&format!("/incidents/{id}/status")))
                .json(&StatusUpdate { status }),
        );
        let updated: Incident = self.send_json(request).await?;
        info!(id, status = %updated.status, "Incident status changed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn update_incident_priority(
        &self,
        id: i64,
        priority: Priority,
    ) -> Result<Incident, ClientError> {
        let request = self.authorized(
            self.client
                .patch(self.url(&format!("/incidents/{id}/priority")))
                .json(&PriorityUpdate { priority }),
        );
        let updated: Incident = self.send_json(request).await?;
        info!(id, priority = %updated.priority, "Incident priority changed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_incident(&self, id: i64) -> Result<(), ClientError> {
        let request = self.authorized(self.client.delete(self.url(&format!("/incidents/{id}"))));
        self.send_empty(request).await?;
        info!(id, "Incident deleted");
        Ok(())
    }
}

impl UserBackend for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_users_page(&self, page: u32, page_size: u32) -> Result<Vec<User>, ClientError> {
        let users: Vec<User> = self
            .send_json(self.page_request("/users", page, page_size))
            .await?;
        debug!(count = users.len(), "Users page fetched");
        Ok(users)
    }

    #[instrument(skip(self))]
    async fn update_user_role(&self, id: i64, role: Role) -> Result<User, ClientError> {
        let request = self.authorized(
            self.client
                .patch(self.url(&format!("/users/{id}/role")))
                .json(&RoleUpdate { role }),
        );
        let updated: User = self.send_json(request).await?;
        info!(id, role = ?updated.role, "User role changed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> Result<(), ClientError> {
        let request = self.authorized(self.client.delete(self.url(&format!("/users/{id}"))));
        self.send_empty(request).await?;
        info!(id, "User deleted");
        Ok(())
    }
}
