//! Typed calls against the ticketing admin backend.
//!
//! Every data call goes through `AuthFetch`, so a 401 anywhere here triggers
//! the redirect handler. Login is the exception: it talks to the auth
//! endpoint directly because a rejected password is not an expired session.

use chrono::Utc;
use reqwest::header;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Role, SessionData};
use crate::models::{
    NewOrganizer, NewParticipant, NewUser, Organizer, Participant, Transaction, User,
};

use super::fetch::{AuthFetch, FetchOptions};
use super::ApiError;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    id: String,
    email: String,
    role: Role,
    organizer_id: Option<String>,
}

/// Counts for the dashboard landing view. A `None` means that widget's
/// fetch failed; the others are unaffected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub organizers: Option<usize>,
    pub participants: Option<usize>,
    pub users: Option<usize>,
}

/// Clone is cheap - it wraps an `AuthFetch`.
#[derive(Clone)]
pub struct DashboardClient {
    fetch: AuthFetch,
}

impl DashboardClient {
    pub fn new(fetch: AuthFetch) -> Self {
        Self { fetch }
    }

    pub fn fetch(&self) -> &AuthFetch {
        &self.fetch
    }

    /// Authenticate and record the token in both the credential store and
    /// the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionData, ApiError> {
        let url = self.fetch.resolve_url("/auth/login");

        let response = self
            .fetch
            .client()
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;

        let data = SessionData {
            token: login.token,
            user_id: login.user.id,
            email: login.user.email,
            role: login.user.role,
            organizer_id: login.user.organizer_id,
            created_at: Utc::now(),
        };

        // Store only after the session is saved
        self.fetch.session().sign_in(data.clone()).await?;
        self.fetch.store().set(&data.token);

        info!(email = %data.email, role = data.role.display_name(), "Login successful");
        Ok(data)
    }

    /// Drop the local credential and end the session.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.fetch.store().clear();
        self.fetch.session().sign_out().await?;
        Ok(())
    }

    /// Absolute URL for `segments` under the base URL, each segment
    /// percent-encoded so an id cannot change which endpoint is hit.
    fn resource_url(&self, segments: &[&str]) -> Result<String, ApiError> {
        let mut url = Url::parse(&self.fetch.resolve_url("/"))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.fetch.base_url(), e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{} cannot have a path", self.fetch.base_url())))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch
            .get(path)
            .await
            .error_for_status()
            .await?
            .json()
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let options = FetchOptions::post()
            .json(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;

        self.fetch
            .fetch(path, options)
            .await
            .error_for_status()
            .await?
            .json()
            .await
    }

    // ===== Organizers =====

    pub async fn organizers(&self) -> Result<Vec<Organizer>, ApiError> {
        self.get("/organizers").await
    }

    pub async fn organizer(&self, id: &str) -> Result<Organizer, ApiError> {
        let url = self.resource_url(&["organizers", id])?;
        self.get(&url).await
    }

    pub async fn register_organizer(&self, organizer: &NewOrganizer) -> Result<Organizer, ApiError> {
        let created: Organizer = self.post("/organizers", organizer).await?;
        info!(id = %created.id, "Organizer registered");
        Ok(created)
    }

    // ===== Participants =====

    /// All participants, or only those of one organizer
    pub async fn participants(&self, organizer_id: Option<&str>) -> Result<Vec<Participant>, ApiError> {
        match organizer_id {
            Some(id) => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("organizerId", id)
                    .finish();
                self.get(&format!("/participants?{}", query)).await
            }
            None => self.get("/participants").await,
        }
    }

    pub async fn register_participant(&self, participant: &NewParticipant) -> Result<Participant, ApiError> {
        let created: Participant = self.post("/participants", participant).await?;
        info!(id = %created.id, "Participant registered");
        Ok(created)
    }

    // ===== Users =====

    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/users").await
    }

    pub async fn register_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let created: User = self.post("/users", user).await?;
        info!(id = %created.id, "User registered");
        Ok(created)
    }

    // ===== Transactions =====

    pub async fn transactions(&self, organizer_id: &str) -> Result<Vec<Transaction>, ApiError> {
        let url = self.resource_url(&["organizers", organizer_id, "transactions"])?;
        self.get(&url).await
    }

    // ===== Dashboard =====

    /// Fetch the landing-view counts concurrently. Each count succeeds or
    /// fails on its own.
    pub async fn summary(&self) -> DashboardSummary {
        let (organizers, participants, users) =
            futures::join!(self.organizers(), self.participants(None), self.users());

        DashboardSummary {
            organizers: Self::count("organizers", organizers),
            participants: Self::count("participants", participants),
            users: Self::count("users", users),
        }
    }

    fn count<T>(widget: &str, result: Result<Vec<T>, ApiError>) -> Option<usize> {
        match result {
            Ok(items) => {
                debug!(widget, count = items.len(), "Widget loaded");
                Some(items.len())
            }
            Err(e) => {
                warn!(widget, error = %e, "Widget failed to load");
                None
            }
        }
    }
}
