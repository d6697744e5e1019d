//! HTTP client for the appointment REST backend.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::types::ClientPage;
use super::AppointmentBackend;
use crate::models::{
    AccountUpdate, Appointment, AppointmentDraft, AppointmentPatch, JwtResponse, ListQuery,
    UserAccount, UserLogin, UserRegister,
};
use crate::session::SessionStore;

/// REST client with bearer-token auth.
///
/// Health, register and login are public; everything else carries the
/// token. A 401 from any call drops the token from memory and from the
/// session store.
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
    timeout_secs: u64,
    token: RwLock<Option<String>>,
    session: Option<SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url.trim()).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs,
            token: RwLock::new(None),
            session: None,
        })
    }

    /// Persist the token to `store` on login and drop it on 401/logout.
    pub fn with_session(mut self, store: SessionStore) -> Self {
        self.session = Some(store);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Token handling ──────────────────────────────────────

    /// Load a previously saved token. Returns true when one was found.
    pub fn restore_session(&self) -> bool {
        let Some(store) = &self.session else {
            return false;
        };
        match store.load() {
            Ok(Some(token)) => {
                self.set_token(token);
                tracing::info!("Restored saved session");
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable session file");
                false
            }
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Forget the token in memory and on disk.
    pub fn clear_token(&self) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        drop(guard);
        if let Some(store) = &self.session {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "Failed to remove saved session");
            }
        }
    }

    fn bearer(&self) -> Result<String, ApiError> {
        let guard = self.token.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(ApiError::MissingToken)
    }

    // ── Request plumbing ────────────────────────────────────

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn public(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.endpoint(segments)?))
    }

    fn protected(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let token = self.bearer()?;
        Ok(self.public(method, segments)?.bearer_auth(token))
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_transport(e, self.base_url.as_str(), self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, body);
        if matches!(err, ApiError::Unauthorized) {
            tracing::warn!("Backend rejected the session token");
            self.clear_token();
        } else {
            tracing::warn!(status = status.as_u16(), error = %err, "Backend request failed");
        }
        Err(err)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.dispatch(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::ResponseParsing(e.to_string()))
    }

    // ── Public endpoints ────────────────────────────────────

    /// `GET /`: plain-text liveness check.
    pub async fn health(&self) -> Result<String, ApiError> {
        let response = self.dispatch(self.public(Method::GET, &[])?).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::ResponseParsing(e.to_string()))
    }

    pub async fn register(&self, user: &UserRegister) -> Result<UserAccount, ApiError> {
        let request = self.public(Method::POST, &["register"])?.json(user);
        self.fetch_json(request).await
    }

    /// Log in and keep the returned token for subsequent calls.
    pub async fn login(&self, credentials: &UserLogin) -> Result<(), ApiError> {
        let request = self.public(Method::POST, &["login"])?.json(credentials);
        let jwt: JwtResponse = self.fetch_json(request).await?;
        if let Some(store) = &self.session {
            if let Err(e) = store.save(&jwt.token) {
                tracing::warn!(error = %e, "Logged in but could not save session");
            }
        }
        self.set_token(jwt.token);
        tracing::info!(email = %credentials.email, "Logged in");
        Ok(())
    }

    pub fn logout(&self) {
        self.clear_token();
        tracing::info!("Logged out");
    }

    // ── Protected endpoints ─────────────────────────────────

    pub async fn account(&self) -> Result<UserAccount, ApiError> {
        let request = self.protected(Method::GET, &["user", "account"])?;
        self.fetch_json(request).await
    }

    pub async fn update_account(&self, update: &AccountUpdate) -> Result<UserAccount, ApiError> {
        let request = self.protected(Method::PUT, &["user", "account"])?.json(update);
        let account: UserAccount = self.fetch_json(request).await?;
        tracing::info!(email = %account.email, "Account updated");
        Ok(account)
    }

    /// Delete the account. The session ends with it.
    pub async fn delete_account(&self) -> Result<(), ApiError> {
        let request = self.protected(Method::DELETE, &["user", "account"])?;
        self.dispatch(request).await?;
        self.clear_token();
        tracing::info!("Account deleted");
        Ok(())
    }
}

impl AppointmentBackend for ApiClient {
    async fn list(&self, query: &ListQuery) -> Result<ClientPage, ApiError> {
        let request = self.protected(Method::GET, &["clients", ""])?.query(query);
        self.fetch_json(request).await
    }

    async fn get(&self, id: &str) -> Result<Appointment, ApiError> {
        let request = self.protected(Method::GET, &["clients", id])?;
        self.fetch_json(request).await
    }

    async fn create(&self, draft: &AppointmentDraft) -> Result<Appointment, ApiError> {
        let request = self.protected(Method::POST, &["clients", "add"])?.json(draft);
        self.fetch_json(request).await
    }

    async fn update(&self, id: &str, patch: &AppointmentPatch) -> Result<Appointment, ApiError> {
        let request = self.protected(Method::PUT, &["clients", id])?.json(patch);
        self.fetch_json(request).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let request = self.protected(Method::DELETE, &["clients", id])?;
        self.dispatch(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    const TOKEN: &str = "test-token";

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn authorized(headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {TOKEN}");
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some(expected.as_str())
    }

    fn record(id: &str) -> Value {
        json!({
            "uuid": id,
            "name": "Anna",
            "lastname": "Nowak",
            "telephone": "600700800",
            "title": "Visit",
            "description": "",
            "time_from": "2024-01-01T09:00:00",
            "time_to": "2024-01-01T10:00:00",
            "added_description": null
        })
    }

    fn account_json() -> Value {
        json!({ "uuid": "u1", "name": "Ola", "lastname": "Lis", "email": "ola@lis.pl" })
    }

    fn backend() -> Router {
        Router::new()
            .route("/", get(|| async { "Hello from API" }))
            .route(
                "/login",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "secret1" {
                        Ok(Json(json!({ "token": TOKEN })))
                    } else {
                        Err(StatusCode::UNAUTHORIZED)
                    }
                }),
            )
            .route(
                "/clients/",
                get(|headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    let mut rec = record("a1");
                    rec["description"] = json!(format!(
                        "{}|{}|{}|{}",
                        q.get("from").cloned().unwrap_or_default(),
                        q.get("to").cloned().unwrap_or_default(),
                        q.get("page").cloned().unwrap_or_default(),
                        q.get("per_page").cloned().unwrap_or_default(),
                    ));
                    Ok(Json(json!({
                        "clients": [rec],
                        "pagination": { "total": 1, "total_pages": 1 }
                    })))
                }),
            )
            .route(
                "/clients/add",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return Err((StatusCode::UNAUTHORIZED, String::new()));
                    }
                    if body["time_from"] == "2024-01-01T09:30:00" {
                        return Err((StatusCode::CONFLICT, "overlapping appointment".into()));
                    }
                    let mut rec = body;
                    rec["uuid"] = json!("new-1");
                    Ok(Json(rec))
                }),
            )
            .route(
                "/clients/:id",
                get(|headers: HeaderMap, Path(id): Path<String>| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    if id == "a1" {
                        Ok(Json(record("a1")))
                    } else {
                        Err(StatusCode::NOT_FOUND)
                    }
                })
                .put(|Path(id): Path<String>, Json(patch): Json<Value>| async move {
                    let mut rec = record(&id);
                    if let Some(obj) = patch.as_object() {
                        for (k, v) in obj {
                            rec[k] = v.clone();
                        }
                    }
                    Json(rec)
                })
                .delete(|| async { StatusCode::NO_CONTENT }),
            )
            .route(
                "/user/account",
                get(|headers: HeaderMap| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(account_json()))
                })
                .put(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    if body.get("password").is_some() || body.get("lastname").is_some() {
                        return Err(StatusCode::UNPROCESSABLE_ENTITY);
                    }
                    let mut account = account_json();
                    if let Some(obj) = body.as_object() {
                        for (k, v) in obj {
                            account[k] = v.clone();
                        }
                    }
                    Ok(Json(account))
                })
                .delete(|headers: HeaderMap| async move {
                    if authorized(&headers) {
                        StatusCode::NO_CONTENT
                    } else {
                        StatusCode::UNAUTHORIZED
                    }
                }),
            )
    }

    async fn logged_in() -> ApiClient {
        let client = ApiClient::new(&spawn(backend()).await, 5).unwrap();
        client.set_token(TOKEN);
        client
    }

    fn login(password: &str) -> UserLogin {
        UserLogin {
            email: "ola@lis.pl".into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn health_check_returns_text() {
        let client = ApiClient::new(&spawn(backend()).await, 5).unwrap();
        assert_eq!(client.health().await.unwrap(), "Hello from API");
    }

    #[tokio::test]
    async fn login_stores_and_persists_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let client = ApiClient::new(&spawn(backend()).await, 5)
            .unwrap()
            .with_session(store.clone());

        client.login(&login("secret1")).await.unwrap();
        assert!(client.has_token());
        assert_eq!(store.load().unwrap().as_deref(), Some(TOKEN));

        let account = client.account().await.unwrap();
        assert_eq!(account.email, "ola@lis.pl");
    }

    #[tokio::test]
    async fn update_account_sends_only_changed_fields() {
        let client = logged_in().await;
        let update = AccountUpdate {
            name: Some("Aleksandra".into()),
            email: Some("ola@lis.com".into()),
            ..Default::default()
        };
        let account = client.update_account(&update).await.unwrap();
        assert_eq!(account.name, "Aleksandra");
        assert_eq!(account.email, "ola@lis.com");
        assert_eq!(account.lastname, "Lis");
        assert!(client.has_token());
    }

    #[tokio::test]
    async fn delete_account_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let client = ApiClient::new(&spawn(backend()).await, 5)
            .unwrap()
            .with_session(store.clone());
        client.login(&login("secret1")).await.unwrap();

        client.delete_account().await.unwrap();
        assert!(!client.has_token());
        assert_eq!(store.load().unwrap(), None);
        assert!(matches!(
            client.delete_account().await,
            Err(ApiError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let client = ApiClient::new(&spawn(backend()).await, 5).unwrap();
        let err = client.login(&login("nope")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(!client.has_token());
    }

    #[tokio::test]
    async fn protected_call_without_token_fails_locally() {
        // Nothing listens here; a request would fail with a connection error.
        let client = ApiClient::new("http://127.0.0.1:9", 5).unwrap();
        let err = client.list(&ListQuery::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[tokio::test]
    async fn rejected_token_clears_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save("expired").unwrap();
        let client = ApiClient::new(&spawn(backend()).await, 5)
            .unwrap()
            .with_session(store.clone());
        assert!(client.restore_session());

        let err = client.list(&ListQuery::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(!client.has_token());
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn list_sends_range_and_paging() {
        let client = logged_in().await;
        let query = ListQuery {
            from: Some("2024-01-01T00:00:00".into()),
            to: Some("2024-01-07T23:59:59".into()),
            page: Some(2),
            per_page: Some(100),
            search: None,
        };
        let page = client.list(&query).await.unwrap();
        assert_eq!(page.clients.len(), 1);
        assert_eq!(
            page.clients[0].description,
            "2024-01-01T00:00:00|2024-01-07T23:59:59|2|100"
        );
    }

    #[tokio::test]
    async fn create_conflict_maps_to_conflict() {
        let client = logged_in().await;
        let mut draft = AppointmentDraft {
            first_name: "Jan".into(),
            last_name: "Kowalski".into(),
            phone: "123456789".into(),
            title: "Check-up".into(),
            description: String::new(),
            start_time: "2024-01-01T11:00:00".into(),
            end_time: "2024-01-01T12:00:00".into(),
            created_at: None,
            extra: Default::default(),
        };
        let created = client.create(&draft).await.unwrap();
        assert_eq!(created.id, "new-1");
        assert_eq!(created.start_time, "2024-01-01T11:00:00");

        draft.start_time = "2024-01-01T09:30:00".into();
        let err = client.create(&draft).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref body) if body == "overlapping appointment"));
    }

    #[tokio::test]
    async fn get_update_delete_round() {
        let client = logged_in().await;
        assert_eq!(client.get("a1").await.unwrap().id, "a1");
        assert!(matches!(client.get("zz").await, Err(ApiError::NotFound(_))));

        let patch = AppointmentPatch {
            title: Some("Follow-up".into()),
            ..Default::default()
        };
        let updated = client.update("a1", &patch).await.unwrap();
        assert_eq!(updated.title, "Follow-up");

        client.delete("a1").await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_backend_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(&format!("http://{addr}"), 5).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Connection(_)));
    }

    #[test]
    fn endpoints_encode_ids_and_keep_base_path() {
        let client = ApiClient::new("http://localhost:8080/api/", 5).unwrap();
        let url = client.endpoint(&["clients", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/clients/a%20b%2Fc");
        let list = client.endpoint(&["clients", ""]).unwrap();
        assert_eq!(list.as_str(), "http://localhost:8080/api/clients/");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", 5),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
