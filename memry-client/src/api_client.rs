use crate::error::SyncError;
use memry_common::api::{
    CloudFilter, CloudLectureRecord, DeleteLectureResponse, ErrorMessage, HealthCheckResponse,
    ListFiltersResponse, ListLecturesResponse, LoginRequest, LoginResponse, LogoutResponse,
    PreferencesResponse, PutBlobResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    ResetPasswordResponse, SessionResponse, SetPreferencesRequest, UpsertLectureResponse,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use uuid::Uuid;

type Result<T> = std::result::Result<T, SyncError>;

fn transport(err: reqwest::Error) -> SyncError {
    SyncError::Remote(err.to_string())
}

async fn handle_response_error(res: Response) -> Result<Response> {
    let status = res.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::NotAuthenticated);
    }

    if !status.is_success() {
        let reason = res
            .json::<ErrorMessage>()
            .await
            .map(|x| x.reason)
            .unwrap_or_else(|_| format!("status {status}"));
        return Err(SyncError::Remote(reason));
    }

    Ok(res)
}

pub async fn health_check(address: &str) -> Result<HealthCheckResponse> {
    let url = format!("{address}/");
    let res = reqwest::get(url).await.map_err(transport)?;
    let res = handle_response_error(res).await?;

    let res = res.json::<HealthCheckResponse>().await.map_err(transport)?;
    Ok(res)
}

pub async fn register(address: &str, email: &str, password: &str) -> Result<RegisterResponse> {
    let url = format!("{address}/register");
    let res = reqwest::Client::new()
        .post(&url)
        .json(&RegisterRequest {
            email: email.into(),
            password: password.into(),
        })
        .send()
        .await
        .map_err(transport)?;
    let res = handle_response_error(res).await?;
    let res = res.json::<RegisterResponse>().await.map_err(transport)?;
    Ok(res)
}

pub async fn login(address: &str, email: &str, password: &str) -> Result<LoginResponse> {
    let url = format!("{address}/login");
    let res = reqwest::Client::new()
        .post(&url)
        .json(&LoginRequest {
            email: email.into(),
            password: password.into(),
        })
        .send()
        .await
        .map_err(transport)?;
    let res = handle_response_error(res).await?;
    let res = res.json::<LoginResponse>().await.map_err(transport)?;
    Ok(res)
}

pub async fn reset_password(address: &str, email: &str) -> Result<ResetPasswordResponse> {
    let url = format!("{address}/reset-password");
    let res = reqwest::Client::new()
        .post(&url)
        .json(&ResetPasswordRequest {
            email: email.into(),
        })
        .send()
        .await
        .map_err(transport)?;
    let res = handle_response_error(res).await?;
    let res = res
        .json::<ResetPasswordResponse>()
        .await
        .map_err(transport)?;
    Ok(res)
}

/// Remote client carrying the session token of a signed-in device.
pub struct AuthClient {
    address: String,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(address: &str, session: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&format!("Token {session}"))
            .map_err(|_| SyncError::NotAuthenticated)?;
        headers.insert(AUTHORIZATION, token);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(transport)?;

        Ok(Self {
            address: address.into(),
            client,
        })
    }

    /// Validate the session token against the backend. 401 means the
    /// session is no longer valid.
    pub async fn get_session(&self) -> Result<SessionResponse> {
        let url = format!("{}/session", self.address);
        let res = self.client.get(&url).send().await.map_err(transport)?;
        let res = handle_response_error(res).await?;
        let res = res.json::<SessionResponse>().await.map_err(transport)?;
        Ok(res)
    }

    pub async fn logout(&self) -> Result<LogoutResponse> {
        let url = format!("{}/logout", self.address);
        let res = self.client.post(&url).send().await.map_err(transport)?;
        let res = handle_response_error(res).await?;
        let res = res.json::<LogoutResponse>().await.map_err(transport)?;
        Ok(res)
    }

    pub async fn list_lectures(&self) -> Result<Vec<CloudLectureRecord>> {
        let url = format!("{}/lectures", self.address);
        let res = self.client.get(&url).send().await.map_err(transport)?;
        let res = handle_response_error(res).await?;
        let res = res.json::<ListLecturesResponse>().await.map_err(transport)?;
        Ok(res.lectures)
    }

    /// Lectures of this user with an exactly matching title. Used for the
    /// duplicate check before an upsert commits.
    pub async fn find_lectures_by_title(&self, title: &str) -> Result<Vec<CloudLectureRecord>> {
        let url = format!("{}/lectures/search", self.address);
        let res = self
            .client
            .get(&url)
            .query(&[("title", title)])
            .send()
            .await
            .map_err(transport)?;
        let res = handle_response_error(res).await?;
        let res = res.json::<ListLecturesResponse>().await.map_err(transport)?;
        Ok(res.lectures)
    }

    /// Whole-row replace keyed by id.
    pub async fn upsert_lecture(&self, record: &CloudLectureRecord) -> Result<()> {
        let url = format!("{}/lectures", self.address);
        let res = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(transport)?;
        let res = handle_response_error(res).await?;
        res.json::<UpsertLectureResponse>()
            .await
            .map_err(transport)?;
        Ok(())
    }

    pub async fn delete_lecture(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/lectures/{id}", self.address);
        let res = self.client.delete(&url).send().await.map_err(transport)?;
        let res = handle_response_error(res).await?;
        res.json::<DeleteLectureResponse>()
            .await
            .map_err(transport)?;
        Ok(())
    }

    pub async fn list_filters(&self) -> Result<Vec<CloudFilter>> {
        let url = format!("{}/filters", self.address);
        let res = self.client.get(&url).send().await.map_err(transport)?;
        let res = handle_response_error(res).await?;
        let res = res.json::<ListFiltersResponse>().await.map_err(transport)?;
        Ok(res.filters)
    }

    pub async fn get_preferences(&self) -> Result<Value> {
        let url = format!("{}/preferences", self.address);
        let res = self.client.get(&url).send().await.map_err(transport)?;
        let res = handle_response_error(res).await?;
        let res = res.json::<PreferencesResponse>().await.map_err(transport)?;
        Ok(res.preferences)
    }

    pub async fn set_preferences(&self, preferences: &Value) -> Result<()> {
        let url = format!("{}/preferences", self.address);
        let res = self
            .client
            .put(&url)
            .json(&SetPreferencesRequest {
                preferences: preferences.clone(),
            })
            .send()
            .await
            .map_err(transport)?;
        handle_response_error(res).await?;
        Ok(())
    }

    /// Store a blob under a caller-chosen key and return its public URL.
    /// Re-putting the same key overwrites the object.
    pub async fn put_blob(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = format!("{}/blobs/{key}", self.address);
        let res = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(transport)?;
        let res = handle_response_error(res).await?;
        let res = res.json::<PutBlobResponse>().await.map_err(transport)?;
        Ok(res.url)
    }
}
