use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorMessage {
    pub reason: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    /// Gate for privileged features. Independent of having a valid session.
    pub authorized: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RegisterResponse {
    pub session: String,
    pub user: UserResponse,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LoginResponse {
    pub session: String,
    pub user: UserResponse,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LogoutResponse {
    pub ok: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ResetPasswordResponse {
    pub ok: bool,
}

/// Canonical remote row for a lecture. The snake_case field names are the
/// wire contract with the backend; do not rename without a migration on the
/// remote side.
///
/// `transcript` holds the plain text while `segments`, `flashcards`, `quiz`,
/// `journey_map` and `chat_history` are JSON strings. The client parses them
/// into typed structures at the boundary.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CloudLectureRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub duration: i64,
    /// Category tags joined with ","
    pub category: String,
    pub is_favorite: bool,
    pub transcript: String,
    pub segments: String,
    pub summary: String,
    pub flashcards: String,
    pub quiz: String,
    pub notes: String,
    pub journey_map: String,
    pub chat_history: String,
    pub audio_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ListLecturesResponse {
    pub lectures: Vec<CloudLectureRecord>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct UpsertLectureResponse {
    pub ok: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct DeleteLectureResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CloudFilter {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub position: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ListFiltersResponse {
    pub filters: Vec<CloudFilter>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PreferencesResponse {
    pub preferences: Value,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SetPreferencesRequest {
    pub preferences: Value,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PutBlobResponse {
    /// Public, durable URL of the stored object.
    pub url: String,
}
