use eyre::{Context, Result};
use memry_common::api::CloudLectureRecord;
use serde::de::DeserializeOwned;
use time::macros::format_description;
use time::OffsetDateTime;
use uuid::Uuid;

/// Cloud `category` is the tags joined with this delimiter.
pub const CATEGORY_DELIMITER: &str = ",";

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptSegment {
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConceptNode {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConceptEdge {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

/// Concept map generated from the transcript, rendered by the whiteboard.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConceptGraph {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

/// Local mirror of a lecture. The cloud row keeps the structured fields as
/// JSON strings; here they are parsed, and malformed payloads are rejected
/// at the mapping boundary instead of flowing through as nulls.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Lecture {
    pub id: Uuid,
    /// None for legacy rows written before accounts existed.
    pub user_id: Option<Uuid>,
    pub title: String,
    /// Recording length in seconds.
    pub duration: i64,
    pub category_tags: Vec<String>,
    pub is_favorite: bool,
    pub transcript_text: String,
    pub segments: Vec<TranscriptSegment>,
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
    pub notes: String,
    pub concept_graph: ConceptGraph,
    pub chat_history: Vec<ChatMessage>,
    /// Durable remote reference once the recording is uploaded. Never a
    /// local filesystem path.
    pub audio_url: Option<String>,
    /// Recording on this device that has not reached blob storage yet.
    /// Stays local, never part of the cloud row.
    pub local_audio_path: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Lecture {
    pub fn new(title: String) -> Self {
        let id = Uuid::now_v7();
        let created_at = OffsetDateTime::now_utc();
        Self {
            id,
            user_id: None,
            title,
            duration: 0,
            category_tags: vec![],
            is_favorite: false,
            transcript_text: String::new(),
            segments: vec![],
            summary: String::new(),
            flashcards: vec![],
            quiz: vec![],
            notes: String::new(),
            concept_graph: ConceptGraph::default(),
            chat_history: vec![],
            audio_url: None,
            local_audio_path: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }

    /// Derived, non-authoritative projection of `created_at` for display.
    /// Not part of the cloud mapping.
    pub fn display_date(&self) -> String {
        let format = format_description!("[month repr:short] [day padding:none], [year]");
        self.created_at
            .format(&format)
            .unwrap_or_else(|_| self.created_at.to_string())
    }

    pub fn to_cloud(&self, user_id: Uuid) -> Result<CloudLectureRecord> {
        Ok(CloudLectureRecord {
            id: self.id,
            user_id,
            title: self.title.clone(),
            duration: self.duration,
            category: self.category_tags.join(CATEGORY_DELIMITER),
            is_favorite: self.is_favorite,
            transcript: self.transcript_text.clone(),
            segments: to_json(&self.segments)?,
            summary: self.summary.clone(),
            flashcards: to_json(&self.flashcards)?,
            quiz: to_json(&self.quiz)?,
            notes: self.notes.clone(),
            journey_map: to_json(&self.concept_graph)?,
            chat_history: to_json(&self.chat_history)?,
            audio_url: self.audio_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub fn from_cloud(record: &CloudLectureRecord) -> Result<Self> {
        Ok(Self {
            id: record.id,
            user_id: Some(record.user_id),
            title: record.title.clone(),
            duration: record.duration,
            category_tags: split_tags(&record.category),
            is_favorite: record.is_favorite,
            transcript_text: record.transcript.clone(),
            segments: from_json(&record.segments).wrap_err("Malformed segments payload")?,
            summary: record.summary.clone(),
            flashcards: from_json(&record.flashcards).wrap_err("Malformed flashcards payload")?,
            quiz: from_json(&record.quiz).wrap_err("Malformed quiz payload")?,
            notes: record.notes.clone(),
            concept_graph: from_json(&record.journey_map)
                .wrap_err("Malformed journey map payload")?,
            chat_history: from_json(&record.chat_history)
                .wrap_err("Malformed chat history payload")?,
            audio_url: record.audio_url.clone(),
            local_audio_path: None,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

fn split_tags(category: &str) -> Vec<String> {
    category
        .split(CATEGORY_DELIMITER)
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_string())
        .collect()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Rows written by older app versions carry empty strings in the structured
/// columns; those map to the empty default rather than a parse error.
pub(crate) fn from_json<T: DeserializeOwned + Default>(raw: &str) -> Result<T> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(raw)?)
}
