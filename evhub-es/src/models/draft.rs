//! Event draft as submitted by the client, plus its validated form
//!
//! An [`EventDraft`] is the raw, untrusted input: every field optional,
//! every value unchecked. Validation turns it into a [`ValidatedDraft`]
//! whose required fields are guaranteed present and well-formed. Only a
//! `ValidatedDraft` can enter the upload and composition stages.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event category selected from a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "In Person")]
    InPerson,
    Virtual,
    Hybrid,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::InPerson => "In Person",
            EventType::Virtual => "Virtual",
            EventType::Hybrid => "Hybrid",
        }
    }
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In Person" => Ok(EventType::InPerson),
            "Virtual" => Ok(EventType::Virtual),
            "Hybrid" => Ok(EventType::Hybrid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a persisted event record
///
/// Submission always writes `Draft`; later publishing workflows move the
/// record through the remaining statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Draft,
    Published,
    Archived,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "Draft",
            EventStatus::Published => "Published",
            EventStatus::Archived => "Archived",
        }
    }
}

impl FromStr for EventStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(EventStatus::Draft),
            "Published" => Ok(EventStatus::Published),
            "Archived" => Ok(EventStatus::Archived),
            _ => Err(()),
        }
    }
}

/// A file received from the client, held in memory until uploaded
#[derive(Clone)]
pub struct LocalAsset {
    /// File name as supplied by the client
    pub file_name: String,
    /// Declared media type, if the client sent one
    pub content_type: Option<String>,
    /// Raw file content
    pub bytes: Bytes,
}

impl LocalAsset {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// Manual Debug keeps file content out of logs
impl fmt::Debug for LocalAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAsset")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Attribution for an image the submitter does not own rights to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub text: String,
    pub link: String,
}

/// Raw event draft from the submission form
///
/// Scalar fields arrive as the `draft` JSON part of the multipart request;
/// asset fields are attached afterwards from the file parts and never
/// appear in the JSON itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDraft {
    pub title: Option<String>,
    pub tagline: Option<String>,
    pub timezone: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub twitter: Option<String>,
    pub hashtag: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub event_type: Option<String>,
    pub location: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub registration_url: Option<String>,
    pub registration_start_date: Option<DateTime<Utc>>,
    pub registration_end_date: Option<DateTime<Utc>>,
    pub sessionize_key: Option<String>,
    pub speaker_call_start_date: Option<DateTime<Utc>>,
    pub speaker_call_end_date: Option<DateTime<Utc>>,
    pub sponsor_call_start_date: Option<DateTime<Utc>>,
    pub sponsor_call_end_date: Option<DateTime<Utc>>,
    /// Submitter owns the rights to the banner image
    pub banner_rights: bool,
    pub banner_img_attribution_text: Option<String>,
    pub banner_img_attribution_link: Option<String>,
    /// Submitter owns the rights to the preview image
    pub preview_rights: bool,
    pub preview_img_attribution_text: Option<String>,
    pub preview_img_attribution_link: Option<String>,
    #[serde(skip)]
    pub banner: Option<LocalAsset>,
    #[serde(skip)]
    pub preview: Option<LocalAsset>,
    #[serde(skip)]
    pub sponsor_prospectus: Vec<LocalAsset>,
}

/// Draft that passed the validation gate
///
/// Required fields are unwrapped, closed sets are typed, and the
/// banner/preview assets are guaranteed present.
#[derive(Debug, Clone)]
pub struct ValidatedDraft {
    pub title: String,
    pub tagline: Option<String>,
    pub timezone: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub twitter: Option<String>,
    pub hashtag: Option<String>,
    pub website: Option<String>,
    pub contact_email: String,
    pub event_type: EventType,
    pub location: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_province: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 code, uppercased
    pub country: String,
    pub registration_url: String,
    pub registration_start_date: DateTime<Utc>,
    pub registration_end_date: DateTime<Utc>,
    pub sessionize_key: Option<String>,
    pub speaker_call_start_date: Option<DateTime<Utc>>,
    pub speaker_call_end_date: Option<DateTime<Utc>>,
    pub sponsor_call_start_date: Option<DateTime<Utc>>,
    pub sponsor_call_end_date: Option<DateTime<Utc>>,
    pub banner_rights: bool,
    /// Present exactly when `banner_rights` is false
    pub banner_attribution: Option<Attribution>,
    pub preview_rights: bool,
    /// Present exactly when `preview_rights` is false
    pub preview_attribution: Option<Attribution>,
    pub banner: LocalAsset,
    pub preview: LocalAsset,
    pub sponsor_prospectus: Vec<LocalAsset>,
}
