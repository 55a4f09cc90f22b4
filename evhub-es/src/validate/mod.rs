//! Draft validation engine
//!
//! Evaluates the full rule set against an [`EventDraft`] in one pass and
//! reports every violation together, so the submitter can fix the whole
//! form in a single edit round. Nothing is uploaded or persisted until a
//! draft passes this gate.
//!
//! Rule classes:
//! 1. **Presence**: required scalar fields and required assets
//! 2. **Format**: email shape, URL shape, closed sets (event type, country)
//! 3. **Ordering**: four (start, end) date pairs must not end before they start
//! 4. **Conditional**: attribution is required exactly when image rights
//!    are not owned, re-evaluated here regardless of what the client hid

pub mod format;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::country::is_valid_country;
use crate::models::{Attribution, EventDraft, EventType, ValidatedDraft};

/// Kind of rule a field violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// Required field absent or blank
    MissingField,
    /// Value present but malformed (email, URL, closed set)
    InvalidFormat,
    /// Date range ends before it starts
    InvalidOrdering,
    /// Required file attachment absent
    MissingAsset,
}

/// One rule violation on one field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub kind: Violation,
    pub message: String,
}

/// Every violation found in a single validation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn push(&mut self, field: &str, kind: Violation, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            kind,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First error recorded for `field`, if any
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|e| e.field.as_str()).collect();
        write!(
            f,
            "{} field(s) failed validation: {}",
            self.0.len(),
            fields.join(", ")
        )
    }
}

/// Validate a draft against the full rule set
///
/// Checks never short-circuit: every rule runs and every violation is
/// recorded before the outcome is decided. On success the draft's required
/// fields are unwrapped into a [`ValidatedDraft`].
pub fn validate(draft: EventDraft) -> Result<ValidatedDraft, FieldErrors> {
    let mut errors = FieldErrors::default();

    // Presence: required scalars
    let title = require_text(&mut errors, "title", &draft.title, "This field is required");
    let contact_email = require_text(
        &mut errors,
        "contact_email",
        &draft.contact_email,
        "A valid email is required",
    );
    let address1 = require_text(&mut errors, "address1", &draft.address1, "This field is required");
    let city = require_text(&mut errors, "city", &draft.city, "This field is required");
    let state_province = require_text(
        &mut errors,
        "state_province",
        &draft.state_province,
        "This field is required",
    );
    let postal_code = require_text(
        &mut errors,
        "postal_code",
        &draft.postal_code,
        "This field is required",
    );
    let registration_url = require_text(
        &mut errors,
        "registration_url",
        &draft.registration_url,
        "A valid url is required",
    );

    let start_date = require_date(&mut errors, "start_date", &draft.start_date);
    let end_date = require_date(&mut errors, "end_date", &draft.end_date);
    let registration_start_date =
        require_date(&mut errors, "registration_start_date", &draft.registration_start_date);
    let registration_end_date =
        require_date(&mut errors, "registration_end_date", &draft.registration_end_date);

    // Format: email and URL shapes
    if let Some(email) = contact_email.as_deref() {
        if !format::is_valid_email(email) {
            errors.push(
                "contact_email",
                Violation::InvalidFormat,
                "A valid email is required",
            );
        }
    }
    if let Some(url) = registration_url.as_deref() {
        if !format::is_valid_url(url) {
            errors.push(
                "registration_url",
                Violation::InvalidFormat,
                "A valid url is required",
            );
        }
    }
    let website = non_empty(&draft.website);
    if let Some(url) = website.as_deref() {
        if !format::is_valid_url(url) {
            errors.push("website", Violation::InvalidFormat, "Enter correct url!");
        }
    }

    // Format: closed sets
    let event_type = match non_empty(&draft.event_type) {
        None => {
            errors.push("event_type", Violation::MissingField, "Select a Event");
            None
        }
        Some(raw) => match raw.parse::<EventType>() {
            Ok(t) => Some(t),
            Err(()) => {
                errors.push("event_type", Violation::InvalidFormat, "Unknown event type");
                None
            }
        },
    };
    let country = match non_empty(&draft.country) {
        None => {
            errors.push("country", Violation::MissingField, "This field is required");
            None
        }
        Some(raw) => {
            let code = raw.to_ascii_uppercase();
            if is_valid_country(&code) {
                Some(code)
            } else {
                errors.push(
                    "country",
                    Violation::InvalidFormat,
                    "Must be an ISO 3166-1 alpha-2 country code",
                );
                None
            }
        }
    };

    // Ordering: all four (start, end) pairs, checked only when both ends exist
    check_ordering(&mut errors, "start_date", &start_date, "end_date", &end_date);
    check_ordering(
        &mut errors,
        "registration_start_date",
        &registration_start_date,
        "registration_end_date",
        &registration_end_date,
    );
    check_ordering(
        &mut errors,
        "speaker_call_start_date",
        &draft.speaker_call_start_date,
        "speaker_call_end_date",
        &draft.speaker_call_end_date,
    );
    check_ordering(
        &mut errors,
        "sponsor_call_start_date",
        &draft.sponsor_call_start_date,
        "sponsor_call_end_date",
        &draft.sponsor_call_end_date,
    );

    // Conditional: attribution required exactly when rights are not owned
    let banner_attribution = check_attribution(
        &mut errors,
        draft.banner_rights,
        &draft.banner_img_attribution_text,
        &draft.banner_img_attribution_link,
        "banner_img_attribution_text",
        "banner_img_attribution_link",
    );
    let preview_attribution = check_attribution(
        &mut errors,
        draft.preview_rights,
        &draft.preview_img_attribution_text,
        &draft.preview_img_attribution_link,
        "preview_img_attribution_text",
        "preview_img_attribution_link",
    );

    // Optional scalars pass through normalized
    let tagline = non_empty(&draft.tagline);
    let timezone = non_empty(&draft.timezone);
    let twitter = non_empty(&draft.twitter);
    let hashtag = non_empty(&draft.hashtag);
    let location = non_empty(&draft.location);
    let address2 = non_empty(&draft.address2);
    let sessionize_key = non_empty(&draft.sessionize_key);

    let banner_rights = draft.banner_rights;
    let preview_rights = draft.preview_rights;
    let speaker_call_start_date = draft.speaker_call_start_date;
    let speaker_call_end_date = draft.speaker_call_end_date;
    let sponsor_call_start_date = draft.sponsor_call_start_date;
    let sponsor_call_end_date = draft.sponsor_call_end_date;

    // Presence: required assets
    let EventDraft {
        banner,
        preview,
        sponsor_prospectus,
        ..
    } = draft;
    let banner = match banner {
        Some(asset) => Some(asset),
        None => {
            errors.push("banner", Violation::MissingAsset, "Banner image is required");
            None
        }
    };
    let preview = match preview {
        Some(asset) => Some(asset),
        None => {
            errors.push("preview", Violation::MissingAsset, "Preview image is required");
            None
        }
    };

    // All rules have run; decide the outcome
    let (
        Some(title),
        Some(contact_email),
        Some(event_type),
        Some(address1),
        Some(city),
        Some(state_province),
        Some(postal_code),
        Some(country),
        Some(registration_url),
        Some(start_date),
        Some(end_date),
        Some(registration_start_date),
        Some(registration_end_date),
        Some(banner),
        Some(preview),
    ) = (
        title,
        contact_email,
        event_type,
        address1,
        city,
        state_province,
        postal_code,
        country,
        registration_url,
        start_date,
        end_date,
        registration_start_date,
        registration_end_date,
        banner,
        preview,
    )
    else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedDraft {
        title,
        tagline,
        timezone,
        start_date,
        end_date,
        twitter,
        hashtag,
        website,
        contact_email,
        event_type,
        location,
        address1,
        address2,
        city,
        state_province,
        postal_code,
        country,
        registration_url,
        registration_start_date,
        registration_end_date,
        sessionize_key,
        speaker_call_start_date,
        speaker_call_end_date,
        sponsor_call_start_date,
        sponsor_call_end_date,
        banner_rights,
        banner_attribution,
        preview_rights,
        preview_attribution,
        banner,
        preview,
        sponsor_prospectus,
    })
}

/// Trimmed value of an optional text field, with blank treated as absent
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn require_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &Option<String>,
    message: &str,
) -> Option<String> {
    let value = non_empty(value);
    if value.is_none() {
        errors.push(field, Violation::MissingField, message);
    }
    value
}

fn require_date(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    if value.is_none() {
        errors.push(field, Violation::MissingField, "This field is required");
    }
    *value
}

fn check_ordering(
    errors: &mut FieldErrors,
    start_field: &'static str,
    start: &Option<DateTime<Utc>>,
    end_field: &'static str,
    end: &Option<DateTime<Utc>>,
) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.push(
                end_field,
                Violation::InvalidOrdering,
                format!("Must be on or after {}", start_field),
            );
        }
    }
}

/// Attribution handling for one image slot
///
/// Rights owned: attribution is neither required nor carried forward.
/// Rights not owned: text and a well-formed link are both required.
fn check_attribution(
    errors: &mut FieldErrors,
    rights_owned: bool,
    text: &Option<String>,
    link: &Option<String>,
    text_field: &'static str,
    link_field: &'static str,
) -> Option<Attribution> {
    if rights_owned {
        return None;
    }

    let text = require_text(errors, text_field, text, "This field is required");
    let link = require_text(errors, link_field, link, "A valid url is required");
    let link = link.filter(|url| {
        if format::is_valid_url(url) {
            true
        } else {
            errors.push(link_field, Violation::InvalidFormat, "A valid url is required");
            false
        }
    });

    match (text, link) {
        (Some(text), Some(link)) => Some(Attribution { text, link }),
        _ => None,
    }
}
