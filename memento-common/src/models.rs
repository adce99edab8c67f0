//! Event and contribution models
//!
//! The moderation state machine lives on [`ContributionStatus`]; the
//! "text never has a URL, media never has inline text" invariant is carried by
//! the [`Payload`] enum.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Maximum number of custom questions a host may configure
pub const MAX_CUSTOM_QUESTIONS: usize = 10;

/// Maximum event title length in characters
pub const MAX_TITLE_LENGTH: usize = 200;

// ============================================================================
// Events
// ============================================================================

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Active,
    Archived,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Active => "active",
            EventStatus::Archived => "archived",
        }
    }
}

impl FromStr for EventStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "active" => Ok(EventStatus::Active),
            "archived" => Ok(EventStatus::Archived),
            other => Err(Error::InvalidInput(format!("Unknown event status: {}", other))),
        }
    }
}

/// Per-event configuration
///
/// Persisted as JSON. Missing fields take the defaults below; ranges are
/// checked by [`EventSettings::validate`] whenever settings are read or written.
///
/// | field              | default |
/// |--------------------|---------|
/// | allow_video        | true    |
/// | allow_photo        | true    |
/// | allow_text         | true    |
/// | max_video_duration | 60 s    |
/// | max_photo_size_mb  | 5       |
/// | auto_approve       | false   |
/// | custom_questions   | empty   |
/// | share_expire_days  | 30      |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventSettings {
    pub allow_video: bool,
    pub allow_photo: bool,
    pub allow_text: bool,
    /// Maximum video length in seconds
    pub max_video_duration: u32,
    /// Target photo size after client-side compression (advisory, never rejected)
    pub max_photo_size_mb: u32,
    /// New contributions start as approved instead of pending
    pub auto_approve: bool,
    /// Prompts guests may answer alongside their contribution
    pub custom_questions: Vec<String>,
    /// Days after the event date that the public share gallery stays open
    pub share_expire_days: u32,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            allow_video: true,
            allow_photo: true,
            allow_text: true,
            max_video_duration: 60,
            max_photo_size_mb: 5,
            auto_approve: false,
            custom_questions: Vec::new(),
            share_expire_days: 30,
        }
    }
}

impl EventSettings {
    /// Parse settings from their stored JSON form and validate them
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: EventSettings = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("Malformed event settings: {}", e)))?;
        settings.validate()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize settings: {}", e)))
    }

    /// Check ranges and normalize custom questions (trimmed)
    pub fn validate(mut self) -> Result<Self> {
        if !(1..=600).contains(&self.max_video_duration) {
            return Err(Error::InvalidInput(format!(
                "maxVideoDuration must be between 1 and 600 seconds, got {}",
                self.max_video_duration
            )));
        }
        if !(1..=50).contains(&self.max_photo_size_mb) {
            return Err(Error::InvalidInput(format!(
                "maxPhotoSizeMB must be between 1 and 50, got {}",
                self.max_photo_size_mb
            )));
        }
        if !(1..=365).contains(&self.share_expire_days) {
            return Err(Error::InvalidInput(format!(
                "shareExpireDays must be between 1 and 365, got {}",
                self.share_expire_days
            )));
        }
        if self.custom_questions.len() > MAX_CUSTOM_QUESTIONS {
            return Err(Error::InvalidInput(format!(
                "At most {} custom questions are allowed",
                MAX_CUSTOM_QUESTIONS
            )));
        }
        self.custom_questions = self
            .custom_questions
            .iter()
            .map(|q| q.trim().to_string())
            .collect();
        if self.custom_questions.iter().any(|q| q.is_empty()) {
            return Err(Error::InvalidInput(
                "Custom questions must not be blank".to_string(),
            ));
        }
        Ok(self)
    }

    /// Whether guests may submit contributions of this kind
    pub fn allows(&self, kind: ContributionKind) -> bool {
        match kind {
            ContributionKind::Video => self.allow_video,
            ContributionKind::Photo => self.allow_photo,
            ContributionKind::Text => self.allow_text,
        }
    }
}

/// Host-owned event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    /// Opaque subject id supplied by the identity provider
    pub host_user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    /// Guest entry code, `XXX-XXXXX`
    pub event_code: String,
    pub status: EventStatus,
    pub settings: EventSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_owned_by(&self, host_user_id: &str) -> bool {
        self.host_user_id == host_user_id
    }

    /// Guests can only submit to active events
    pub fn accepts_contributions(&self) -> bool {
        self.status == EventStatus::Active
    }

    /// Moment the public share gallery closes
    pub fn share_expires_at(&self) -> DateTime<Utc> {
        self.event_date + Duration::days(i64::from(self.settings.share_expire_days))
    }

    pub fn share_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.share_expires_at()
    }
}

/// Host request to create an event
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub settings: EventSettings,
    #[serde(default = "default_new_event_status")]
    pub status: EventStatus,
}

fn default_new_event_status() -> EventStatus {
    EventStatus::Active
}

impl NewEvent {
    /// Trim text fields and validate title and settings
    pub fn validate(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(Error::InvalidInput("Event title must not be empty".to_string()));
        }
        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::InvalidInput(format!(
                "Event title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.settings = self.settings.validate()?;
        Ok(self)
    }
}

// ============================================================================
// Contributions
// ============================================================================

/// Kind of guest contribution (immutable after creation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    Video,
    Photo,
    Text,
}

impl ContributionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionKind::Video => "video",
            ContributionKind::Photo => "photo",
            ContributionKind::Text => "text",
        }
    }

    /// Video and photo carry a stored payload; text is inline
    pub fn is_media(&self) -> bool {
        !matches!(self, ContributionKind::Text)
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ContributionKind::Video => "Video",
            ContributionKind::Photo => "Photo",
            ContributionKind::Text => "Text",
        }
    }

    pub fn label_plural(&self) -> &'static str {
        match self {
            ContributionKind::Video => "Videos",
            ContributionKind::Photo => "Photos",
            ContributionKind::Text => "Text messages",
        }
    }

    pub fn label_plural_de(&self) -> &'static str {
        match self {
            ContributionKind::Video => "Videos",
            ContributionKind::Photo => "Fotos",
            ContributionKind::Text => "Textnachrichten",
        }
    }
}

impl fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContributionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "video" => Ok(ContributionKind::Video),
            "photo" => Ok(ContributionKind::Photo),
            "text" => Ok(ContributionKind::Text),
            other => Err(Error::InvalidInput(format!("Unknown contribution type: {}", other))),
        }
    }
}

/// Moderation status
///
/// ```text
///            approve              withdraw
///  pending ──────────► approved ──────────► rejected
///     │                    ▲                   │
///     │ reject             └───── restore ─────┘
///     └──────────────────────────────────────► rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ContributionStatus {
    pub const ALL: [ContributionStatus; 3] = [
        ContributionStatus::Pending,
        ContributionStatus::Approved,
        ContributionStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Approved => "approved",
            ContributionStatus::Rejected => "rejected",
        }
    }

    /// Whether a host may move a contribution from `self` to `target`
    ///
    /// Re-applying the current status is allowed (idempotent). Nothing ever
    /// returns to `pending`.
    pub fn can_transition_to(&self, target: ContributionStatus) -> bool {
        use ContributionStatus::*;
        matches!(
            (self, target),
            (Pending, Pending)
                | (Approved, Approved)
                | (Rejected, Rejected)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Rejected)
                | (Rejected, Approved)
        )
    }
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContributionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ContributionStatus::Pending),
            "approved" => Ok(ContributionStatus::Approved),
            "rejected" => Ok(ContributionStatus::Rejected),
            other => Err(Error::InvalidInput(format!("Unknown status: {}", other))),
        }
    }
}

/// Contribution content: a stored media reference or inline text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum Payload {
    Media { url: String },
    Text { content: String },
}

impl Payload {
    pub fn media_url(&self) -> Option<&str> {
        match self {
            Payload::Media { url } => Some(url),
            Payload::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text { content } => Some(content),
            Payload::Media { .. } => None,
        }
    }

    /// Whether this payload form is valid for the given kind
    pub fn fits(&self, kind: ContributionKind) -> bool {
        matches!(self, Payload::Media { .. }) == kind.is_media()
    }
}

/// A single guest submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub event_id: Uuid,
    pub guest_name: String,
    #[serde(rename = "type")]
    pub kind: ContributionKind,
    pub payload: Payload,
    pub thumbnail_url: Option<String>,
    pub question_answered: Option<String>,
    pub status: ContributionStatus,
    pub duration_seconds: Option<u32>,
    pub file_size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated submission, ready for the store
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionDraft {
    pub event_id: Uuid,
    pub guest_name: String,
    pub kind: ContributionKind,
    pub payload: Payload,
    pub thumbnail_url: Option<String>,
    pub question_answered: Option<String>,
    pub duration_seconds: Option<u32>,
    pub file_size_bytes: Option<u64>,
}

/// Per-status and per-kind tallies for one event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionCounts {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub videos: u64,
    pub photos: u64,
    pub texts: u64,
}

impl ContributionCounts {
    /// Tally an already-loaded set of contributions
    pub fn tally<'a>(contributions: impl IntoIterator<Item = &'a Contribution>) -> Self {
        let mut counts = ContributionCounts::default();
        for c in contributions {
            counts.total += 1;
            match c.status {
                ContributionStatus::Pending => counts.pending += 1,
                ContributionStatus::Approved => counts.approved += 1,
                ContributionStatus::Rejected => counts.rejected += 1,
            }
            match c.kind {
                ContributionKind::Video => counts.videos += 1,
                ContributionKind::Photo => counts.photos += 1,
                ContributionKind::Text => counts.texts += 1,
            }
        }
        counts
    }
}

/// Creation-time ordering requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ContributionStatus::*;

    #[test]
    fn test_moderation_transitions() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Rejected), "withdraw");
        assert!(Rejected.can_transition_to(Approved), "restore");
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Pending));
    }

    #[test]
    fn test_reapplying_status_is_allowed() {
        for status in ContributionStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings = EventSettings::from_json("{}").unwrap();
        assert_eq!(settings, EventSettings::default());
        assert_eq!(settings.max_video_duration, 60);
        assert_eq!(settings.share_expire_days, 30);
        assert!(!settings.auto_approve);
    }

    #[test]
    fn test_settings_partial_json_keeps_other_defaults() {
        let settings =
            EventSettings::from_json(r#"{"autoApprove": true, "allowVideo": false}"#).unwrap();
        assert!(settings.auto_approve);
        assert!(!settings.allows(ContributionKind::Video));
        assert!(settings.allows(ContributionKind::Photo));
        assert_eq!(settings.max_photo_size_mb, 5);
    }

    #[test]
    fn test_settings_range_validation() {
        assert!(EventSettings::from_json(r#"{"maxVideoDuration": 0}"#).is_err());
        assert!(EventSettings::from_json(r#"{"shareExpireDays": 1000}"#).is_err());
        assert!(EventSettings::from_json(r#"{"customQuestions": ["  "]}"#).is_err());

        let questions: Vec<String> = (0..11).map(|i| format!("Q{}", i)).collect();
        let settings = EventSettings {
            custom_questions: questions,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_trim_questions() {
        let settings =
            EventSettings::from_json(r#"{"customQuestions": ["  Best memory? "]}"#).unwrap();
        assert_eq!(settings.custom_questions, vec!["Best memory?".to_string()]);
    }

    #[test]
    fn test_payload_fits_kind() {
        let media = Payload::Media {
            url: "https://cdn/x.jpg".into(),
        };
        let text = Payload::Text {
            content: "hi".into(),
        };
        assert!(media.fits(ContributionKind::Photo));
        assert!(media.fits(ContributionKind::Video));
        assert!(!media.fits(ContributionKind::Text));
        assert!(text.fits(ContributionKind::Text));
        assert!(!text.fits(ContributionKind::Video));
    }

    #[test]
    fn test_share_expiry_window() {
        let event_date = "2026-06-01T18:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let event = Event {
            id: Uuid::new_v4(),
            host_user_id: "host-1".into(),
            title: "Wedding".into(),
            description: None,
            event_date,
            event_code: "ABC-DEFGH".into(),
            status: EventStatus::Active,
            settings: EventSettings::default(),
            created_at: event_date,
            updated_at: event_date,
        };
        assert!(!event.share_expired(event_date + Duration::days(30)));
        assert!(event.share_expired(event_date + Duration::days(31)));
    }

    #[test]
    fn test_new_event_validation_trims() {
        let new_event = NewEvent {
            title: "  Summer Party ".into(),
            description: Some("   ".into()),
            event_date: Utc::now(),
            settings: EventSettings::default(),
            status: EventStatus::Active,
        }
        .validate()
        .unwrap();
        assert_eq!(new_event.title, "Summer Party");
        assert!(new_event.description.is_none());

        let blank = NewEvent {
            title: "   ".into(),
            description: None,
            event_date: Utc::now(),
            settings: EventSettings::default(),
            status: EventStatus::Draft,
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_counts_tally() {
        let now = Utc::now();
        let make = |kind, status| Contribution {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            guest_name: "Ann".into(),
            kind,
            payload: Payload::Text {
                content: "x".into(),
            },
            thumbnail_url: None,
            question_answered: None,
            status,
            duration_seconds: None,
            file_size_bytes: None,
            created_at: now,
            updated_at: now,
        };
        let all = vec![
            make(ContributionKind::Text, Pending),
            make(ContributionKind::Video, Approved),
            make(ContributionKind::Photo, Approved),
            make(ContributionKind::Photo, Rejected),
        ];
        let counts = ContributionCounts::tally(&all);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.approved, 2);
        assert_eq!(counts.photos, 2);
        assert_eq!(counts.texts, 1);
    }
}
