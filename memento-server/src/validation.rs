//! Submission validation
//!
//! Pure checks run before anything is written: a [`Submission`] either becomes
//! a normalized [`ContributionDraft`] or is refused with a [`Rejection`] the
//! guest can act on. Media references must name an object in the event's
//! folder of the media bucket.

use memento_common::{ContributionDraft, ContributionKind, Event, Payload, Rejection};
use serde::Deserialize;

use crate::storage::MediaStorage;

/// Maximum text message length in characters (after trimming)
pub const MAX_TEXT_LENGTH: usize = 1000;

/// A guest submission as received from the upload form
///
/// Media has already been written to object storage; `content_url` is the
/// reference to it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub guest_name: String,
    #[serde(rename = "type")]
    pub kind: Option<ContributionKind>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub question_answered: Option<String>,
    /// MIME type of the uploaded file, if the client reported one
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Measured video length in seconds
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub file_size_bytes: Option<u64>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn mime_is(mime: Option<&str>, family: &str) -> bool {
    match mime {
        None => true,
        Some(m) => m
            .trim()
            .to_ascii_lowercase()
            .strip_prefix(family)
            .is_some_and(|rest| rest.starts_with('/')),
    }
}

/// Whether `reference` is an object below `<event id>/` in `media`
fn in_event_folder(media: &dyn MediaStorage, event: &Event, reference: &str) -> bool {
    let folder = format!("{}/", event.id);
    media
        .object_path(reference)
        .and_then(|path| path.strip_prefix(folder.as_str()))
        .is_some_and(|file| !file.is_empty())
}

/// Validate a submission against the event it targets
pub fn validate(
    event: &Event,
    submission: &Submission,
    media: &dyn MediaStorage,
) -> Result<ContributionDraft, Rejection> {
    if !event.accepts_contributions() {
        return Err(Rejection::EventClosed);
    }

    let guest_name = non_blank(Some(submission.guest_name.as_str())).ok_or(Rejection::GuestNameMissing)?;
    let kind = submission.kind.ok_or(Rejection::PayloadMismatch)?;

    if !event.settings.allows(kind) {
        return Err(Rejection::KindNotAllowed(kind));
    }

    let mut duration_seconds = None;
    let payload = match kind {
        ContributionKind::Text => {
            if submission.content_url.is_some() {
                return Err(Rejection::PayloadMismatch);
            }
            let text = submission
                .text_content
                .as_deref()
                .map(str::trim)
                .unwrap_or_default();
            if text.is_empty() {
                return Err(Rejection::TextEmpty);
            }
            let length = text.chars().count();
            if length > MAX_TEXT_LENGTH {
                return Err(Rejection::TextTooLong {
                    length,
                    max_length: MAX_TEXT_LENGTH,
                });
            }
            Payload::Text {
                content: text.to_string(),
            }
        }
        ContributionKind::Video | ContributionKind::Photo => {
            if non_blank(submission.text_content.as_deref()).is_some() {
                return Err(Rejection::PayloadMismatch);
            }

            if kind == ContributionKind::Video {
                if !mime_is(submission.mime_type.as_deref(), "video") {
                    return Err(Rejection::NotAVideo);
                }
                let duration = submission
                    .duration_seconds
                    .filter(|d| d.is_finite() && *d >= 0.0)
                    .ok_or(Rejection::DurationUnknown)?;
                let max_seconds = event.settings.max_video_duration;
                if duration > f64::from(max_seconds) {
                    return Err(Rejection::VideoTooLong {
                        duration_seconds: duration.ceil() as u32,
                        max_seconds,
                    });
                }
                duration_seconds = Some(duration.round() as u32);
            } else if !mime_is(submission.mime_type.as_deref(), "image") {
                return Err(Rejection::NotAnImage);
            }

            let url = non_blank(submission.content_url.as_deref()).ok_or(Rejection::PayloadMissing)?;
            if !in_event_folder(media, event, &url) {
                return Err(Rejection::ForeignMedia);
            }
            Payload::Media { url }
        }
    };

    let thumbnail_url = non_blank(submission.thumbnail_url.as_deref());
    if let Some(thumbnail) = &thumbnail_url {
        if !in_event_folder(media, event, thumbnail) {
            return Err(Rejection::ForeignMedia);
        }
    }

    Ok(ContributionDraft {
        event_id: event.id,
        guest_name,
        kind,
        payload,
        thumbnail_url,
        question_answered: non_blank(submission.question_answered.as_deref()),
        duration_seconds,
        file_size_bytes: submission.file_size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memento_common::{EventSettings, EventStatus};
    use std::path::PathBuf;
    use uuid::Uuid;

    use crate::storage::{HttpMediaStorage, LocalMediaStorage};

    fn media() -> LocalMediaStorage {
        LocalMediaStorage::new(PathBuf::from("/srv/media/event-media"), "event-media")
    }

    fn validate(event: &Event, submission: &Submission) -> Result<ContributionDraft, Rejection> {
        super::validate(event, submission, &media())
    }

    fn event(settings: EventSettings) -> Event {
        Event {
            id: Uuid::new_v4(),
            host_user_id: "host".into(),
            title: "Party".into(),
            description: None,
            event_date: Utc::now(),
            event_code: "ABC-DEFGH".into(),
            status: EventStatus::Active,
            settings,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn video(event: &Event, duration: Option<f64>) -> Submission {
        Submission {
            guest_name: "Ann".into(),
            kind: Some(ContributionKind::Video),
            content_url: Some(format!("{}/clip.webm", event.id)),
            mime_type: Some("video/webm".into()),
            duration_seconds: duration,
            ..Default::default()
        }
    }

    fn text(content: &str) -> Submission {
        Submission {
            guest_name: "Ann".into(),
            kind: Some(ContributionKind::Text),
            text_content: Some(content.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_video_duration_limit() {
        let ev = event(EventSettings::default());
        assert!(validate(&ev, &video(&ev, Some(60.0))).is_ok());
        assert_eq!(
            validate(&ev, &video(&ev, Some(75.0))),
            Err(Rejection::VideoTooLong {
                duration_seconds: 75,
                max_seconds: 60
            })
        );
        assert_eq!(validate(&ev, &video(&ev, None)), Err(Rejection::DurationUnknown));
        assert_eq!(
            validate(&ev, &video(&ev, Some(f64::NAN))),
            Err(Rejection::DurationUnknown)
        );
    }

    #[test]
    fn test_custom_video_limit() {
        let ev = event(EventSettings {
            max_video_duration: 120,
            ..Default::default()
        });
        let draft = validate(&ev, &video(&ev, Some(90.4))).unwrap();
        assert_eq!(draft.duration_seconds, Some(90));
    }

    #[test]
    fn test_mime_types() {
        let ev = event(EventSettings::default());
        let mut clip = video(&ev, Some(10.0));
        clip.mime_type = Some("image/png".into());
        assert_eq!(validate(&ev, &clip), Err(Rejection::NotAVideo));

        let photo = Submission {
            guest_name: "Ann".into(),
            kind: Some(ContributionKind::Photo),
            content_url: Some(format!("{}/p.jpg", ev.id)),
            mime_type: Some("application/pdf".into()),
            ..Default::default()
        };
        assert_eq!(validate(&ev, &photo), Err(Rejection::NotAnImage));

        let photo = Submission {
            mime_type: Some("image/heic".into()),
            file_size_bytes: Some(40 * 1024 * 1024),
            ..photo
        };
        // Oversized photos are not rejected
        assert!(validate(&ev, &photo).is_ok());
    }

    #[test]
    fn test_text_rules() {
        let ev = event(EventSettings::default());
        assert_eq!(validate(&ev, &text("   ")), Err(Rejection::TextEmpty));

        let long = "x".repeat(MAX_TEXT_LENGTH + 1);
        assert_eq!(
            validate(&ev, &text(&long)),
            Err(Rejection::TextTooLong {
                length: 1001,
                max_length: 1000
            })
        );

        let draft = validate(&ev, &text("  Congratulations!  ")).unwrap();
        assert_eq!(draft.payload.text(), Some("Congratulations!"));
        assert!(draft.payload.media_url().is_none());
    }

    #[test]
    fn test_text_with_url_is_mismatch() {
        let ev = event(EventSettings::default());
        let mut submission = text("hi");
        submission.content_url = Some("e/x.jpg".into());
        assert_eq!(validate(&ev, &submission), Err(Rejection::PayloadMismatch));
    }

    #[test]
    fn test_guest_name_required() {
        let ev = event(EventSettings::default());
        let mut submission = text("hi");
        submission.guest_name = "  ".into();
        assert_eq!(validate(&ev, &submission), Err(Rejection::GuestNameMissing));
    }

    #[test]
    fn test_disabled_kind_rejected() {
        let ev = event(EventSettings {
            allow_text: false,
            ..Default::default()
        });
        assert_eq!(
            validate(&ev, &text("hi")),
            Err(Rejection::KindNotAllowed(ContributionKind::Text))
        );
    }

    #[test]
    fn test_closed_event_rejected() {
        let mut ev = event(EventSettings::default());
        ev.status = EventStatus::Archived;
        assert_eq!(validate(&ev, &text("hi")), Err(Rejection::EventClosed));
    }

    #[test]
    fn test_media_requires_url() {
        let ev = event(EventSettings::default());
        let mut clip = video(&ev, Some(5.0));
        clip.content_url = Some(" ".into());
        assert_eq!(validate(&ev, &clip), Err(Rejection::PayloadMissing));
    }

    #[test]
    fn test_media_outside_event_folder_rejected() {
        let ev = event(EventSettings::default());
        let photo = |url: &str| Submission {
            guest_name: "Ann".into(),
            kind: Some(ContributionKind::Photo),
            content_url: Some(url.into()),
            ..Default::default()
        };

        for url in [
            "http://169.254.169.254/latest/meta-data/iam/security-credentials/".to_string(),
            "https://cdn.example.com/a.jpg".to_string(),
            format!("{}/p.jpg", Uuid::new_v4()),
            format!("{}/../other/p.jpg", ev.id),
            format!("{}/", ev.id),
        ] {
            assert_eq!(validate(&ev, &photo(&url)), Err(Rejection::ForeignMedia), "{}", url);
        }

        let public = format!("https://cdn.example.com/public/event-media/{}/p.jpg", ev.id);
        assert!(validate(&ev, &photo(&public)).is_ok());

        let mut with_thumbnail = video(&ev, Some(5.0));
        with_thumbnail.thumbnail_url = Some("http://10.0.0.1/thumb.jpg".into());
        assert_eq!(validate(&ev, &with_thumbnail), Err(Rejection::ForeignMedia));
    }

    #[test]
    fn test_http_media_must_match_public_base() {
        let ev = event(EventSettings::default());
        let storage = HttpMediaStorage::new(
            "https://cdn.example.com/public",
            "event-media",
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let photo = |url: String| Submission {
            guest_name: "Ann".into(),
            kind: Some(ContributionKind::Photo),
            content_url: Some(url),
            ..Default::default()
        };

        let own = format!("https://cdn.example.com/public/event-media/{}/p.jpg", ev.id);
        assert!(super::validate(&ev, &photo(own), &storage).is_ok());

        let elsewhere = format!("https://evil.example.com/public/event-media/{}/p.jpg", ev.id);
        assert_eq!(
            super::validate(&ev, &photo(elsewhere), &storage),
            Err(Rejection::ForeignMedia)
        );
    }

    #[test]
    fn test_blank_answer_dropped() {
        let ev = event(EventSettings::default());
        let mut submission = text("hi");
        submission.question_answered = Some("   ".into());
        assert!(validate(&ev, &submission).unwrap().question_answered.is_none());

        submission.question_answered = Some(" Best memory? ".into());
        assert_eq!(
            validate(&ev, &submission).unwrap().question_answered.as_deref(),
            Some("Best memory?")
        );
    }
}
