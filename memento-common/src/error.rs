//! Common error types for Memento
//!
//! Every failure carries an [`ErrorClass`] so callers can tell the user whether
//! to fix their input, try again later, or that there is simply nothing to do.
//! User-facing text is produced by [`Error::user_message`] in the requested
//! [`Locale`]; the `Display` impl is the operator-facing (log) message.

use crate::models::ContributionKind;
use thiserror::Error;

/// Common result type for Memento operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Memento crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Guest submission rejected by the submission validator
    #[error("Submission rejected: {0}")]
    Validation(Rejection),

    /// Invalid host input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested event or contribution does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not the host of the event
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Storage or network failure; retry by re-invoking the operation
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Operation has nothing to act on (e.g. export without approved contributions)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// At least one item of a bulk operation failed
    #[error("Bulk operation failed for {failed} of {total} items")]
    BulkFailed { failed: usize, total: usize },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How a failure should be presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// User-correctable input problem
    FixInput,
    /// Missing event or contribution
    NotFound,
    /// Non-host attempting a host action
    Forbidden,
    /// Storage/network trouble; the same operation may succeed later
    RetryLater,
    /// Nothing eligible to act on
    NothingToDo,
}

/// Languages user-facing messages are available in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    De,
}

impl Locale {
    /// Pick a locale from an `Accept-Language` header value
    ///
    /// Only the primary tag of each entry is considered; the first supported
    /// language wins. Falls back to English.
    pub fn from_accept_language(header: &str) -> Self {
        for entry in header.split(',') {
            let tag = entry.split(';').next().unwrap_or("").trim();
            let primary = tag.split('-').next().unwrap_or("").to_ascii_lowercase();
            match primary.as_str() {
                "de" => return Locale::De,
                "en" => return Locale::En,
                _ => {}
            }
        }
        Locale::En
    }
}

impl Error {
    /// Classify this error for user presentation
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Validation(_) | Error::InvalidInput(_) => ErrorClass::FixInput,
            Error::NotFound(_) => ErrorClass::NotFound,
            Error::Permission(_) => ErrorClass::Forbidden,
            Error::Precondition(_) => ErrorClass::NothingToDo,
            Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Transient(_)
            | Error::BulkFailed { .. }
            | Error::Internal(_) => ErrorClass::RetryLater,
        }
    }

    /// Localized message suitable for showing to the end user
    pub fn user_message(&self, locale: Locale) -> String {
        match (self, locale) {
            (Error::Validation(rejection), _) => rejection.message(locale),
            (Error::InvalidInput(detail), Locale::En) => {
                format!("Please check your input: {}", detail)
            }
            (Error::InvalidInput(detail), Locale::De) => {
                format!("Bitte überprüfe deine Eingabe: {}", detail)
            }
            (Error::NotFound(_), Locale::En) => "The requested item could not be found.".to_string(),
            (Error::NotFound(_), Locale::De) => {
                "Der angeforderte Eintrag wurde nicht gefunden.".to_string()
            }
            (Error::Permission(_), Locale::En) => "You are not allowed to do that.".to_string(),
            (Error::Permission(_), Locale::De) => "Dazu bist du nicht berechtigt.".to_string(),
            (Error::Precondition(_), Locale::En) => {
                "There are no approved contributions to export yet.".to_string()
            }
            (Error::Precondition(_), Locale::De) => {
                "Keine freigegebenen Beiträge zum Exportieren.".to_string()
            }
            (Error::BulkFailed { failed, total }, Locale::En) => format!(
                "{} of {} actions failed. Please try again later.",
                failed, total
            ),
            (Error::BulkFailed { failed, total }, Locale::De) => format!(
                "{} von {} Aktionen sind fehlgeschlagen. Bitte versuche es später erneut.",
                failed, total
            ),
            (_, Locale::En) => "Something went wrong. Please try again later.".to_string(),
            (_, Locale::De) => {
                "Etwas ist schiefgelaufen. Bitte versuche es später erneut.".to_string()
            }
        }
    }
}

/// Why a guest submission was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Event is not active (draft or archived)
    EventClosed,
    /// Guest name missing or blank
    GuestNameMissing,
    /// Contribution kind disabled in the event settings
    KindNotAllowed(ContributionKind),
    /// Video has no measured duration
    DurationUnknown,
    /// Video longer than the event allows
    VideoTooLong { duration_seconds: u32, max_seconds: u32 },
    /// Video upload whose MIME type is not `video/*`
    NotAVideo,
    /// Photo upload whose MIME type is not `image/*`
    NotAnImage,
    /// Text message empty after trimming
    TextEmpty,
    /// Text message over the length limit
    TextTooLong { length: usize, max_length: usize },
    /// Media contribution without a payload reference
    PayloadMissing,
    /// Payload does not match the contribution kind
    PayloadMismatch,
    /// Media reference outside the event's folder in the media bucket
    ForeignMedia,
}

impl Rejection {
    /// Localized, user-correctable reason
    pub fn message(&self, locale: Locale) -> String {
        match locale {
            Locale::En => self.to_string(),
            Locale::De => match self {
                Rejection::EventClosed => {
                    "Dieses Event nimmt keine Beiträge mehr an.".to_string()
                }
                Rejection::GuestNameMissing => "Bitte gib zuerst deinen Namen ein.".to_string(),
                Rejection::KindNotAllowed(kind) => {
                    format!("{} sind für dieses Event nicht erlaubt.", kind.label_plural_de())
                }
                Rejection::DurationUnknown => {
                    "Die Länge des Videos konnte nicht ermittelt werden.".to_string()
                }
                Rejection::VideoTooLong {
                    duration_seconds,
                    max_seconds,
                } => format!(
                    "Video ist zu lang ({}s). Max. {}s erlaubt.",
                    duration_seconds, max_seconds
                ),
                Rejection::NotAVideo => "Bitte wähle eine Videodatei aus.".to_string(),
                Rejection::NotAnImage => "Bitte wähle eine Bilddatei aus.".to_string(),
                Rejection::TextEmpty => "Bitte schreibe eine Nachricht.".to_string(),
                Rejection::TextTooLong { length, max_length } => format!(
                    "Nachricht ist zu lang ({} Zeichen). Max. {} Zeichen erlaubt.",
                    length, max_length
                ),
                Rejection::PayloadMissing => "Bitte lade zuerst eine Datei hoch.".to_string(),
                Rejection::PayloadMismatch => {
                    "Der Inhalt passt nicht zum Beitragstyp.".to_string()
                }
                Rejection::ForeignMedia => {
                    "Bitte lade die Datei über die Eventseite hoch.".to_string()
                }
            },
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::EventClosed => write!(f, "This event is not accepting contributions."),
            Rejection::GuestNameMissing => write!(f, "Please enter your name first."),
            Rejection::KindNotAllowed(kind) => {
                write!(f, "{} are not allowed for this event.", kind.label_plural())
            }
            Rejection::DurationUnknown => {
                write!(f, "The video length could not be determined.")
            }
            Rejection::VideoTooLong {
                duration_seconds,
                max_seconds,
            } => write!(
                f,
                "Video is too long ({}s). At most {}s are allowed.",
                duration_seconds, max_seconds
            ),
            Rejection::NotAVideo => write!(f, "Please choose a video file."),
            Rejection::NotAnImage => write!(f, "Please choose an image file."),
            Rejection::TextEmpty => write!(f, "Please write a message."),
            Rejection::TextTooLong { length, max_length } => write!(
                f,
                "Message is too long ({} characters). At most {} are allowed.",
                length, max_length
            ),
            Rejection::PayloadMissing => write!(f, "Please upload a file first."),
            Rejection::PayloadMismatch => {
                write!(f, "The content does not match the contribution type.")
            }
            Rejection::ForeignMedia => write!(f, "Please upload the file through the event page."),
        }
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Error::Validation(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_distinguish_user_actions() {
        assert_eq!(Error::Validation(Rejection::TextEmpty).class(), ErrorClass::FixInput);
        assert_eq!(Error::Transient("fetch".into()).class(), ErrorClass::RetryLater);
        assert_eq!(Error::Precondition("empty".into()).class(), ErrorClass::NothingToDo);
        assert_eq!(Error::NotFound("x".into()).class(), ErrorClass::NotFound);
        assert_eq!(Error::Permission("x".into()).class(), ErrorClass::Forbidden);
        assert_eq!(
            Error::BulkFailed { failed: 1, total: 3 }.class(),
            ErrorClass::RetryLater
        );
    }

    #[test]
    fn test_user_messages_are_localized() {
        let err = Error::Precondition("no approved contributions".into());
        assert_eq!(
            err.user_message(Locale::En),
            "There are no approved contributions to export yet."
        );
        assert_eq!(
            err.user_message(Locale::De),
            "Keine freigegebenen Beiträge zum Exportieren."
        );

        let err = Error::Validation(Rejection::VideoTooLong {
            duration_seconds: 75,
            max_seconds: 60,
        });
        assert!(err.user_message(Locale::En).contains("75s"));
        assert!(err.user_message(Locale::De).contains("Max. 60s"));
    }

    #[test]
    fn test_internal_details_do_not_leak_to_users() {
        let err = Error::Internal("pool exhausted at 0x7f".into());
        assert!(!err.user_message(Locale::En).contains("0x7f"));
    }

    #[test]
    fn test_locale_from_accept_language() {
        assert_eq!(Locale::from_accept_language("de-DE,de;q=0.9,en;q=0.8"), Locale::De);
        assert_eq!(Locale::from_accept_language("en-US,en;q=0.9"), Locale::En);
        assert_eq!(Locale::from_accept_language("fr-FR,de;q=0.5"), Locale::De);
        assert_eq!(Locale::from_accept_language(""), Locale::En);
    }
}
