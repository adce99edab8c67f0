//! ZIP archive export
//!
//! Layout:
//!
//! ```text
//! README.txt
//! videos/001_<guest>.<ext>
//! photos/001_<guest>.<ext>
//! texts/001_<guest>.txt
//! ```
//!
//! Sequence numbers count per kind. Media that cannot be fetched is skipped
//! without using up a number.

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use memento_common::{Contribution, ContributionKind, Error, Event, Payload, Result};
use tracing::{debug, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::storage::MediaStorage;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Result of building an archive
#[derive(Debug)]
pub struct ArchiveReport {
    pub bytes: Vec<u8>,
    /// Contribution entries written (README not counted)
    pub written: usize,
    /// Contributions whose media could not be fetched
    pub skipped: Vec<Uuid>,
}

/// Folder for a contribution kind
pub fn folder(kind: ContributionKind) -> &'static str {
    match kind {
        ContributionKind::Video => "videos",
        ContributionKind::Photo => "photos",
        ContributionKind::Text => "texts",
    }
}

/// Guest name usable as part of a file name
pub fn safe_guest_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "Guest".to_string(),
        _ => cleaned,
    }
}

/// File extension for a contribution's payload
pub fn extension_for(contribution: &Contribution) -> String {
    let default = match contribution.kind {
        ContributionKind::Video => "webm",
        ContributionKind::Photo => "jpg",
        ContributionKind::Text => return "txt".to_string(),
    };
    contribution
        .payload
        .media_url()
        .map(|url| url.split(['?', '#']).next().unwrap_or_default())
        .and_then(|path| path.rsplit('/').next())
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| default.to_string())
}

/// Entry path, e.g. `photos/002_Ann.jpg`
pub fn entry_name(kind: ContributionKind, sequence: usize, guest_name: &str, extension: &str) -> String {
    format!(
        "{}/{:03}_{}.{}",
        folder(kind),
        sequence,
        safe_guest_name(guest_name),
        extension
    )
}

fn text_entry(contribution: &Contribution, content: &str) -> String {
    let mut out = format!(
        "From: {}\nDate: {}\n",
        contribution.guest_name,
        contribution.created_at.format(TIMESTAMP_FORMAT)
    );
    if let Some(question) = &contribution.question_answered {
        out.push_str(&format!("Question: {}\n", question));
    }
    out.push('\n');
    out.push_str(content);
    out.push('\n');
    out
}

fn readme(event: &Event, total: usize, skipped: usize, exported_at: DateTime<Utc>) -> String {
    let mut out = format!(
        "Event: {}\nExported: {}\nContributions: {}\n",
        event.title,
        exported_at.format(TIMESTAMP_FORMAT),
        total
    );
    if skipped > 0 {
        out.push_str(&format!("Unavailable (not included): {}\n", skipped));
    }
    out.push_str(
        "\nFolders:\n\
         - videos/: video messages\n\
         - photos/: photos\n\
         - texts/: text messages\n\
         \n\
         File names: [number]_[guest name].[extension]\n",
    );
    out
}

/// Fetch every payload and pack the archive
///
/// Fails with [`Error::Transient`] if not a single contribution could be
/// included.
pub async fn build_archive(
    event: &Event,
    contributions: &[Contribution],
    media: &dyn MediaStorage,
    exported_at: DateTime<Utc>,
) -> Result<ArchiveReport> {
    let mut sequences = [0usize; 3];
    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(contributions.len() + 1);
    let mut skipped = Vec::new();

    for contribution in contributions {
        let bytes = match &contribution.payload {
            Payload::Text { content } => text_entry(contribution, content).into_bytes(),
            Payload::Media { url } => match media.fetch(url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Export of event {} skips contribution {}: {}", event.id, contribution.id, e);
                    skipped.push(contribution.id);
                    continue;
                }
            },
        };

        let slot = match contribution.kind {
            ContributionKind::Video => 0,
            ContributionKind::Photo => 1,
            ContributionKind::Text => 2,
        };
        sequences[slot] += 1;
        let name = entry_name(
            contribution.kind,
            sequences[slot],
            &contribution.guest_name,
            &extension_for(contribution),
        );
        debug!("Archive entry {} ({} bytes)", name, bytes.len());
        entries.push((name, bytes));
    }

    if entries.is_empty() {
        return Err(Error::Transient(format!(
            "None of the {} approved contributions of event {} could be fetched",
            contributions.len(),
            event.id
        )));
    }

    let written = entries.len();
    entries.push((
        "README.txt".to_string(),
        readme(event, contributions.len(), skipped.len(), exported_at).into_bytes(),
    ));

    Ok(ArchiveReport {
        bytes: write_zip(&entries)?,
        written,
        skipped,
    })
}

fn write_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let zip_error = |e: zip::result::ZipError| Error::Internal(format!("Failed to write archive: {}", e));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, bytes) in entries {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options).map_err(zip_error)?;
        zip.write_all(bytes)?;
    }

    let cursor = zip.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}
