//! Export pipeline
//!
//! Packages an event's approved contributions, oldest first, as a ZIP
//! archive ([`archive`]) or a paginated PDF guestbook ([`document`]). Nothing
//! is produced when there is nothing approved.

pub mod archive;
pub mod document;

use chrono::{DateTime, Utc};
use memento_common::{Contribution, ContributionStatus, ContributionStore, Error, Event, Result, SortOrder};
use serde::Deserialize;
use tracing::info;

use crate::storage::MediaStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Zip,
    Pdf,
}

/// A finished download
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Approved contributions in chronological order
///
/// Fails with [`Error::Precondition`] when there are none.
pub async fn exportable(store: &dyn ContributionStore, event: &Event) -> Result<Vec<Contribution>> {
    let contributions = store
        .list(event.id, Some(ContributionStatus::Approved), SortOrder::Ascending)
        .await?;
    if contributions.is_empty() {
        return Err(Error::Precondition(format!(
            "Event {} has no approved contributions",
            event.id
        )));
    }
    Ok(contributions)
}

/// File-name-safe form of an event title
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Run a complete export of `event`
pub async fn export_event(
    store: &dyn ContributionStore,
    media: &dyn MediaStorage,
    event: &Event,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> Result<ExportArtifact> {
    let contributions = exportable(store, event).await?;
    let title = sanitize_title(&event.title);

    let artifact = match format {
        ExportFormat::Zip => {
            let report = archive::build_archive(event, &contributions, media, exported_at).await?;
            ExportArtifact {
                file_name: format!("{}_Export.zip", title),
                content_type: "application/zip",
                bytes: report.bytes,
            }
        }
        ExportFormat::Pdf => {
            let model = document::layout(event, &contributions, exported_at);
            ExportArtifact {
                file_name: format!("{}_Guestbook.pdf", title),
                content_type: "application/pdf",
                bytes: document::render(&model)?,
            }
        }
    };

    info!(
        "Exported {} contributions of event {} as {} ({} bytes)",
        contributions.len(),
        event.id,
        artifact.file_name,
        artifact.bytes.len()
    );
    Ok(artifact)
}
