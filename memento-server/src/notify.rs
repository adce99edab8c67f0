//! Host notifications
//!
//! Hosts are e-mailed when a guest submits something, when an export is ready
//! and when an event is archived. Mails go out in the background; a failed
//! mail never fails the request that caused it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use memento_common::config::NotifyConfig;
use memento_common::{Error, Event, Locale, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::links::PublicLinks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewContribution,
    ExportReady,
    EventComplete,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewContribution => "new_contribution",
            NotificationKind::ExportReady => "export_ready",
            NotificationKind::EventComplete => "event_complete",
        }
    }
}

/// Something a host should hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub event_id: Uuid,
    pub event_title: String,
    pub host_user_id: String,
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Notification {
    pub fn new(kind: NotificationKind, event: &Event) -> Self {
        Self {
            kind,
            event_id: event.id,
            event_title: event.title.clone(),
            host_user_id: event.host_user_id.clone(),
        }
    }

    pub fn subject(&self, locale: Locale) -> String {
        let title = &self.event_title;
        match (self.kind, locale) {
            (NotificationKind::NewContribution, Locale::En) => format!("New contribution for \"{}\"", title),
            (NotificationKind::NewContribution, Locale::De) => format!("Neuer Beitrag bei \"{}\"", title),
            (NotificationKind::ExportReady, Locale::En) => format!("Your export of \"{}\" is ready", title),
            (NotificationKind::ExportReady, Locale::De) => format!("Dein Export für \"{}\" ist bereit", title),
            (NotificationKind::EventComplete, Locale::En) => format!("Your event \"{}\" is over", title),
            (NotificationKind::EventComplete, Locale::De) => format!("Dein Event \"{}\" ist vorbei", title),
        }
    }

    pub fn html(&self, locale: Locale, links: &PublicLinks) -> String {
        let title = escape_html(&self.event_title);
        let dashboard = links.dashboard(self.event_id);
        match (self.kind, locale) {
            (NotificationKind::NewContribution, Locale::En) => format!(
                "<h1>New contribution</h1>\n<p>A guest added something to <strong>{}</strong>.</p>\n\
                 <p><a href=\"{}\">Review it</a></p>\n",
                title,
                links.moderation(self.event_id)
            ),
            (NotificationKind::NewContribution, Locale::De) => format!(
                "<h1>Neuer Beitrag</h1>\n<p>Ein Gast hat etwas zu <strong>{}</strong> beigetragen.</p>\n\
                 <p><a href=\"{}\">Zur Moderation</a></p>\n",
                title,
                links.moderation(self.event_id)
            ),
            (NotificationKind::ExportReady, Locale::En) => format!(
                "<h1>Export ready</h1>\n<p>Your export of <strong>{}</strong> is done.</p>\n\
                 <p><a href=\"{}\">Download</a></p>\n",
                title, dashboard
            ),
            (NotificationKind::ExportReady, Locale::De) => format!(
                "<h1>Export bereit</h1>\n<p>Dein Export für <strong>{}</strong> ist fertig.</p>\n\
                 <p><a href=\"{}\">Zum Download</a></p>\n",
                title, dashboard
            ),
            (NotificationKind::EventComplete, Locale::En) => format!(
                "<h1>Your event is over</h1>\n<p>All contributions to <strong>{}</strong> are waiting for you.</p>\n\
                 <ul>\n<li><a href=\"{}\">Open the dashboard</a></li>\n\
                 <li><a href=\"{}\">Share link for guests</a></li>\n</ul>\n",
                title,
                dashboard,
                links.share(self.event_id)
            ),
            (NotificationKind::EventComplete, Locale::De) => format!(
                "<h1>Dein Event ist vorbei</h1>\n<p>Alle Beiträge zu <strong>{}</strong> warten auf dich.</p>\n\
                 <ul>\n<li><a href=\"{}\">Event-Dashboard öffnen</a></li>\n\
                 <li><a href=\"{}\">Share-Link für Gäste</a></li>\n</ul>\n",
                title,
                dashboard,
                links.share(self.event_id)
            ),
        }
    }
}

/// Delivers notifications to hosts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log; used while mail is not configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            "Notification {} for host {} (event {})",
            notification.kind.as_str(),
            notification.host_user_id,
            notification.event_id
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

/// Sends mails through an HTTP mail API
pub struct MailNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
    locale: Locale,
    recipients: BTreeMap<String, String>,
    links: PublicLinks,
}

impl MailNotifier {
    pub fn new(config: &NotifyConfig, api_key: &str, links: PublicLinks) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            from: config.from.clone(),
            locale: Locale::from_accept_language(&config.language),
            recipients: config.recipients.clone(),
            links,
        })
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let Some(to) = self.recipients.get(&notification.host_user_id) else {
            debug!(
                "No e-mail address for host {}, dropping {}",
                notification.host_user_id,
                notification.kind.as_str()
            );
            return Ok(());
        };

        let request = MailRequest {
            from: &self.from,
            to: [to.as_str()],
            subject: notification.subject(self.locale),
            html: notification.html(self.locale, &self.links),
        };
        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Transient(format!("Mail API request failed: {}", e)))?;

        info!(
            "Mailed {} for event {} to host {}",
            notification.kind.as_str(),
            notification.event_id,
            notification.host_user_id
        );
        Ok(())
    }
}

/// Build the notifier described by the configuration
pub fn from_config(config: &NotifyConfig, links: PublicLinks) -> Result<Arc<dyn Notifier>> {
    if !config.enabled {
        return Ok(Arc::new(LogNotifier));
    }
    let api_key = config.api_key.as_deref().ok_or_else(|| {
        Error::Config("notify.api_key is required when notifications are enabled".to_string())
    })?;
    Ok(Arc::new(MailNotifier::new(config, api_key, links)?))
}

/// Deliver in the background, logging failures
pub fn dispatch(notifier: &Arc<dyn Notifier>, notification: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            warn!(
                "Could not send {} for event {}: {}",
                notification.kind.as_str(),
                notification.event_id,
                e
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(kind: NotificationKind) -> Notification {
        Notification {
            kind,
            event_id: Uuid::nil(),
            event_title: "Anna & Ben <3".into(),
            host_user_id: "host-anna".into(),
        }
    }

    fn config(endpoint: &str) -> NotifyConfig {
        NotifyConfig {
            enabled: true,
            endpoint: endpoint.into(),
            api_key: Some("re_test".into()),
            recipients: BTreeMap::from([("host-anna".to_string(), "anna@example.com".to_string())]),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_messages_link_to_the_event() {
        let links = PublicLinks::new("https://memento.example.com");
        let html = notification(NotificationKind::NewContribution).html(Locale::En, &links);
        assert!(html.contains("https://memento.example.com/events/00000000-0000-0000-0000-000000000000/moderate"));
        assert!(html.contains("Anna &amp; Ben &lt;3"));

        let html = notification(NotificationKind::EventComplete).html(Locale::De, &links);
        assert!(html.contains("/share/00000000-0000-0000-0000-000000000000"));

        assert_eq!(
            notification(NotificationKind::ExportReady).subject(Locale::De),
            "Dein Export für \"Anna & Ben <3\" ist bereit"
        );
    }

    #[tokio::test]
    async fn test_unknown_host_is_skipped() {
        let notifier = MailNotifier::new(&config("http://127.0.0.1:9/emails"), "re_test", PublicLinks::default()).unwrap();
        let mut other = notification(NotificationKind::ExportReady);
        other.host_user_id = "host-without-mail".into();
        assert!(notifier.notify(&other).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_mail_api_is_transient() {
        let notifier = MailNotifier::new(&config("http://127.0.0.1:9/emails"), "re_test", PublicLinks::default()).unwrap();
        let err = notifier
            .notify(&notification(NotificationKind::NewContribution))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transient(_)));
    }

    #[test]
    fn test_disabled_config_only_logs() {
        assert!(from_config(&NotifyConfig::default(), PublicLinks::default()).is_ok());
        let mut missing_key = config("http://127.0.0.1:9/emails");
        missing_key.api_key = None;
        assert!(matches!(
            from_config(&missing_key, PublicLinks::default()),
            Err(Error::Config(_))
        ));
    }
}
