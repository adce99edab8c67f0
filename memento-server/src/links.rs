//! Public links into the web front end

use uuid::Uuid;

/// Builds the URLs guests and hosts open in a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicLinks {
    base: String,
}

impl Default for PublicLinks {
    fn default() -> Self {
        Self::new("http://localhost:5780")
    }
}

impl PublicLinks {
    pub fn new(public_url: &str) -> Self {
        Self {
            base: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Guest entry page, encoded in the event's QR code
    pub fn guest(&self, event_code: &str) -> String {
        format!("{}/e/{}", self.base, event_code)
    }

    /// Read-only gallery shared after the event
    pub fn share(&self, event_id: Uuid) -> String {
        format!("{}/share/{}", self.base, event_id)
    }

    pub fn dashboard(&self, event_id: Uuid) -> String {
        format!("{}/events/{}", self.base, event_id)
    }

    pub fn moderation(&self, event_id: Uuid) -> String {
        format!("{}/events/{}/moderate", self.base, event_id)
    }
}
