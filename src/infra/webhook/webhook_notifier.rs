use reqwest::Client;
use serde_json::json;
use tracing::warn;

/// Posts moderation notices to a Discord webhook.
///
/// The webhook URL is optional: without one, `notify` is a no-op so the
/// rest of the bot never has to care whether notifications are wired up.
/// Delivery failures are logged and swallowed; a dead webhook must not
/// break a ban.
pub struct WebhookNotifier {
    client: Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Send one embed to the webhook, if configured.
    pub async fn notify(&self, title: &str, description: &str, color: u32) {
        let Some(url) = &self.url else {
            return;
        };

        let payload = json!({
            "embeds": [{
                "title": title,
                "description": description,
                "color": color,
            }]
        });

        let result = self.client.post(url).json(&payload).send().await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "webhook notification rejected");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "webhook notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_urls_count_as_unconfigured() {
        assert!(!WebhookNotifier::new(None).is_configured());
        assert!(!WebhookNotifier::new(Some("".into())).is_configured());
        assert!(!WebhookNotifier::new(Some("   ".into())).is_configured());
        assert!(WebhookNotifier::new(Some("https://example.test/hook".into())).is_configured());
    }

    #[tokio::test]
    async fn notify_without_url_is_a_no_op() {
        let notifier = WebhookNotifier::new(None);
        // Must return without attempting any network call
        notifier.notify("title", "description", 0xff0000).await;
    }
}
