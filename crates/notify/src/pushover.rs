//! Pushover notification channel

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use sync_core::{Error, NotificationConfig, NotifyConfig, Result};
use tracing::{debug, error, info, instrument};

use crate::Notifier;

/// Sends messages through the Pushover messages API
pub struct PushoverNotifier {
    endpoint: String,
    app_token: String,
    user_token: String,
    client: reqwest::Client,
}

impl fmt::Debug for PushoverNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverNotifier")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl PushoverNotifier {
    pub fn new(
        endpoint: impl Into<String>,
        app_token: impl Into<String>,
        user_token: impl Into<String>,
        settings: &NotifyConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| Error::Notification(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            app_token: app_token.into(),
            user_token: user_token.into(),
            client,
        })
    }

    /// Build from validated credentials and the transport settings
    pub fn from_config(config: &NotificationConfig, settings: &NotifyConfig) -> Result<Self> {
        config.validate()?;
        let app_token = config.param("app_token").unwrap_or_default();
        let user_token = config.param("user_token").unwrap_or_default();
        Self::new(settings.endpoint.clone(), app_token, user_token, settings)
    }

    async fn attachment_form(&self, text: &str, image: &Path) -> Result<Form> {
        let bytes = tokio::fs::read(image).await?;
        let part = Part::bytes(bytes)
            .file_name("image.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| Error::Notification(e.to_string()))?;

        Ok(Form::new()
            .text("token", self.app_token.clone())
            .text("user", self.user_token.clone())
            .text("message", text.to_string())
            .part("attachment", part))
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    fn name(&self) -> &str {
        "pushover"
    }

    #[instrument(skip(self, text), fields(endpoint = %self.endpoint))]
    async fn send(&self, text: &str, attachment: Option<&Path>) -> Result<()> {
        let request = self.client.post(&self.endpoint);
        let request = match attachment {
            Some(image) => {
                debug!(image = %image.display(), "Sending notification with attachment");
                request.multipart(self.attachment_form(text, image).await?)
            }
            None => request.form(&[
                ("token", self.app_token.as_str()),
                ("user", self.user_token.as_str()),
                ("message", text),
            ]),
        };

        let response = request.send().await.map_err(|e| {
            error!("Pushover request failed: {}", e);
            Error::Notification(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Pushover rejected notification");
            return Err(Error::Notification(format!("HTTP {}: {}", status, body)));
        }

        info!("Notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer) -> PushoverNotifier {
        PushoverNotifier::new(
            format!("{}/1/messages.json", server.uri()),
            "app-123",
            "user-456",
            &NotifyConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .and(body_string_contains("token=app-123"))
            .and(body_string_contains("user=user-456"))
            .and(body_string_contains("message=%5BDONE%5D%0Atraining+finished"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server)
            .send("[DONE]\ntraining finished", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_with_attachment_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .and(body_string_contains("name=\"attachment\"; filename=\"image.jpg\""))
            .and(body_string_contains("user-456"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("loss.jpg");
        std::fs::write(&image, b"fake-jpeg-bytes").unwrap();

        notifier(&server)
            .send("[DONE]\nsee plot", Some(&image))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_request_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = notifier(&server).send("[DONE]\n", None).await.unwrap_err();
        assert!(matches!(err, Error::Notification(ref msg) if msg.contains("invalid token")));
        assert!(!err.is_authentication());
    }
}
