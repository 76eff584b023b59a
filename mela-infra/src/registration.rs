use async_trait::async_trait;
use tracing::{info, warn};

use mela_core::registration::{
    RegistrationBody, RegistrationPayload, RegistrationReply, RegistrationService,
};
use mela_core::{CoreError, CoreResult};

/// Client for the remote registration service that stores bookings and issues tickets.
#[derive(Clone)]
pub struct HttpRegistrationService {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistrationService {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

/// The service does not promise JSON on failures; anything unreadable is an empty failure body.
pub fn parse_body(raw: &str) -> RegistrationBody {
    serde_json::from_str(raw).unwrap_or_default()
}

#[async_trait]
impl RegistrationService for HttpRegistrationService {
    async fn register(&self, payload: &RegistrationPayload) -> CoreResult<RegistrationReply> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| CoreError::RegistrationError(e.to_string()))?;

        let status = resp.status().as_u16();
        let raw = resp
            .text()
            .await
            .map_err(|e| CoreError::RegistrationError(e.to_string()))?;

        let body = parse_body(&raw);
        if body.success {
            info!("Registration service accepted booking ({})", status);
        } else {
            warn!("Registration service returned {} without success", status);
        }

        Ok(RegistrationReply { status, body })
    }
}
