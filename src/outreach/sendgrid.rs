// src/outreach/sendgrid.rs
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::{Notifier, OutreachError, TemplateMessage};

const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Delivers template messages through SendGrid's dynamic templates.
pub struct SendGridNotifier {
    client: Client,
    api_key: String,
    endpoint: Url,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    dynamic_template_data: &'a serde_json::Value,
}

#[derive(Serialize)]
struct Asm {
    group_id: i64,
}

#[derive(Serialize)]
struct SendPayload<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    reply_to: Address<'a>,
    asm: Asm,
    template_id: &'a str,
}

impl SendGridNotifier {
    pub fn new(api_key: impl Into<String>) -> Result<Self, OutreachError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OutreachError::Notify(e.to_string()))?;
        let endpoint = Url::parse(SEND_URL).map_err(|e| OutreachError::Notify(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint,
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, OutreachError> {
        self.endpoint = Url::parse(endpoint).map_err(|e| OutreachError::Notify(e.to_string()))?;
        Ok(self)
    }
}

/// Replies go back to the sender. The group id must be numeric.
fn payload(message: &TemplateMessage) -> Result<SendPayload<'_>, OutreachError> {
    let group_id = message
        .unsubscribe_group_id
        .trim()
        .parse::<i64>()
        .map_err(|_| {
            OutreachError::Notify(format!(
                "unsubscribe group id '{}' is not a number",
                message.unsubscribe_group_id
            ))
        })?;

    Ok(SendPayload {
        personalizations: vec![Personalization {
            to: vec![Address { email: &message.to }],
            dynamic_template_data: &message.data,
        }],
        from: Address { email: &message.from },
        reply_to: Address { email: &message.from },
        asm: Asm { group_id },
        template_id: &message.template_id,
    })
}

impl Notifier for SendGridNotifier {
    fn send(&self, message: &TemplateMessage) -> Result<(), OutreachError> {
        let body = payload(message)?;

        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| OutreachError::Notify(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let error_body = resp.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OutreachError::Notify(format!("SendGrid returned {status}: {error_body}")));
        }

        tracing::debug!(to = %message.to, template = %message.template_id, "message accepted");
        Ok(())
    }
}
