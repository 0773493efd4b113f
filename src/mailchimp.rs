use anyhow::Context;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

/// Client for the Mailchimp marketing API, scoped to a single audience.
pub struct MailchimpClient {
    http_client: Client,
    base_url: String,
    audience_id: String,
    api_key: SecretString,
}

/// A subscription to forward upstream, after inbound validation.
pub struct NewMember {
    pub email: String,
    pub tags: Option<Vec<String>>,
}

#[derive(serde::Serialize)]
struct MemberRequest<'a> {
    email_address: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
}

/// The error document Mailchimp attaches to non-2xx responses. Both fields
/// are optional in practice, whatever the API reference promises.
#[derive(serde::Deserialize, Debug)]
pub struct UpstreamErrorPayload {
    pub title: Option<String>,
    pub detail: Option<String>,
}

/// Closed set of upstream rejections the proxy knows how to translate.
#[derive(Debug, PartialEq, Eq)]
pub enum MailchimpRejection {
    MemberExists,
    InvalidResource,
    Other {
        title: Option<String>,
        detail: Option<String>,
    },
}

pub fn classify_rejection(payload: UpstreamErrorPayload) -> MailchimpRejection {
    match payload.title.as_deref() {
        Some("Member Exists") => MailchimpRejection::MemberExists,
        Some("Invalid Resource") => MailchimpRejection::InvalidResource,
        _ => MailchimpRejection::Other {
            title: payload.title,
            detail: payload.detail,
        },
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SubscribeError {
    #[error("Mailchimp credentials are not configured")]
    MissingCredentials,
    #[error("Mailchimp rejected the subscription request")]
    Rejected(MailchimpRejection),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl MailchimpClient {
    pub fn new(
        base_url: String,
        audience_id: String,
        api_key: SecretString,
        http_client_timeout: std::time::Duration,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(http_client_timeout)
            .build()
            .expect("Unable to build HTTP client");
        Self {
            http_client,
            base_url,
            audience_id,
            api_key,
        }
    }

    /// Adds `member` to the audience with status `pending`, so Mailchimp
    /// sends a confirmation email before the subscription goes live.
    #[tracing::instrument(
        name = "Forward member to Mailchimp",
        skip(self, member),
        fields(member_email = %member.email)
    )]
    pub async fn subscribe(&self, member: &NewMember) -> Result<(), SubscribeError> {
        if self.api_key.expose_secret().is_empty() || self.audience_id.is_empty() {
            tracing::error!("Missing Mailchimp API key or audience id");
            return Err(SubscribeError::MissingCredentials);
        }

        let url = format!("{}/3.0/lists/{}/members", self.base_url, self.audience_id);
        let request_body = MemberRequest {
            email_address: &member.email,
            status: "pending",
            tags: member.tags.as_deref(),
        };
        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, self.basic_authorization())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach Mailchimp: {:?}", e);
                e
            })
            .context("Failed to issue the member request to Mailchimp")?;

        if response.status().is_success() {
            return Ok(());
        }

        let payload: UpstreamErrorPayload = response
            .json()
            .await
            .context("Failed to parse the Mailchimp error payload")?;
        tracing::error!(
            title = ?payload.title,
            detail = ?payload.detail,
            "Mailchimp rejected the member request"
        );
        Err(SubscribeError::Rejected(classify_rejection(payload)))
    }

    // Mailchimp ignores the Basic-auth username, only the key matters
    fn basic_authorization(&self) -> String {
        let credentials = format!("anystring:{}", self.api_key.expose_secret());
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}
