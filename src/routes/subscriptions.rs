use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};

use crate::mailchimp::{MailchimpClient, MailchimpRejection, NewMember, SubscribeError};
use crate::routes::error_chain_fmt;

#[derive(serde::Deserialize)]
pub struct SubscriptionRequest {
    email: Option<String>,
    tags: Option<Tags>,
}

/// Callers send either a single tag or a list of them.
#[derive(serde::Deserialize)]
#[serde(untagged)]
pub enum Tags {
    One(String),
    Many(Vec<String>),
}

impl Tags {
    /// Normalizes to a list, treating an empty tag or empty list as absent
    /// so the upstream payload carries no `tags` key at all.
    fn into_list(self) -> Option<Vec<String>> {
        match self {
            Tags::One(tag) if tag.is_empty() => None,
            Tags::One(tag) => Some(vec![tag]),
            Tags::Many(tags) if tags.is_empty() => None,
            Tags::Many(tags) => Some(tags),
        }
    }
}

#[derive(serde::Serialize)]
struct SuccessBody {
    success: bool,
    message: &'static str,
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorBody {
    fn new(error: &str) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    fn with_code(error: &str, code: &str) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
        }
    }
}

#[derive(thiserror::Error)]
pub enum SubscriptionProxyError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Failed to parse the request body")]
    MalformedBody(#[source] serde_json::Error),
    #[error(transparent)]
    Upstream(#[from] SubscribeError),
}

impl std::fmt::Debug for SubscriptionProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriptionProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionProxyError::MissingEmail => StatusCode::BAD_REQUEST,
            SubscriptionProxyError::Upstream(SubscribeError::Rejected(_)) => {
                StatusCode::BAD_REQUEST
            }
            SubscriptionProxyError::MalformedBody(_)
            | SubscriptionProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Only curated messages go to the client; upstream detail is already
        // logged where it was classified and the API key never leaves the
        // server
        let body = match self {
            SubscriptionProxyError::MissingEmail => ErrorBody::new("Email is required"),
            SubscriptionProxyError::Upstream(SubscribeError::Rejected(rejection)) => {
                rejection_body(rejection)
            }
            SubscriptionProxyError::Upstream(SubscribeError::MissingCredentials) => {
                ErrorBody::new("Server configuration error")
            }
            SubscriptionProxyError::MalformedBody(_)
            | SubscriptionProxyError::Upstream(SubscribeError::Unexpected(_)) => {
                ErrorBody::new("An error occurred. Please try again.")
            }
        };
        json_response(self.status_code(), &body)
    }
}

fn rejection_body(rejection: &MailchimpRejection) -> ErrorBody {
    match rejection {
        MailchimpRejection::MemberExists => {
            ErrorBody::with_code("This email is already subscribed.", "MEMBER_EXISTS")
        }
        MailchimpRejection::InvalidResource => {
            ErrorBody::with_code("Please enter a valid email address.", "INVALID_EMAIL")
        }
        MailchimpRejection::Other { title, detail } => ErrorBody {
            error: detail
                .clone()
                .unwrap_or_else(|| "Subscription failed. Please try again.".into()),
            code: title.clone(),
        },
    }
}

// The browser client sits on another origin, so every response it can see
// needs the CORS headers
fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Headers", "Content-Type"))
        .json(body)
}

pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorBody::new("Method not allowed"))
}

#[tracing::instrument(name = "Proxy a subscription request", skip(body, mailchimp_client))]
pub async fn subscribe(
    body: web::Bytes,
    mailchimp_client: web::Data<MailchimpClient>,
) -> Result<HttpResponse, SubscriptionProxyError> {
    let request: SubscriptionRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse the request body: {:?}", e);
        SubscriptionProxyError::MalformedBody(e)
    })?;

    let email = request
        .email
        .filter(|email| !email.is_empty())
        .ok_or(SubscriptionProxyError::MissingEmail)?;
    let member = NewMember {
        email,
        tags: request.tags.and_then(Tags::into_list),
    };

    mailchimp_client.subscribe(&member).await?;

    Ok(json_response(
        StatusCode::OK,
        &SuccessBody {
            success: true,
            message: "Please check your email to confirm your subscription!",
        },
    ))
}
