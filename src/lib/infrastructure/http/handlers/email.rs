//! Send email handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    domain::communication::dispatch::{DispatchError, DispatchService, MailRequest},
    infrastructure::http::{errors::ApiError, state::BridgeState},
};

use super::extract::JsonOrForm;

/// Send email request body
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailBody {
    /// Recipient, the sender's own address when omitted
    #[serde(default)]
    pub to: Option<String>,

    /// Address of the visitor, used as Reply-To
    #[serde(default, alias = "email")]
    pub reply_to: Option<String>,

    /// Subject line
    #[serde(default)]
    pub subject: Option<String>,

    /// Message text
    #[serde(default, alias = "message")]
    pub body: String,
}

impl From<SendEmailBody> for MailRequest {
    fn from(body: SendEmailBody) -> Self {
        Self {
            to: body.to,
            reply_to: body.reply_to,
            subject: body.subject,
            body: body.body,
        }
    }
}

/// Send email response body
#[derive(Debug, Serialize, Deserialize)]
pub struct SendEmailResponse {
    /// Whether the relay accepted the message
    pub success: bool,
}

/// Send an email through the configured relay
pub async fn handler<D: DispatchService>(
    State(state): State<BridgeState<D>>,
    JsonOrForm(body): JsonOrForm<SendEmailBody>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    if let Err(err) = state.dispatcher.dispatch(body.into()).await {
        match &err {
            DispatchError::CouldNotSend(source) => {
                warn!(error = %err, cause = %source, "email dispatch failed")
            }
            DispatchError::Timeout => warn!(error = %err, "email dispatch failed"),
            _ => debug!(error = %err, "email request rejected"),
        }

        return Err(err.into());
    }

    Ok(Json(SendEmailResponse { success: true }))
}
