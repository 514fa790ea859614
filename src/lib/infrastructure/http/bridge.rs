//! Email bridge: an HTTP endpoint that sends mail through the configured relay

use std::sync::Arc;

use axum::{routing::post, Router};
use thiserror::Error;
use tracing::info;

use crate::{
    domain::communication::{
        dispatch::{DispatchService, DispatchServiceImpl},
        email_addresses::{EmailAddress, EmailAddressError},
    },
    infrastructure::{
        config::{BridgeConfig, RoutesConfig},
        email::smtp::{SenderConfig, SmtpMailer},
    },
};

use super::{handlers::email, state::BridgeState};

/// The bridge could not be built from its configuration
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No sender address configured
    #[error("sender email address is empty")]
    EmptySenderEmail,

    /// The sender address is not an email address
    #[error("sender email address is invalid")]
    InvalidSenderEmail(#[source] EmailAddressError),

    /// No SMTP login configured
    #[error("SMTP login is empty")]
    EmptySmtpLogin,

    /// No SMTP host configured
    #[error("SMTP host is empty")]
    EmptySmtpHost,

    /// SMTP port 0
    #[error("SMTP port must be between 1 and 65535")]
    InvalidSmtpPort,

    /// The SMTP transport could not be set up
    #[error("could not set up the SMTP transport")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Path of the send endpoint below `prefix`, e.g. `_api/` gives `/_api/email`.
pub fn endpoint_path(prefix: &str) -> String {
    match prefix.trim_matches('/') {
        "" => "/email".to_string(),
        prefix => format!("/{prefix}/email"),
    }
}

/// Checks the sender identity and returns the address mail is sent from.
pub fn validate_sender(sender: &SenderConfig) -> Result<EmailAddress, BridgeError> {
    let email = EmailAddress::new(&sender.email).map_err(|err| match err {
        EmailAddressError::EmptyEmailAddress => BridgeError::EmptySenderEmail,
        err => BridgeError::InvalidSenderEmail(err),
    })?;

    if sender.smtp_login.trim().is_empty() {
        return Err(BridgeError::EmptySmtpLogin);
    }

    if sender.smtp_host.trim().is_empty() {
        return Err(BridgeError::EmptySmtpHost);
    }

    if sender.smtp_port == 0 {
        return Err(BridgeError::InvalidSmtpPort);
    }

    Ok(email)
}

/// The email bridge, ready to be registered on a router
#[derive(Debug)]
pub struct MailBridge<D: DispatchService> {
    path: String,
    dispatcher: D,
}

impl MailBridge<DispatchServiceImpl<SmtpMailer>> {
    /// Builds a bridge sending through the SMTP relay in `config`.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let sender = validate_sender(&config.sender)?;
        let mailer = SmtpMailer::new(&config.sender)?;

        Ok(Self::new(
            &config.routes,
            DispatchServiceImpl::new(sender, Arc::new(mailer)),
        ))
    }
}

impl<D> MailBridge<D>
where
    D: DispatchService,
{
    /// Builds a bridge around an existing dispatcher.
    pub fn new(routes: &RoutesConfig, dispatcher: D) -> Self {
        Self {
            path: endpoint_path(&routes.prefix),
            dispatcher,
        }
    }

    /// Path the send endpoint is mounted at
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Adds the send endpoint to `router`.
    pub fn register(self, router: Router) -> Router {
        info!(path = %self.path, "email bridge registered");

        let endpoint: Router = Router::new()
            .route(&self.path, post(email::handler::<D>))
            .with_state(BridgeState::new(self.dispatcher));

        router.merge(endpoint)
    }
}

/// Validates `config` and registers an SMTP backed bridge on `router`.
pub fn new_bridge(config: &BridgeConfig, router: Router) -> Result<Router, BridgeError> {
    Ok(MailBridge::from_config(config)?.register(router))
}
