use thiserror::Error;
use tracing::debug;

use crate::domain::communication::{email_addresses::EmailAddressError, mailer::MailerError};

/// Errors that can occur while dispatching a mail request
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request is missing something or is malformed
    #[error("{0}")]
    InvalidRequest(String),

    /// The recipient address is not a valid email address
    #[error("invalid recipient address")]
    InvalidRecipient(#[source] EmailAddressError),

    /// The reply-to address is not a valid email address
    #[error("invalid reply-to address")]
    InvalidReplyTo(#[source] EmailAddressError),

    /// The mailer refused one of the addresses
    #[error("undeliverable email address")]
    UndeliverableAddress,

    /// The mailer failed to deliver the message
    #[error("could not send email")]
    CouldNotSend(#[source] MailerError),

    /// The mailer did not finish in time
    #[error("timed out sending email")]
    Timeout,
}

impl From<MailerError> for DispatchError {
    fn from(err: MailerError) -> Self {
        debug!("MailerError -> DispatchError");

        match err {
            MailerError::Timeout(_) => DispatchError::Timeout,
            MailerError::InvalidEmail => DispatchError::UndeliverableAddress,
            err => DispatchError::CouldNotSend(err),
        }
    }
}
