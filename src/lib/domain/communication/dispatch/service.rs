//! Mail dispatch service

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::{
    email_addresses::EmailAddress,
    mailer::{Mailer, Message},
};

use super::{DispatchError, MailRequest};

/// Subject used when the request does not carry one
pub const DEFAULT_SUBJECT: &str = "Message from website";

/// Turns mail requests into messages and hands them to a mailer
#[async_trait]
pub trait DispatchService: Clone + Send + Sync + 'static {
    /// Validates `request`, addresses it with the sender identity and sends it.
    ///
    /// # Returns
    /// - [`Ok`] once the mailer accepted the message.
    /// - [`Err`] containing a [`DispatchError`] if the request was invalid or
    ///   delivery failed. Nothing is retried.
    async fn dispatch(&self, request: MailRequest) -> Result<(), DispatchError>;
}

#[cfg(test)]
mock! {
    pub DispatchService {}

    impl Clone for DispatchService {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl DispatchService for DispatchService {
        async fn dispatch(&self, request: MailRequest) -> Result<(), DispatchError>;
    }
}

/// Dispatch service implementation
#[derive(Debug, Clone)]
pub struct DispatchServiceImpl<M>
where
    M: Mailer,
{
    sender: EmailAddress,
    mailer: Arc<M>,
}

impl<M> DispatchServiceImpl<M>
where
    M: Mailer,
{
    /// Creates a new dispatch service sending as `sender`.
    pub fn new(sender: EmailAddress, mailer: Arc<M>) -> Self {
        Self { sender, mailer }
    }

    /// The sender identity messages are sent from
    pub fn sender(&self) -> &EmailAddress {
        &self.sender
    }

    fn compose(&self, request: MailRequest) -> Result<Message, DispatchError> {
        let body = request.body.trim();
        if body.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "Please provide a message body".to_string(),
            ));
        }

        let to = match non_blank(request.to.as_deref()) {
            Some(raw) => EmailAddress::new(raw).map_err(DispatchError::InvalidRecipient)?,
            None => self.sender.clone(),
        };

        let reply_to = non_blank(request.reply_to.as_deref())
            .map(EmailAddress::new)
            .transpose()
            .map_err(DispatchError::InvalidReplyTo)?;

        let subject = non_blank(request.subject.as_deref()).unwrap_or(DEFAULT_SUBJECT);

        Ok(Message {
            to,
            from: self.sender.clone(),
            reply_to,
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[async_trait]
impl<M> DispatchService for DispatchServiceImpl<M>
where
    M: Mailer,
{
    async fn dispatch(&self, request: MailRequest) -> Result<(), DispatchError> {
        let message = self.compose(request)?;

        debug!(to = %message.to, subject = %message.subject, "dispatching message");

        self.mailer.send(&message).await?;

        info!(to = %message.to, "email sent");

        Ok(())
    }
}
