//! Mailer capability

use async_trait::async_trait;

mod errors;
mod message;

pub use errors::MailerError;
pub use message::Message;

/// Something that can deliver a [`Message`]
#[async_trait]
pub trait Mailer: Clone + Send + Sync + 'static {
    /// Send an email
    ///
    /// # Arguments
    /// * `message` - The fully addressed [`Message`] to deliver.
    ///
    /// # Returns
    /// A [`Result`] indicating success or failure. Each call is a single
    /// delivery attempt.
    async fn send(&self, message: &Message) -> Result<(), MailerError>;
}

#[cfg(test)]
pub mod tests {
    //! Mock mailer

    use async_trait::async_trait;
    use mockall::mock;

    use super::*;

    mock! {
        pub Mailer {}

        impl Clone for Mailer {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl Mailer for Mailer {
            async fn send(&self, message: &Message) -> Result<(), MailerError>;
        }
    }
}
