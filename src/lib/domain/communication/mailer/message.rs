//! Email message

use crate::domain::communication::email_addresses::EmailAddress;

/// A single outbound email, built per request and dropped after the send attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// The recipient of the email
    pub to: EmailAddress,

    /// The sender of the email
    pub from: EmailAddress,

    /// Where replies should go, if not to the sender
    pub reply_to: Option<EmailAddress>,

    /// The subject of the email
    pub subject: String,

    /// The plain text body of the email
    pub body: String,
}
