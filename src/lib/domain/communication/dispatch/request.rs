/// An unvalidated request to send mail, as received from a client
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MailRequest {
    /// Recipient, defaults to the sender identity
    pub to: Option<String>,

    /// Address replies should go to
    pub reply_to: Option<String>,

    /// Subject line
    pub subject: Option<String>,

    /// Plain text body
    pub body: String,
}
