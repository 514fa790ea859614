//! SMTP email service implementation

use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use clap::{ArgAction, Args, ValueEnum};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        Error as SmtpError,
    },
    AsyncSmtpTransport, AsyncTransport, Message as Email, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    domain::communication::{
        email_addresses::EmailAddress,
        mailer::{Mailer, MailerError, Message},
    },
    infrastructure::config::{serde_as_str, HumanDuration},
};

/// How the connection to the SMTP relay is secured
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS
    #[default]
    #[value(name = "starttls")]
    StartTls,

    /// TLS from the first byte
    Tls,

    /// No encryption, for local relays only
    None,
}

impl fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SmtpSecurity::StartTls => "starttls",
            SmtpSecurity::Tls => "tls",
            SmtpSecurity::None => "none",
        })
    }
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" => Ok(SmtpSecurity::Tls),
            "none" => Ok(SmtpSecurity::None),
            other => Err(format!(
                "unknown SMTP security {other:?}, expected starttls, tls or none"
            )),
        }
    }
}

serde_as_str!(SmtpSecurity);

/// Sender identity and SMTP relay settings
#[derive(Clone, PartialEq, Eq, Args, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SenderConfig {
    /// The sender email address
    #[arg(long, env = "SMTP_SENDER")]
    pub email: String,

    /// The SMTP username
    #[arg(long = "smtpLogin", env = "SMTP_LOGIN")]
    pub smtp_login: String,

    /// The SMTP password
    #[arg(long = "smtpPassword", env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: String,

    /// The SMTP host
    #[arg(long = "smtpHost", default_value = SenderConfig::DEFAULT_HOST)]
    #[serde(default = "default_host")]
    pub smtp_host: String,

    /// The SMTP port
    #[arg(long = "smtpPort", default_value_t = SenderConfig::DEFAULT_PORT)]
    #[serde(default = "default_port")]
    pub smtp_port: u16,

    /// How the SMTP connection is secured
    #[arg(long = "smtpSecurity", value_enum, default_value_t = SmtpSecurity::StartTls)]
    #[serde(default)]
    pub security: SmtpSecurity,

    /// Verify the relay's TLS certificate
    #[arg(long = "smtpVerifyTls", action = ArgAction::Set, default_value_t = true)]
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Upper bound for a single send, e.g. `30s`
    #[arg(long = "smtpTimeout", default_value = "30s")]
    #[serde(default = "default_timeout")]
    pub timeout: HumanDuration,
}

impl SenderConfig {
    /// Default SMTP relay host
    pub const DEFAULT_HOST: &'static str = "smtp.gmail.com";

    /// Default SMTP submission port
    pub const DEFAULT_PORT: u16 = 587;

    /// Default send timeout
    pub const DEFAULT_TIMEOUT: HumanDuration = HumanDuration::from_secs(30);
}

fn default_host() -> String {
    SenderConfig::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    SenderConfig::DEFAULT_PORT
}

fn default_verify_tls() -> bool {
    true
}

fn default_timeout() -> HumanDuration {
    SenderConfig::DEFAULT_TIMEOUT
}

impl fmt::Debug for SenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderConfig")
            .field("email", &self.email)
            .field("smtp_login", &self.smtp_login)
            .field("smtp_password", &"********")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("security", &self.security)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SMTP mailer
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
    timeout: Duration,
}

impl SmtpMailer {
    /// Create a new SMTP mailer for `config`.
    ///
    /// No connection is opened here; the relay is contacted on the first send.
    pub fn new(config: &SenderConfig) -> Result<Self, SmtpError> {
        let creds = Credentials::new(config.smtp_login.clone(), config.smtp_password.clone());
        let timeout = Duration::from(config.timeout);

        let tls_parameters = || {
            TlsParameters::builder(config.smtp_host.clone())
                .dangerous_accept_invalid_certs(!config.verify_tls)
                .build()
        };

        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                    .tls(Tls::Required(tls_parameters()?))
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
                .tls(Tls::Wrapper(tls_parameters()?)),
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            relay: format!("{}:{}", config.smtp_host, config.smtp_port),
            timeout,
        })
    }
}

impl fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("relay", &self.relay)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &Message) -> Result<(), MailerError> {
        let email = build_email(message)?;

        debug!(relay = %self.relay, to = %message.to, "sending email");

        match tokio::time::timeout(self.timeout, self.transport.send(email)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.is_timeout() => Err(MailerError::Timeout(self.timeout)),
            Ok(Err(e)) if e.is_permanent() => {
                warn!(relay = %self.relay, error = %e, "relay rejected email");
                Err(MailerError::SendError)
            }
            Ok(Err(e)) => Err(MailerError::UnknownError(e.into())),
            Err(_) => Err(MailerError::Timeout(self.timeout)),
        }
    }
}

/// Builds the wire message for `message`.
fn build_email(message: &Message) -> Result<Email, MailerError> {
    let mut builder = Email::builder()
        .from(mailbox(&message.from)?)
        .to(mailbox(&message.to)?)
        .subject(message.subject.clone());

    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| MailerError::UnknownError(e.into()))
}

fn mailbox(address: &EmailAddress) -> Result<Mailbox, MailerError> {
    address
        .as_str()
        .parse()
        .map_err(|_| MailerError::InvalidEmail)
}
