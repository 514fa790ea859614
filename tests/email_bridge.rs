use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use site::{
    domain::communication::{
        email_addresses::EmailAddress,
        mailer::{Mailer, MailerError, Message},
    },
    infrastructure::{
        config::{build_default, BridgeConfig, HumanDuration},
        email::smtp::{SmtpMailer, SmtpSecurity},
        http::site_router,
    },
};
use tempfile::TempDir;
use testresult::TestResult;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::Mutex,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Accept,
    Reject,
    Silent,
}

/// A minimal SMTP relay listening on localhost
struct SmtpStub {
    address: SocketAddr,
    messages: Arc<Mutex<Vec<String>>>,
}

impl SmtpStub {
    async fn start(behaviour: Behaviour) -> TestResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let messages = Arc::new(Mutex::new(Vec::new()));

        let received = messages.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(session(socket, received.clone(), behaviour));
            }
        });

        Ok(Self { address, messages })
    }

    async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

async fn session(
    socket: TcpStream,
    messages: Arc<Mutex<Vec<String>>>,
    behaviour: Behaviour,
) -> std::io::Result<()> {
    if behaviour == Behaviour::Silent {
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(socket);
        return Ok(());
    }

    let (read, mut write) = socket.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut data: Option<String> = None;

    write.write_all(b"220 stub ESMTP ready\r\n").await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r');

        if let Some(buffer) = data.as_mut() {
            if line == "." {
                messages.lock().await.push(std::mem::take(buffer));
                data = None;
                write.write_all(b"250 2.0.0 queued\r\n").await?;
            } else {
                buffer.push_str(line);
                buffer.push('\n');
            }
            continue;
        }

        let command = line.to_ascii_uppercase();
        let reply: &[u8] = if command.starts_with("EHLO") || command.starts_with("HELO") {
            b"250-stub\r\n250 AUTH PLAIN LOGIN\r\n"
        } else if command.starts_with("AUTH") {
            b"235 2.7.0 authenticated\r\n"
        } else if command.starts_with("MAIL FROM") && behaviour == Behaviour::Reject {
            b"550 5.7.1 sender rejected\r\n"
        } else if command.starts_with("MAIL FROM")
            || command.starts_with("RCPT TO")
            || command.starts_with("RSET")
            || command.starts_with("NOOP")
        {
            b"250 2.0.0 ok\r\n"
        } else if command.starts_with("DATA") {
            data = Some(String::new());
            b"354 end data with <CR><LF>.<CR><LF>\r\n"
        } else if command.starts_with("QUIT") {
            write.write_all(b"221 2.0.0 bye\r\n").await?;
            break;
        } else {
            b"502 5.5.2 command not recognized\r\n"
        };

        write.write_all(reply).await?;
    }

    Ok(())
}

fn bridge_config(port: u16) -> BridgeConfig {
    let mut config = build_default();
    config.routes.prefix = "_api/".to_string();
    config.sender.email = "site@example.com".to_string();
    config.sender.smtp_login = "site@example.com".to_string();
    config.sender.smtp_password = "secret".to_string();
    config.sender.smtp_host = "127.0.0.1".to_string();
    config.sender.smtp_port = port;
    config.sender.security = SmtpSecurity::None;
    config.sender.timeout = HumanDuration::from_secs(2);
    config
}

fn closed_port() -> TestResult<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn public_dir() -> TestResult<TempDir> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("index.html"), "<h1>still here</h1>")?;
    Ok(dir)
}

fn message() -> TestResult<Message> {
    Ok(Message {
        to: EmailAddress::new("someone@example.org")?,
        from: EmailAddress::new("site@example.com")?,
        reply_to: Some(EmailAddress::new("visitor@example.net")?),
        subject: "Hello".to_string(),
        body: "Is anybody out there?".to_string(),
    })
}

#[tokio::test]
async fn test_smtp_mailer_delivers_to_relay() -> TestResult {
    let stub = SmtpStub::start(Behaviour::Accept).await?;
    let mailer = SmtpMailer::new(&bridge_config(stub.address.port()).sender)?;

    mailer.send(&message()?).await?;

    let messages = stub.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Subject: Hello"));
    assert!(messages[0].contains("Reply-To: visitor@example.net"));
    assert!(messages[0].contains("Is anybody out there?"));

    Ok(())
}

#[tokio::test]
async fn test_smtp_mailer_rejected_by_relay() -> TestResult {
    let stub = SmtpStub::start(Behaviour::Reject).await?;
    let mailer = SmtpMailer::new(&bridge_config(stub.address.port()).sender)?;

    let result = mailer.send(&message()?).await;

    assert!(matches!(result, Err(MailerError::SendError)));
    assert!(stub.messages().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_smtp_mailer_unreachable_relay() -> TestResult {
    let mailer = SmtpMailer::new(&bridge_config(closed_port()?).sender)?;

    let result = mailer.send(&message()?).await;

    assert!(result.is_err());
    assert!(!matches!(result, Err(MailerError::Timeout(_))));

    Ok(())
}

#[tokio::test]
async fn test_smtp_mailer_times_out_on_silent_relay() -> TestResult {
    let stub = SmtpStub::start(Behaviour::Silent).await?;
    let mut config = bridge_config(stub.address.port());
    config.sender.timeout = HumanDuration::from_secs(1);
    let mailer = SmtpMailer::new(&config.sender)?;

    let result = mailer.send(&message()?).await;

    assert!(matches!(result, Err(MailerError::Timeout(_))));

    Ok(())
}

#[tokio::test]
async fn test_email_endpoint_with_reachable_relay() -> TestResult {
    let stub = SmtpStub::start(Behaviour::Accept).await?;
    let dir = public_dir()?;
    let config = bridge_config(stub.address.port());

    let server = TestServer::new(site_router(dir.path(), None, Some(&config))?)?;

    let response = server
        .post("/_api/email")
        .json(&json!({
            "email": "visitor@example.net",
            "subject": "Contact form",
            "message": "Hello from the site",
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "success": true }));

    let messages = stub.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("To: site@example.com"));
    assert!(messages[0].contains("Subject: Contact form"));

    Ok(())
}

#[tokio::test]
async fn test_email_endpoint_with_unreachable_relay_keeps_serving() -> TestResult {
    let dir = public_dir()?;
    let config = bridge_config(closed_port()?);

    let server = TestServer::new(site_router(dir.path(), None, Some(&config))?)?;

    let response = server
        .post("/_api/email")
        .json(&json!({ "body": "Hello" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = server
        .post("/_api/email")
        .json(&json!({ "body": "Hello again" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = server.get("/index.html").await;
    response.assert_status_ok();
    response.assert_text("<h1>still here</h1>");

    Ok(())
}

#[tokio::test]
async fn test_email_endpoint_with_rejecting_relay() -> TestResult {
    let stub = SmtpStub::start(Behaviour::Reject).await?;
    let dir = public_dir()?;
    let config = bridge_config(stub.address.port());

    let server = TestServer::new(site_router(dir.path(), None, Some(&config))?)?;

    let response = server
        .post("/_api/email")
        .form(&[("message", "Hello")])
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("Could not send email"));

    Ok(())
}

#[tokio::test]
async fn test_email_endpoint_rejects_malformed_reply_to() -> TestResult {
    let stub = SmtpStub::start(Behaviour::Accept).await?;
    let dir = public_dir()?;
    let config = bridge_config(stub.address.port());

    let server = TestServer::new(site_router(dir.path(), None, Some(&config))?)?;

    for reply_to in ["a<b@x.com", "visitor@example.net>"] {
        let response = server
            .post("/_api/email")
            .json(&json!({ "replyTo": reply_to, "body": "hi" }))
            .await;

        assert_eq!(
            response.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "{reply_to}"
        );
    }

    assert!(stub.messages().await.is_empty());

    Ok(())
}
