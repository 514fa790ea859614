//! Outbound communication: addresses, messages, mailers and dispatch

pub mod dispatch;
pub mod email_addresses;
pub mod mailer;
