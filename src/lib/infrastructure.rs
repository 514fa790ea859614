//! Infrastructure layer: configuration, SMTP, HTTP and the command line

pub mod cli;
pub mod config;
pub mod email;
pub mod http;
