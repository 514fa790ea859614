//! Mail dispatch module.

mod errors;
mod request;
mod service;

pub use errors::DispatchError;
pub use request::MailRequest;
pub use service::{DispatchService, DispatchServiceImpl, DEFAULT_SUBJECT};
