//! Email delivery infrastructure

pub mod smtp;
