//! # gpgmail
//!
//! Send encrypted and signed e-mail. Keys for the sender and every recipient
//! are looked up in the local keychain by address before anything is
//! encrypted; the sealed message is then delivered over SMTP.

pub mod backend;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod message;
pub mod transfer;
pub mod ui;

pub use error::{DeliveryError, Error, Result};
