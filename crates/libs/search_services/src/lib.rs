#![deny(clippy::unwrap_used)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod embedding;
pub mod error;
pub mod index;
pub mod interfaces;
pub mod retry;
pub mod scope;
pub mod service;
pub mod session;
pub mod store;
