#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::struct_excessive_bools
)]
mod media;
mod metric;

pub use media::*;
pub use metric::*;
