pub mod error;
pub mod middlewares;
