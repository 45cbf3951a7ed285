pub mod common;
pub mod optional_user;
