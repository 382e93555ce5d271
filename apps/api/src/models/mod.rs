pub mod portrait;
pub mod user;
