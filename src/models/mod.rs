pub mod meetme;
pub mod message;
pub mod permission;
pub mod status;
pub mod user;
