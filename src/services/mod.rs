pub mod auth;
pub mod identity;
pub mod meetme;
pub mod numbering;
