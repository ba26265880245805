pub mod application;
pub mod identity;
pub mod profile;
