pub mod auth;
pub mod basket;
pub mod catalog;
pub mod contacts;
pub mod import;
pub mod orders;
