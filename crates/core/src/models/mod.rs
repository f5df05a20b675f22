pub mod auth;
pub mod exchange;
pub mod goal;
pub mod pin;
pub mod report;
pub mod settings;
pub mod transaction;
