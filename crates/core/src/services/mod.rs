pub mod app_lock;
pub mod auth_service;
pub mod cache;
pub mod currency_service;
pub mod goal_service;
pub mod loading;
pub mod notification;
pub mod pin_service;
pub mod report_service;
pub mod session_service;
pub mod transaction_service;
