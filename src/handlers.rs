pub mod auth;
pub mod crm;
pub mod dashboard;
pub mod goals;
pub mod habits;
pub mod notifications;
pub mod settings;
pub mod users;
