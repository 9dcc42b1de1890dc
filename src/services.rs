pub mod auth;
pub mod crm_service;
pub mod dashboard_service;
pub mod goal_service;
pub mod habit_service;
pub mod notification_service;
pub mod policy;
pub mod template_service;
pub mod visibility;
pub mod workspace;
