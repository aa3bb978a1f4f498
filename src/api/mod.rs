pub mod attendance;
pub mod dashboard;
