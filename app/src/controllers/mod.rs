pub mod academic_sessions;
pub mod auth;
pub mod class_sections;
pub mod dashboard;
pub mod hostels;
pub mod notices;
pub mod notifications;
pub mod payrolls;
pub mod promotions;
pub mod reports;
pub mod staff;
pub mod students;
mod support;
pub mod terms;
pub mod timetables;
pub mod transport_routes;
pub mod vehicles;
