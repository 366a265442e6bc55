//! Entities and their query helpers
//!
//! Tenant-owned entities implement `campus::database::Model`, so lookups
//! go through `find_scoped` and never cross schools.

pub mod academic_sessions;
pub mod api_tokens;
pub mod class_sections;
pub mod hostels;
pub mod notices;
pub mod payrolls;
pub mod promotion_batch_items;
pub mod promotion_batches;
pub mod schools;
pub mod staff;
pub mod students;
pub mod terms;
pub mod timetables;
pub mod transport_routes;
pub mod users;
pub mod vehicle_driver_assignments;
pub mod vehicles;

/// Current time as stored in timestamp columns
pub fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
