pub use sea_orm_migration::prelude::*;

use campus::notification::CreateNotificationsTable;
use campus::queue::CreateJobsTable;

mod columns;
mod m20240102_000001_create_schools_and_users;
mod m20240102_000002_create_academics;
mod m20240102_000003_create_staff_and_payrolls;
mod m20240102_000004_create_transport;
mod m20240102_000005_create_hostels_and_notices;
mod m20240102_000006_create_promotions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(CreateJobsTable),
            Box::new(CreateNotificationsTable),
            Box::new(m20240102_000001_create_schools_and_users::Migration),
            Box::new(m20240102_000002_create_academics::Migration),
            Box::new(m20240102_000003_create_staff_and_payrolls::Migration),
            Box::new(m20240102_000004_create_transport::Migration),
            Box::new(m20240102_000005_create_hostels_and_notices::Migration),
            Box::new(m20240102_000006_create_promotions::Migration),
        ]
    }
}
