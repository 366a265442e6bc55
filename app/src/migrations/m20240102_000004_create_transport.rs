use super::columns::*;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Vehicles::Table)
                        .if_not_exists()
                        .col(id(Vehicles::Id))
                        .col(foreign(Vehicles::SchoolId))
                        .col(string(Vehicles::RegistrationNo))
                        .col(string(Vehicles::Model))
                        .col(integer(Vehicles::Capacity)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(
                index("idx_vehicles_registration", Vehicles::Table, &["school_id", "registration_no"])
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(VehicleDriverAssignments::Table)
                        .if_not_exists()
                        .col(id(VehicleDriverAssignments::Id))
                        .col(foreign(VehicleDriverAssignments::SchoolId))
                        .col(foreign(VehicleDriverAssignments::VehicleId))
                        .col(foreign(VehicleDriverAssignments::StaffId))
                        .col(timestamp(VehicleDriverAssignments::AssignedAt))
                        .col(timestamp_null(VehicleDriverAssignments::UnassignedAt)),
                    false,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(index(
                "idx_driver_assignments_vehicle",
                VehicleDriverAssignments::Table,
                &["vehicle_id", "unassigned_at"],
            ))
            .await?;
        manager
            .create_index(index(
                "idx_driver_assignments_staff",
                VehicleDriverAssignments::Table,
                &["staff_id", "unassigned_at"],
            ))
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(TransportRoutes::Table)
                        .if_not_exists()
                        .col(id(TransportRoutes::Id))
                        .col(foreign(TransportRoutes::SchoolId))
                        .col(foreign_null(TransportRoutes::VehicleId))
                        .col(string(TransportRoutes::Name))
                        .col(string(TransportRoutes::StartPoint))
                        .col(string(TransportRoutes::EndPoint))
                        .col(money(TransportRoutes::Fare)),
                    true,
                )
                .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransportRoutes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VehicleDriverAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vehicles {
    Table,
    Id,
    SchoolId,
    RegistrationNo,
    Model,
    Capacity,
}

#[derive(DeriveIden)]
enum VehicleDriverAssignments {
    Table,
    Id,
    SchoolId,
    VehicleId,
    StaffId,
    AssignedAt,
    UnassignedAt,
}

#[derive(DeriveIden)]
enum TransportRoutes {
    Table,
    Id,
    SchoolId,
    VehicleId,
    Name,
    StartPoint,
    EndPoint,
    Fare,
}
