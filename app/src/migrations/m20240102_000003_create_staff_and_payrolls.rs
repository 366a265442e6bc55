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
                        .table(Staff::Table)
                        .if_not_exists()
                        .col(id(Staff::Id))
                        .col(foreign(Staff::SchoolId))
                        .col(foreign_null(Staff::UserId))
                        .col(string(Staff::EmployeeNo))
                        .col(string(Staff::Name))
                        .col(string(Staff::Email))
                        .col(string(Staff::Designation))
                        .col(money(Staff::BasicSalary)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(
                index("idx_staff_employee_no", Staff::Table, &["school_id", "employee_no"])
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Payrolls::Table)
                        .if_not_exists()
                        .col(id(Payrolls::Id))
                        .col(foreign(Payrolls::SchoolId))
                        .col(foreign(Payrolls::StaffId))
                        .col(integer(Payrolls::Month))
                        .col(integer(Payrolls::Year))
                        .col(money(Payrolls::BasicSalary))
                        .col(money(Payrolls::Allowances))
                        .col(money(Payrolls::Deductions))
                        .col(money(Payrolls::NetSalary))
                        .col(string(Payrolls::Status))
                        .col(timestamp_null(Payrolls::PaidAt))
                        .col(string_null(Payrolls::PaymentReference)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(index(
                "idx_payrolls_period",
                Payrolls::Table,
                &["school_id", "staff_id", "year", "month"],
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payrolls::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Staff::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Staff {
    Table,
    Id,
    SchoolId,
    UserId,
    EmployeeNo,
    Name,
    Email,
    Designation,
    BasicSalary,
}

#[derive(DeriveIden)]
enum Payrolls {
    Table,
    Id,
    SchoolId,
    StaffId,
    Month,
    Year,
    BasicSalary,
    Allowances,
    Deductions,
    NetSalary,
    Status,
    PaidAt,
    PaymentReference,
}
