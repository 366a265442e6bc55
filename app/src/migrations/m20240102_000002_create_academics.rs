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
                        .table(AcademicSessions::Table)
                        .if_not_exists()
                        .col(id(AcademicSessions::Id))
                        .col(foreign(AcademicSessions::SchoolId))
                        .col(string(AcademicSessions::Name))
                        .col(date(AcademicSessions::StartsOn))
                        .col(date(AcademicSessions::EndsOn))
                        .col(flag(AcademicSessions::IsCurrent)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(index(
                "idx_academic_sessions_school",
                AcademicSessions::Table,
                &["school_id", "is_current"],
            ))
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Terms::Table)
                        .if_not_exists()
                        .col(id(Terms::Id))
                        .col(foreign(Terms::SchoolId))
                        .col(foreign(Terms::AcademicSessionId))
                        .col(string(Terms::Name))
                        .col(date(Terms::StartsOn))
                        .col(date(Terms::EndsOn))
                        .col(flag(Terms::IsCurrent)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(index("idx_terms_school", Terms::Table, &["school_id", "is_current"]))
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(ClassSections::Table)
                        .if_not_exists()
                        .col(id(ClassSections::Id))
                        .col(foreign(ClassSections::SchoolId))
                        .col(string(ClassSections::Name))
                        .col(integer(ClassSections::GradeLevel))
                        .col(string(ClassSections::Section))
                        .col(integer(ClassSections::Capacity)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(index("idx_class_sections_school", ClassSections::Table, &["school_id"]))
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Timetables::Table)
                        .if_not_exists()
                        .col(id(Timetables::Id))
                        .col(foreign(Timetables::SchoolId))
                        .col(foreign(Timetables::ClassSectionId))
                        .col(string(Timetables::Name))
                        .col(date(Timetables::EffectiveFrom))
                        .col(flag(Timetables::IsActive)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(index(
                "idx_timetables_section",
                Timetables::Table,
                &["class_section_id", "is_active"],
            ))
            .await?;

        manager
            .create_table(
                timestamps(
                    Table::create()
                        .table(Students::Table)
                        .if_not_exists()
                        .col(id(Students::Id))
                        .col(foreign(Students::SchoolId))
                        .col(foreign_null(Students::ClassSectionId))
                        .col(foreign_null(Students::AcademicSessionId))
                        .col(string(Students::AdmissionNo))
                        .col(string(Students::FirstName))
                        .col(string(Students::LastName))
                        .col(string(Students::Gender))
                        .col(ColumnDef::new(Students::DateOfBirth).date().null())
                        .col(string_null(Students::GuardianPhone))
                        .col(string(Students::Status)),
                    true,
                )
                .to_owned(),
            )
            .await?;
        manager
            .create_index(
                index("idx_students_admission_no", Students::Table, &["school_id", "admission_no"])
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(index(
                "idx_students_class_section",
                Students::Table,
                &["class_section_id", "academic_session_id"],
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Timetables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassSections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Terms::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AcademicSessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AcademicSessions {
    Table,
    Id,
    SchoolId,
    Name,
    StartsOn,
    EndsOn,
    IsCurrent,
}

#[derive(DeriveIden)]
enum Terms {
    Table,
    Id,
    SchoolId,
    AcademicSessionId,
    Name,
    StartsOn,
    EndsOn,
    IsCurrent,
}

#[derive(DeriveIden)]
enum ClassSections {
    Table,
    Id,
    SchoolId,
    Name,
    GradeLevel,
    Section,
    Capacity,
}

#[derive(DeriveIden)]
enum Timetables {
    Table,
    Id,
    SchoolId,
    ClassSectionId,
    Name,
    EffectiveFrom,
    IsActive,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    SchoolId,
    ClassSectionId,
    AcademicSessionId,
    AdmissionNo,
    FirstName,
    LastName,
    Gender,
    DateOfBirth,
    GuardianPhone,
    Status,
}
