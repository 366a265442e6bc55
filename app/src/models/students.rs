use sea_orm::entity::prelude::*;
use serde::Serialize;

pub const STATUSES: [&str; 4] = ["active", "inactive", "graduated", "transferred"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub class_section_id: Option<i64>,
    pub academic_session_id: Option<i64>,
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: Option<Date>,
    pub guardian_phone: Option<String>,
    pub status: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class_sections::Entity",
        from = "Column::ClassSectionId",
        to = "super::class_sections::Column::Id"
    )]
    ClassSection,
    #[sea_orm(
        belongs_to = "super::academic_sessions::Entity",
        from = "Column::AcademicSessionId",
        to = "super::academic_sessions::Column::Id"
    )]
    AcademicSession,
}

impl Related<super::class_sections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClassSection.def()
    }
}

impl Related<super::academic_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicSession.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Student";

    fn key_column() -> Column {
        Column::Id
    }

    fn tenant_column() -> Option<Column> {
        Some(Column::SchoolId)
    }

    fn deleted_at_column() -> Option<Column> {
        Some(Column::DeletedAt)
    }
}

impl campus::database::ModelMut for Entity {}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
