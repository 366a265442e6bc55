use campus::database::ExclusiveFlag;
use sea_orm::entity::prelude::*;
use sea_orm::Condition;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "terms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub academic_session_id: i64,
    pub name: String,
    pub starts_on: Date,
    pub ends_on: Date,
    pub is_current: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::academic_sessions::Entity",
        from = "Column::AcademicSessionId",
        to = "super::academic_sessions::Column::Id"
    )]
    AcademicSession,
}

impl Related<super::academic_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcademicSession.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Term";

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

/// One current term per school
pub fn current_flag(school_id: i64) -> ExclusiveFlag<Entity> {
    ExclusiveFlag::new(
        Column::IsCurrent,
        Column::Id,
        Condition::all().add(Column::SchoolId.eq(school_id)),
    )
    .locking::<super::schools::Entity>(super::schools::Column::Id, school_id)
}
