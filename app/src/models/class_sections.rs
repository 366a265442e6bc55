use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "class_sections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub name: String,
    pub grade_level: i32,
    pub section: String,
    pub capacity: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::students::Entity")]
    Students,
    #[sea_orm(has_many = "super::timetables::Entity")]
    Timetables,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::timetables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timetables.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Class section";

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
