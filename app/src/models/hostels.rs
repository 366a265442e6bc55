use sea_orm::entity::prelude::*;
use serde::Serialize;

pub const KINDS: [&str; 3] = ["boys", "girls", "mixed"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "hostels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub name: String,
    pub kind: String,
    pub capacity: i32,
    pub warden_name: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Hostel";

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
