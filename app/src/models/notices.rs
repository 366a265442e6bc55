use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::policies::Role;

pub const AUDIENCES: [&str; 3] = ["all", "staff", "teachers"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "notices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub created_by: i64,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub audience: String,
    pub published_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Notice";

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
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Roles that receive this notice
    pub fn audience_roles(&self) -> &'static [Role] {
        match self.audience.as_str() {
            "teachers" => &[Role::Teacher],
            "staff" => &[Role::Accountant, Role::Teacher, Role::TransportManager],
            _ => &[Role::Admin, Role::Accountant, Role::Teacher, Role::TransportManager],
        }
    }
}
