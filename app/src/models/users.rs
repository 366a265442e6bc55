use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use serde::Serialize;

use crate::policies::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "User";

    fn key_column() -> Column {
        Column::Id
    }

    fn tenant_column() -> Option<Column> {
        Some(Column::SchoolId)
    }
}

impl Model {
    /// Unknown roles get no permissions
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn notifiable(&self) -> campus::notification::Notifiable {
        campus::notification::Notifiable::new(self.id, &self.email, &self.name)
    }
}

/// Users of a school holding one of `roles`
pub async fn with_roles<C: ConnectionTrait>(
    db: &C,
    school_id: i64,
    roles: &[Role],
) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .filter(Column::SchoolId.eq(school_id))
        .filter(Column::Role.is_in(roles.iter().map(|r| r.as_str())))
        .all(db)
        .await
}
