use campus::database::ExclusiveFlag;
use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use sea_orm::Condition;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "academic_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
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
    #[sea_orm(has_many = "super::terms::Entity")]
    Terms,
}

impl Related<super::terms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Terms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Academic session";

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

/// One current session per school
pub fn current_flag(school_id: i64) -> ExclusiveFlag<Entity> {
    ExclusiveFlag::new(
        Column::IsCurrent,
        Column::Id,
        Condition::all().add(Column::SchoolId.eq(school_id)),
    )
    .locking::<super::schools::Entity>(super::schools::Column::Id, school_id)
}

pub async fn current<C: ConnectionTrait>(db: &C, school_id: i64) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::SchoolId.eq(school_id))
        .filter(Column::IsCurrent.eq(true))
        .filter(Column::DeletedAt.is_null())
        .one(db)
        .await
}
