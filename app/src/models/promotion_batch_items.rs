use sea_orm::entity::prelude::*;
use serde::Serialize;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PROMOTED: &str = "promoted";
/// Student was deleted before the batch ran
pub const STATUS_SKIPPED: &str = "skipped";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "promotion_batch_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub batch_id: i64,
    pub student_id: i64,
    pub status: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promotion_batches::Entity",
        from = "Column::BatchId",
        to = "super::promotion_batches::Column::Id"
    )]
    Batch,
    #[sea_orm(
        belongs_to = "super::students::Entity",
        from = "Column::StudentId",
        to = "super::students::Column::Id"
    )]
    Student,
}

impl Related<super::promotion_batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
