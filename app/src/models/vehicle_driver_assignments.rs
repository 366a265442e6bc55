use sea_orm::entity::prelude::*;
use sea_orm::{QueryFilter, QueryOrder};
use serde::Serialize;

/// One stint of a staff member driving a vehicle; open while `unassigned_at` is NULL
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "vehicle_driver_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub vehicle_id: i64,
    pub staff_id: i64,
    pub assigned_at: DateTime,
    pub unassigned_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicles::Entity",
        from = "Column::VehicleId",
        to = "super::vehicles::Column::Id"
    )]
    Vehicle,
    #[sea_orm(
        belongs_to = "super::staff::Entity",
        from = "Column::StaffId",
        to = "super::staff::Column::Id"
    )]
    Staff,
}

impl Related<super::vehicles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Staff.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_open(&self) -> bool {
        self.unassigned_at.is_none()
    }
}

pub async fn open_for_vehicle<C: ConnectionTrait>(
    db: &C,
    vehicle_id: i64,
) -> Result<Option<Model>, DbErr> {
    Entity::find()
        .filter(Column::VehicleId.eq(vehicle_id))
        .filter(Column::UnassignedAt.is_null())
        .one(db)
        .await
}

/// Assignment history of a vehicle, newest first
pub async fn history<C: ConnectionTrait>(
    db: &C,
    vehicle_id: i64,
) -> Result<Vec<(Model, Option<super::staff::Model>)>, DbErr> {
    Entity::find()
        .filter(Column::VehicleId.eq(vehicle_id))
        .order_by_desc(Column::AssignedAt)
        .order_by_desc(Column::Id)
        .find_also_related(super::staff::Entity)
        .all(db)
        .await
}
