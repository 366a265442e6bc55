use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub registration_no: String,
    pub model: String,
    pub capacity: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vehicle_driver_assignments::Entity")]
    DriverAssignments,
    #[sea_orm(has_many = "super::transport_routes::Entity")]
    TransportRoutes,
}

impl Related<super::vehicle_driver_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DriverAssignments.def()
    }
}

impl Related<super::transport_routes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransportRoutes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Vehicle";

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
