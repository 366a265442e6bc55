//! Small schema shared by the database and query tests

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use sea_orm_migration::prelude::*;

pub mod buildings {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "buildings")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod rooms {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "rooms")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub school_id: i64,
        pub building_id: Option<i64>,
        pub name: String,
        pub capacity: i32,
        pub is_current: bool,
        pub deleted_at: Option<DateTime>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::buildings::Entity",
            from = "Column::BuildingId",
            to = "super::buildings::Column::Id"
        )]
        Building,
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl crate::database::Model for Entity {
        const LABEL: &'static str = "Room";

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

    impl crate::database::ModelMut for Entity {}
}

#[derive(DeriveIden)]
enum Buildings {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Rooms {
    Table,
    Id,
    SchoolId,
    BuildingId,
    Name,
    Capacity,
    IsCurrent,
    DeletedAt,
}

pub struct CreateRooms;

impl MigrationName for CreateRooms {
    fn name(&self) -> &str {
        "m0001_create_rooms"
    }
}

#[async_trait]
impl MigrationTrait for CreateRooms {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Buildings::Table)
                    .col(
                        ColumnDef::new(Buildings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Buildings::Name).string().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Rooms::Table)
                    .col(
                        ColumnDef::new(Rooms::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rooms::SchoolId).big_integer().not_null())
                    .col(ColumnDef::new(Rooms::BuildingId).big_integer().null())
                    .col(ColumnDef::new(Rooms::Name).string().not_null())
                    .col(ColumnDef::new(Rooms::Capacity).integer().not_null())
                    .col(
                        ColumnDef::new(Rooms::IsCurrent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Rooms::DeletedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rooms::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Buildings::Table).to_owned())
            .await
    }
}

pub struct FixtureMigrator;

#[async_trait]
impl MigratorTrait for FixtureMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateRooms)]
    }
}

pub async fn building(db: &DatabaseConnection, name: &str) -> buildings::Model {
    buildings::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn room(
    db: &DatabaseConnection,
    school_id: i64,
    building_id: Option<i64>,
    name: &str,
    capacity: i32,
) -> rooms::Model {
    rooms::ActiveModel {
        school_id: Set(school_id),
        building_id: Set(building_id),
        name: Set(name.to_string()),
        capacity: Set(capacity),
        is_current: Set(false),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
