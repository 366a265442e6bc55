//! SeaORM entity for the `jobs` table

pub mod jobs {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "jobs")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub queue: String,
        pub name: String,
        #[sea_orm(column_type = "Text")]
        pub payload: String,
        pub status: String,
        pub attempts: i32,
        pub max_attempts: i32,
        #[sea_orm(column_type = "Text", nullable)]
        pub error: Option<String>,
        pub available_at: DateTime,
        pub reserved_until: Option<DateTime>,
        pub worker_id: Option<String>,
        pub created_at: DateTime,
        pub updated_at: DateTime,
        pub completed_at: Option<DateTime>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
