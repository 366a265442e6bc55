use campus::database::ExclusiveFlag;
use sea_orm::entity::prelude::*;
use sea_orm::Condition;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "timetables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub class_section_id: i64,
    pub name: String,
    pub effective_from: Date,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class_sections::Entity",
        from = "Column::ClassSectionId",
        to = "super::class_sections::Column::Id"
    )]
    ClassSection,
}

impl Related<super::class_sections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClassSection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Timetable";

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

/// One active timetable per class section
pub fn active_flag(school_id: i64, class_section_id: i64) -> ExclusiveFlag<Entity> {
    ExclusiveFlag::new(
        Column::IsActive,
        Column::Id,
        Condition::all()
            .add(Column::SchoolId.eq(school_id))
            .add(Column::ClassSectionId.eq(class_section_id)),
    )
    .locking::<super::class_sections::Entity>(super::class_sections::Column::Id, class_section_id)
}
