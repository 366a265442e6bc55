use sea_orm::entity::prelude::*;
use serde::Serialize;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PAID: &str = "paid";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "payrolls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub school_id: i64,
    pub staff_id: i64,
    pub month: i32,
    pub year: i32,
    pub basic_salary: i64,
    pub allowances: i64,
    pub deductions: i64,
    pub net_salary: i64,
    pub status: String,
    pub paid_at: Option<DateTime>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::staff::Entity",
        from = "Column::StaffId",
        to = "super::staff::Column::Id"
    )]
    Staff,
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Staff.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl campus::database::Model for Entity {
    const LABEL: &'static str = "Payroll";

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
    pub fn is_paid(&self) -> bool {
        self.status == STATUS_PAID
    }
}

/// `basic + allowances - deductions` in minor units
///
/// `None` when the deductions exceed the gross or the sum overflows.
pub fn net_salary(basic_salary: i64, allowances: i64, deductions: i64) -> Option<i64> {
    basic_salary
        .checked_add(allowances)?
        .checked_sub(deductions)
        .filter(|net| *net >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nets_allowances_and_deductions() {
        assert_eq!(net_salary(250_000, 30_000, 15_500), Some(264_500));
        assert_eq!(net_salary(250_000, 0, 250_000), Some(0));
    }

    #[test]
    fn deductions_may_not_exceed_gross() {
        assert_eq!(net_salary(100, 50, 151), None);
        assert_eq!(net_salary(i64::MAX, 1, 0), None);
    }
}
