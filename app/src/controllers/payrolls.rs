//! Monthly payrolls of staff members
//!
//! A payroll is editable while pending. Marking it paid is a single
//! conditional update, so two concurrent requests cannot both pay it.

use campus::database::{Model, Trashed};
use campus::notification;
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{AppError, FormRequest, FrameworkError, Inertia, Redirect, Request, Response, DB};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    RelationTrait, Set,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{now, payrolls, staff, users};
use crate::notifications::PayrollPaid;
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct PayrollForm {
    pub staff_id: i64,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 2000, max = 2100))]
    pub year: i32,
    /// Defaults to the staff member's basic salary
    #[validate(range(min = 0))]
    pub basic_salary: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub allowances: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub deductions: i64,
}

impl FormRequest for PayrollForm {}

/// Amounts and period resolved against the staff record
struct Figures {
    staff_id: i64,
    month: i32,
    year: i32,
    basic_salary: i64,
    allowances: i64,
    deductions: i64,
    net_salary: i64,
}

impl PayrollForm {
    async fn resolve<C: ConnectionTrait>(&self, db: &C, school_id: i64, id: Option<i64>) -> Result<Figures, FrameworkError> {
        let member = support::exists::<staff::Entity, _>(db, school_id, self.staff_id, "staff_id").await?;
        let basic_salary = self.basic_salary.unwrap_or(member.basic_salary);
        let net_salary = payrolls::net_salary(basic_salary, self.allowances, self.deductions).ok_or_else(|| {
            FrameworkError::validation("deductions", "The deductions may not exceed the gross salary.")
        })?;

        if has_live_duplicate(db, school_id, member.id, self.month, self.year, id).await? {
            return Err(FrameworkError::conflict(format!(
                "{} already has a payroll for {:02}/{}.",
                member.name, self.month, self.year
            )));
        }

        Ok(Figures {
            staff_id: member.id,
            month: self.month,
            year: self.year,
            basic_salary,
            allowances: self.allowances,
            deductions: self.deductions,
            net_salary,
        })
    }
}

/// Another live payroll of the staff member for the month
async fn has_live_duplicate<C: ConnectionTrait>(
    db: &C,
    school_id: i64,
    staff_id: i64,
    month: i32,
    year: i32,
    except: Option<i64>,
) -> Result<bool, FrameworkError> {
    let mut duplicate = payrolls::Entity::query(school_id, Trashed::Without)
        .filter(payrolls::Column::StaffId.eq(staff_id))
        .filter(payrolls::Column::Month.eq(month))
        .filter(payrolls::Column::Year.eq(year));
    if let Some(id) = except {
        duplicate = duplicate.filter(payrolls::Column::Id.ne(id));
    }
    Ok(duplicate.count(db).await? > 0)
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct MarkPaidForm {
    #[validate(length(min = 1, max = 100))]
    pub payment_reference: Option<String>,
}

impl FormRequest for MarkPaidForm {}

fn table() -> TableSpec<payrolls::Entity> {
    use payrolls::Column;

    TableSpec::new(Column::Id)
        .join("staff", || payrolls::Relation::Staff.def())
        .search_related("staff", "name")
        .search_related("staff", "employee_no")
        .sort("year", Column::Year)
        .sort("month", Column::Month)
        .sort("net_salary", Column::NetSalary)
        .sort("status", Column::Status)
        .sort_related("staff_name", "staff", "name")
        .filter("status", Column::Status, FilterKind::Text)
        .filter("month", Column::Month, FilterKind::Integer)
        .filter("year", Column::Year, FilterKind::Integer)
        .filter("staff_id", Column::StaffId, FilterKind::Integer)
        .column_as("staff_name", TableSpec::<payrolls::Entity>::related("staff", "name"))
        .soft_deletes(Column::DeletedAt)
        .default_sort("year", SortDirection::Desc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Payrolls, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let payrolls = table()
        .paginate(payrolls::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Payrolls/Index",
        json!({ "payrolls": payrolls, "can": support::abilities(&user, Resource::Payrolls) }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Payrolls, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let payroll = payrolls::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let member = staff::Entity::find_scoped_with_trashed(db.inner(), user.school_id, payroll.staff_id)
        .await
        .ok();

    Inertia::render("Payrolls/Show", json!({ "payroll": payroll, "staff": member }))
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Payrolls, Ability::Create)?;
    let form: PayrollForm = req.validated()?;
    let db = DB::connection()?;
    let figures = form.resolve(db.inner(), user.school_id, None).await?;
    let now = now();

    let payroll = payrolls::ActiveModel {
        school_id: Set(user.school_id),
        staff_id: Set(figures.staff_id),
        month: Set(figures.month),
        year: Set(figures.year),
        basic_salary: Set(figures.basic_salary),
        allowances: Set(figures.allowances),
        deductions: Set(figures.deductions),
        net_salary: Set(figures.net_salary),
        status: Set(payrolls::STATUS_PENDING.to_string()),
        paid_at: Set(None),
        payment_reference: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    let id = payroll.id.to_string();
    support::created(&payroll, "Payroll created.", Redirect::route("payrolls.show", &[("id", &id)]))
}

/// Change a pending payroll; paid payrolls are 409
pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Payrolls, Ability::Update)?;
    let id = support::id(&req)?;
    let form: PayrollForm = req.validated()?;
    let db = DB::connection()?;

    let current = payrolls::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    if current.is_paid() {
        return Err(paid_conflict().into());
    }
    let figures = form.resolve(db.inner(), user.school_id, Some(id)).await?;

    let changes = payrolls::ActiveModel {
        staff_id: Set(figures.staff_id),
        month: Set(figures.month),
        year: Set(figures.year),
        basic_salary: Set(figures.basic_salary),
        allowances: Set(figures.allowances),
        deductions: Set(figures.deductions),
        net_salary: Set(figures.net_salary),
        updated_at: Set(now()),
        ..Default::default()
    };
    let result = payrolls::Entity::update_many()
        .set(changes)
        .filter(payrolls::Column::Id.eq(id))
        .filter(payrolls::Column::SchoolId.eq(user.school_id))
        .filter(payrolls::Column::Status.eq(payrolls::STATUS_PENDING))
        .filter(payrolls::Column::DeletedAt.is_null())
        .exec(db.inner())
        .await?;
    if result.rows_affected == 0 {
        return Err(paid_conflict().into());
    }

    let payroll = payrolls::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let id = payroll.id.to_string();
    support::updated(&payroll, "Payroll updated.", Redirect::route("payrolls.show", &[("id", &id)]))
}

fn paid_conflict() -> AppError {
    AppError::conflict("Payroll has already been paid.")
}

/// Record payment and notify the staff member's account, if linked
pub async fn mark_paid(req: Request) -> Response {
    let user = authorize(&req, Resource::Payrolls, Ability::Manage)?;
    let id = support::id(&req)?;
    let form: MarkPaidForm = support::optional_input(&req)?;
    let db = DB::connection()?;
    let now = now();

    let result = payrolls::Entity::update_many()
        .col_expr(payrolls::Column::Status, Expr::value(payrolls::STATUS_PAID))
        .col_expr(payrolls::Column::PaidAt, Expr::value(now))
        .col_expr(payrolls::Column::PaymentReference, Expr::value(form.payment_reference))
        .col_expr(payrolls::Column::UpdatedAt, Expr::value(now))
        .filter(payrolls::Column::Id.eq(id))
        .filter(payrolls::Column::SchoolId.eq(user.school_id))
        .filter(payrolls::Column::Status.eq(payrolls::STATUS_PENDING))
        .filter(payrolls::Column::DeletedAt.is_null())
        .exec(db.inner())
        .await?;
    if result.rows_affected == 0 {
        payrolls::Entity::find_scoped(db.inner(), user.school_id, id).await?;
        return Err(paid_conflict().into());
    }

    let payroll = payrolls::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    tracing::info!(payroll_id = payroll.id, user_id = user.id, "payroll marked paid");
    notify_staff(&payroll, user.school_id).await?;

    let id = payroll.id.to_string();
    support::updated(&payroll, "Payroll marked as paid.", Redirect::route("payrolls.show", &[("id", &id)]))
}

async fn notify_staff(payroll: &payrolls::Model, school_id: i64) -> Result<(), FrameworkError> {
    let db = DB::connection()?;
    let member = staff::Entity::find_scoped_with_trashed(db.inner(), school_id, payroll.staff_id).await?;
    let Some(user_id) = member.user_id else {
        return Ok(());
    };
    let Some(account) = users::Entity::find_by_id(user_id).one(db.inner()).await? else {
        return Ok(());
    };

    if let Err(err) = notification::send(&account.notifiable(), &PayrollPaid::new(payroll)).await {
        tracing::warn!(payroll_id = payroll.id, error = %err, "payroll notification not stored");
    }
    Ok(())
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<payrolls::Entity>(&req, Resource::Payrolls, "payrolls.index").await
}

/// Restoring is refused while another payroll covers the same month
pub async fn restore(req: Request) -> Response {
    let user = authorize(&req, Resource::Payrolls, Ability::Restore)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let payroll = payrolls::Entity::find_scoped_with_trashed(db.inner(), user.school_id, id).await?;
    if has_live_duplicate(db.inner(), user.school_id, payroll.staff_id, payroll.month, payroll.year, Some(id)).await? {
        return Err(FrameworkError::conflict(format!(
            "Another payroll already covers {:02}/{} for this staff member.",
            payroll.month, payroll.year
        ))
        .into());
    }
    support::restore::<payrolls::Entity>(&req, Resource::Payrolls, "payrolls.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<payrolls::Entity>(&req, Resource::Payrolls, "payrolls.index").await
}
