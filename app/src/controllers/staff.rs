use campus::database::{Model, Trashed};
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, FrameworkError, Inertia, Redirect, Request, Response, DB};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{now, payrolls, staff, users};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct StaffForm {
    pub user_id: Option<i64>,
    #[validate(length(min = 1, max = 50))]
    pub employee_no: String,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub designation: String,
    #[validate(range(min = 0))]
    pub basic_salary: i64,
}

impl FormRequest for StaffForm {}

impl StaffForm {
    async fn check<C: ConnectionTrait>(&self, db: &C, school_id: i64, id: Option<i64>) -> Result<(), FrameworkError> {
        if let Some(user_id) = self.user_id {
            support::exists::<users::Entity, _>(db, school_id, user_id, "user_id").await?;
        }

        let mut duplicate = staff::Entity::query(school_id, Trashed::With)
            .filter(staff::Column::EmployeeNo.eq(self.employee_no.as_str()));
        if let Some(id) = id {
            duplicate = duplicate.filter(staff::Column::Id.ne(id));
        }
        if duplicate.count(db).await? > 0 {
            return Err(support::taken("employee_no"));
        }
        Ok(())
    }
}

fn table() -> TableSpec<staff::Entity> {
    use staff::Column;

    TableSpec::new(Column::Id)
        .search(Column::Name)
        .search(Column::EmployeeNo)
        .search(Column::Email)
        .search(Column::Designation)
        .sort("name", Column::Name)
        .sort("employee_no", Column::EmployeeNo)
        .sort("designation", Column::Designation)
        .sort("basic_salary", Column::BasicSalary)
        .filter("designation", Column::Designation, FilterKind::Text)
        .filter("user_id", Column::UserId, FilterKind::Integer)
        .soft_deletes(Column::DeletedAt)
        .default_sort("name", SortDirection::Asc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Staff, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let staff = table()
        .paginate(staff::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Staff/Index",
        json!({ "staff": staff, "can": support::abilities(&user, Resource::Staff) }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Staff, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let member = staff::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    // Payroll history is for those who may see payrolls
    let payrolls = if user.can(Resource::Payrolls, Ability::View) {
        payrolls::Entity::query(user.school_id, Trashed::Without)
            .filter(payrolls::Column::StaffId.eq(member.id))
            .order_by_desc(payrolls::Column::Year)
            .order_by_desc(payrolls::Column::Month)
            .all(db.inner())
            .await?
    } else {
        Vec::new()
    };

    Inertia::render("Staff/Show", json!({ "staff": member, "payrolls": payrolls }))
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Staff, Ability::Create)?;
    let form: StaffForm = req.validated()?;
    let db = DB::connection()?;
    form.check(db.inner(), user.school_id, None).await?;
    let now = now();

    let member = staff::ActiveModel {
        school_id: Set(user.school_id),
        user_id: Set(form.user_id),
        employee_no: Set(form.employee_no),
        name: Set(form.name),
        email: Set(form.email),
        designation: Set(form.designation),
        basic_salary: Set(form.basic_salary),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    let id = member.id.to_string();
    support::created(&member, "Staff member created.", Redirect::route("staff.show", &[("id", &id)]))
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Staff, Ability::Update)?;
    let id = support::id(&req)?;
    let form: StaffForm = req.validated()?;
    let db = DB::connection()?;

    let member = staff::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    form.check(db.inner(), user.school_id, Some(member.id)).await?;

    let mut member = member.into_active_model();
    member.user_id = Set(form.user_id);
    member.employee_no = Set(form.employee_no);
    member.name = Set(form.name);
    member.email = Set(form.email);
    member.designation = Set(form.designation);
    member.basic_salary = Set(form.basic_salary);
    member.updated_at = Set(now());
    let member = member.update(db.inner()).await?;

    let id = member.id.to_string();
    support::updated(&member, "Staff member updated.", Redirect::route("staff.show", &[("id", &id)]))
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<staff::Entity>(&req, Resource::Staff, "staff.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<staff::Entity>(&req, Resource::Staff, "staff.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<staff::Entity>(&req, Resource::Staff, "staff.index").await
}
