//! Vehicles and their driver assignments
//!
//! A vehicle has at most one open assignment and a staff member drives at
//! most one vehicle. Reassignment closes the open rows and opens a new one
//! in one transaction; closed rows are kept as history.

use campus::database::{Model, ModelMut, Trashed};
use campus::query::{SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, FrameworkError, Inertia, Redirect, Request, Response, DB};
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{now, staff, transport_routes, vehicle_driver_assignments as assignments, vehicles};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct VehicleForm {
    #[validate(length(min = 1, max = 30))]
    pub registration_no: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1, max = 200))]
    pub capacity: i32,
}

impl FormRequest for VehicleForm {}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignDriverForm {
    pub staff_id: i64,
}

impl FormRequest for AssignDriverForm {}

/// A column of the live staff member holding the row's open assignment
fn current_driver(column: staff::Column) -> SimpleExpr {
    let mut sub = Query::select();
    sub.column((staff::Entity, column))
        .from(assignments::Entity)
        .inner_join(
            staff::Entity,
            Expr::col((staff::Entity, staff::Column::Id))
                .equals((assignments::Entity, assignments::Column::StaffId)),
        )
        .and_where(
            Expr::col((assignments::Entity, assignments::Column::VehicleId))
                .equals((vehicles::Entity, vehicles::Column::Id)),
        )
        .and_where(Expr::col((assignments::Entity, assignments::Column::UnassignedAt)).is_null())
        .and_where(Expr::col((staff::Entity, staff::Column::DeletedAt)).is_null())
        .limit(1);
    SimpleExpr::SubQuery(None, Box::new(sub.into_sub_query_statement()))
}

fn table() -> TableSpec<vehicles::Entity> {
    use vehicles::Column;

    TableSpec::new(Column::Id)
        .search(Column::RegistrationNo)
        .search(Column::Model)
        .sort("registration_no", Column::RegistrationNo)
        .sort("model", Column::Model)
        .sort("capacity", Column::Capacity)
        .sort_expr("driver_name", current_driver(staff::Column::Name))
        .column_as("driver_id", current_driver(staff::Column::Id))
        .column_as("driver_name", current_driver(staff::Column::Name))
        .soft_deletes(Column::DeletedAt)
        .default_sort("registration_no", SortDirection::Asc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Vehicles, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let vehicles = table()
        .paginate(vehicles::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Vehicles/Index",
        json!({ "vehicles": vehicles, "can": support::abilities(&user, Resource::Vehicles) }),
    )
}

/// The vehicle with its routes and assignment history, newest first
pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Vehicles, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let vehicle = vehicles::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let history: Vec<serde_json::Value> = assignments::history(db.inner(), vehicle.id)
        .await?
        .into_iter()
        .map(|(assignment, driver)| {
            json!({
                "id": assignment.id,
                "staff_id": assignment.staff_id,
                "staff_name": driver.map(|d| d.name),
                "assigned_at": assignment.assigned_at,
                "unassigned_at": assignment.unassigned_at,
                "is_open": assignment.is_open(),
            })
        })
        .collect();
    let routes = transport_routes::Entity::query(user.school_id, Trashed::Without)
        .filter(transport_routes::Column::VehicleId.eq(vehicle.id))
        .all(db.inner())
        .await?;

    Inertia::render(
        "Vehicles/Show",
        json!({
            "vehicle": vehicle,
            "current_driver": history.iter().find(|a| a["is_open"] == json!(true)),
            "history": history,
            "routes": routes,
            "can": support::abilities(&user, Resource::Vehicles),
        }),
    )
}

async fn ensure_unique_registration(
    school_id: i64,
    registration_no: &str,
    id: Option<i64>,
) -> Result<(), FrameworkError> {
    let db = DB::connection()?;
    let mut duplicate = vehicles::Entity::query(school_id, Trashed::With)
        .filter(vehicles::Column::RegistrationNo.eq(registration_no));
    if let Some(id) = id {
        duplicate = duplicate.filter(vehicles::Column::Id.ne(id));
    }
    if duplicate.count(db.inner()).await? > 0 {
        return Err(support::taken("registration_no"));
    }
    Ok(())
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Vehicles, Ability::Create)?;
    let form: VehicleForm = req.validated()?;
    ensure_unique_registration(user.school_id, &form.registration_no, None).await?;
    let db = DB::connection()?;
    let now = now();

    let vehicle = vehicles::ActiveModel {
        school_id: Set(user.school_id),
        registration_no: Set(form.registration_no),
        model: Set(form.model),
        capacity: Set(form.capacity),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    let id = vehicle.id.to_string();
    support::created(&vehicle, "Vehicle created.", Redirect::route("vehicles.show", &[("id", &id)]))
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Vehicles, Ability::Update)?;
    let id = support::id(&req)?;
    let form: VehicleForm = req.validated()?;
    let db = DB::connection()?;

    let vehicle = vehicles::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    ensure_unique_registration(user.school_id, &form.registration_no, Some(vehicle.id)).await?;

    let mut vehicle = vehicle.into_active_model();
    vehicle.registration_no = Set(form.registration_no);
    vehicle.model = Set(form.model);
    vehicle.capacity = Set(form.capacity);
    vehicle.updated_at = Set(now());
    let vehicle = vehicle.update(db.inner()).await?;

    let id = vehicle.id.to_string();
    support::updated(&vehicle, "Vehicle updated.", Redirect::route("vehicles.show", &[("id", &id)]))
}

/// Put a staff member behind the wheel
///
/// Assigning the current driver again returns the open assignment unchanged.
pub async fn assign_driver(req: Request) -> Response {
    let user = authorize(&req, Resource::Vehicles, Ability::Manage)?;
    let id = support::id(&req)?;
    let form: AssignDriverForm = req.validated()?;
    let db = DB::connection()?;
    let now = now();

    let txn = db.inner().begin().await?;
    let vehicle = vehicles::Entity::find_scoped(&txn, user.school_id, id).await?;
    let driver = support::exists::<staff::Entity, _>(&txn, user.school_id, form.staff_id, "staff_id").await?;
    let redirect = Redirect::route("vehicles.show", &[("id", &vehicle.id.to_string())]);

    if let Some(open) = assignments::open_for_vehicle(&txn, vehicle.id).await? {
        if open.staff_id == driver.id {
            txn.commit().await?;
            return support::updated(&open, "Driver already assigned.", redirect);
        }
    }

    let closed = assignments::Entity::update_many()
        .col_expr(assignments::Column::UnassignedAt, Expr::value(now))
        .col_expr(assignments::Column::UpdatedAt, Expr::value(now))
        .filter(assignments::Column::SchoolId.eq(user.school_id))
        .filter(assignments::Column::UnassignedAt.is_null())
        .filter(
            Condition::any()
                .add(assignments::Column::VehicleId.eq(vehicle.id))
                .add(assignments::Column::StaffId.eq(driver.id)),
        )
        .exec(&txn)
        .await?;
    let assignment = assignments::ActiveModel {
        school_id: Set(user.school_id),
        vehicle_id: Set(vehicle.id),
        staff_id: Set(driver.id),
        assigned_at: Set(now),
        unassigned_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(
        vehicle_id = vehicle.id,
        staff_id = driver.id,
        closed = closed.rows_affected,
        "driver assigned"
    );
    support::created(&assignment, "Driver assigned.", redirect)
}

/// Close the vehicle's open assignment; 404 when there is none
pub async fn unassign_driver(req: Request) -> Response {
    let user = authorize(&req, Resource::Vehicles, Ability::Manage)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;
    let now = now();

    let vehicle = vehicles::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let result = assignments::Entity::update_many()
        .col_expr(assignments::Column::UnassignedAt, Expr::value(now))
        .col_expr(assignments::Column::UpdatedAt, Expr::value(now))
        .filter(assignments::Column::SchoolId.eq(user.school_id))
        .filter(assignments::Column::VehicleId.eq(vehicle.id))
        .filter(assignments::Column::UnassignedAt.is_null())
        .exec(db.inner())
        .await?;
    if result.rows_affected == 0 {
        return Err(FrameworkError::domain("No driver is assigned to this vehicle.", 404).into());
    }

    support::updated(
        &vehicle,
        "Driver unassigned.",
        Redirect::route("vehicles.show", &[("id", &vehicle.id.to_string())]),
    )
}

/// Soft delete; the open assignment is closed and kept as history
pub async fn destroy(req: Request) -> Response {
    let user = authorize(&req, Resource::Vehicles, Ability::Delete)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;
    let now = now();

    let txn = db.inner().begin().await?;
    vehicles::Entity::soft_delete(&txn, user.school_id, id).await?;
    let closed = assignments::Entity::update_many()
        .col_expr(assignments::Column::UnassignedAt, Expr::value(now))
        .col_expr(assignments::Column::UpdatedAt, Expr::value(now))
        .filter(assignments::Column::SchoolId.eq(user.school_id))
        .filter(assignments::Column::VehicleId.eq(id))
        .filter(assignments::Column::UnassignedAt.is_null())
        .exec(&txn)
        .await?
        .rows_affected;
    txn.commit().await?;

    tracing::info!(vehicle_id = id, closed, user_id = user.id, "vehicle deleted");
    support::deleted("Vehicle deleted.", Redirect::route("vehicles.index", &[]))
}

pub async fn restore(req: Request) -> Response {
    support::restore::<vehicles::Entity>(&req, Resource::Vehicles, "vehicles.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<vehicles::Entity>(&req, Resource::Vehicles, "vehicles.index").await
}

#[cfg(test)]
mod tests {
    use crate::models::vehicle_driver_assignments as assignments;
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use serde_json::json;

    async fn vehicle(app: &TestApp, token: &str, registration_no: &str) -> i64 {
        app.post(
            token,
            "/vehicles",
            json!({ "registration_no": registration_no, "model": "Coaster", "capacity": 30 }),
        )
        .await
        .json_body()["data"]["id"]
            .as_i64()
            .unwrap()
    }

    async fn open_assignments(app: &TestApp) -> Vec<(i64, i64)> {
        assignments::Entity::find()
            .filter(assignments::Column::UnassignedAt.is_null())
            .all(app.conn())
            .await
            .unwrap()
            .into_iter()
            .map(|a| (a.vehicle_id, a.staff_id))
            .collect()
    }

    #[tokio::test]
    async fn reassignment_closes_the_previous_driver() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;
        let bus = vehicle(&app, &token, "BUS-1").await;
        let dan = app.staff(app.school.id, "Dan Driver", None).await;
        let dee = app.staff(app.school.id, "Dee Driver", None).await;

        let first = app.post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": dan.id })).await;
        expect!(first.status_code()).to_equal(201);
        let second = app.post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": dee.id })).await;
        expect!(second.status_code()).to_equal(201);

        expect!(open_assignments(&app).await).to_equal(vec![(bus, dee.id)]);

        let shown = app.get(Some(&token), &format!("/vehicles/{}", bus)).await.json_body();
        expect!(shown["history"].clone()).to_have_length(2);
        expect!(shown["history"][0]["staff_name"].clone()).to_equal(json!("Dee Driver"));
        expect!(shown["history"][1]["unassigned_at"].is_null()).to_be_false();
        expect!(shown["current_driver"]["staff_id"].as_i64()).to_equal(Some(dee.id));

        let listing = app.get(Some(&token), "/vehicles").await.json_body();
        expect!(listing["vehicles"]["data"][0]["driver_name"].clone()).to_equal(json!("Dee Driver"));
    }

    #[tokio::test]
    async fn a_driver_moves_between_vehicles() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;
        let bus = vehicle(&app, &token, "BUS-1").await;
        let van = vehicle(&app, &token, "VAN-1").await;
        let dan = app.staff(app.school.id, "Dan Driver", None).await;

        app.post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": dan.id })).await;
        app.post(&token, &format!("/vehicles/{}/driver", van), json!({ "staff_id": dan.id })).await;

        expect!(open_assignments(&app).await).to_equal(vec![(van, dan.id)]);
    }

    #[tokio::test]
    async fn assigning_the_current_driver_is_a_no_op() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let bus = vehicle(&app, &token, "BUS-1").await;
        let dan = app.staff(app.school.id, "Dan Driver", None).await;

        let first = app.post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": dan.id })).await;
        let again = app.post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": dan.id })).await;

        expect!(&again).to_have_status(200);
        expect!(again.json_body()["data"]["id"].clone()).to_equal(first.json_body()["data"]["id"].clone());
        expect!(assignments::Entity::find().all(app.conn()).await.unwrap().len()).to_equal(1);
    }

    #[tokio::test]
    async fn unassigning_without_a_driver_is_not_found() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;
        let bus = vehicle(&app, &token, "BUS-1").await;
        let dan = app.staff(app.school.id, "Dan Driver", None).await;

        expect!(app.delete(&token, &format!("/vehicles/{}/driver", bus)).await).to_have_status(404);

        app.post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": dan.id })).await;
        expect!(app.delete(&token, &format!("/vehicles/{}/driver", bus)).await).to_have_status(200);
        expect!(open_assignments(&app).await.is_empty()).to_be_true();
    }

    #[tokio::test]
    async fn drivers_must_be_staff_of_the_school() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;
        let bus = vehicle(&app, &token, "BUS-1").await;
        let outsider = app.staff(app.other_school.id, "Otto Outsider", None).await;

        let response = app
            .post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": outsider.id }))
            .await;
        expect!(&response).to_have_validation_error("staff_id");
    }

    #[tokio::test]
    async fn deleted_drivers_and_vehicles_leave_no_open_assignment() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let bus = vehicle(&app, &token, "BUS-1").await;
        let van = vehicle(&app, &token, "VAN-1").await;
        let dan = app.staff(app.school.id, "Dan Driver", None).await;
        let dee = app.staff(app.school.id, "Dee Driver", None).await;
        app.post(&token, &format!("/vehicles/{}/driver", bus), json!({ "staff_id": dan.id })).await;
        app.post(&token, &format!("/vehicles/{}/driver", van), json!({ "staff_id": dee.id })).await;

        expect!(app.delete(&token, &format!("/staff/{}", dan.id)).await).to_have_status(200);
        let body = app.get(Some(&token), "/vehicles").await.json_body();
        let rows = body["vehicles"]["data"].as_array().unwrap().clone();
        expect!(rows[0]["registration_no"].clone()).to_equal(json!("BUS-1"));
        expect!(rows[0]["driver_name"].is_null()).to_be_true();
        expect!(rows[1]["driver_name"].clone()).to_equal(json!("Dee Driver"));

        expect!(app.delete(&token, &format!("/vehicles/{}", van)).await).to_have_status(200);
        expect!(open_assignments(&app).await).to_equal(vec![(bus, dan.id)]);
        let history = assignments::Entity::find()
            .filter(assignments::Column::VehicleId.eq(van))
            .all(app.conn())
            .await
            .unwrap();
        expect!(history.len()).to_equal(1);
        expect!(history[0].unassigned_at.is_some()).to_be_true();
    }

    #[tokio::test]
    async fn registration_numbers_are_unique() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;
        vehicle(&app, &token, "BUS-1").await;

        let response = app
            .post(&token, "/vehicles", json!({ "registration_no": "BUS-1", "model": "Coaster", "capacity": 30 }))
            .await;
        expect!(&response).to_have_validation_error("registration_no");
    }
}
