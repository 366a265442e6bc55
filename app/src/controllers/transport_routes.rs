use campus::database::Model;
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, FrameworkError, Inertia, Redirect, Request, Response, DB};
use sea_orm::{ActiveModelTrait, IntoActiveModel, RelationTrait, Set};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{now, transport_routes, vehicles};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct RouteForm {
    pub vehicle_id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 150))]
    pub start_point: String,
    #[validate(length(min = 1, max = 150))]
    pub end_point: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub fare: i64,
}

impl FormRequest for RouteForm {}

impl RouteForm {
    async fn check(&self, school_id: i64) -> Result<(), FrameworkError> {
        if let Some(vehicle_id) = self.vehicle_id {
            let db = DB::connection()?;
            support::exists::<vehicles::Entity, _>(db.inner(), school_id, vehicle_id, "vehicle_id").await?;
        }
        Ok(())
    }
}

fn table() -> TableSpec<transport_routes::Entity> {
    use transport_routes::Column;

    TableSpec::new(Column::Id)
        .join("vehicle", || transport_routes::Relation::Vehicle.def())
        .search(Column::Name)
        .search(Column::StartPoint)
        .search(Column::EndPoint)
        .search_related("vehicle", "registration_no")
        .sort("name", Column::Name)
        .sort("fare", Column::Fare)
        .sort_related("vehicle_registration", "vehicle", "registration_no")
        .filter("vehicle_id", Column::VehicleId, FilterKind::Integer)
        .column_as(
            "vehicle_registration",
            TableSpec::<transport_routes::Entity>::related("vehicle", "registration_no"),
        )
        .soft_deletes(Column::DeletedAt)
        .default_sort("name", SortDirection::Asc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::TransportRoutes, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let routes = table()
        .paginate(transport_routes::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "TransportRoutes/Index",
        json!({ "routes": routes, "can": support::abilities(&user, Resource::TransportRoutes) }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::TransportRoutes, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let route = transport_routes::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    let vehicle = match route.vehicle_id {
        Some(vehicle_id) => vehicles::Entity::find_scoped_with_trashed(db.inner(), user.school_id, vehicle_id)
            .await
            .ok(),
        None => None,
    };

    Inertia::render("TransportRoutes/Show", json!({ "route": route, "vehicle": vehicle }))
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::TransportRoutes, Ability::Create)?;
    let form: RouteForm = req.validated()?;
    form.check(user.school_id).await?;
    let db = DB::connection()?;
    let now = now();

    let route = transport_routes::ActiveModel {
        school_id: Set(user.school_id),
        vehicle_id: Set(form.vehicle_id),
        name: Set(form.name),
        start_point: Set(form.start_point),
        end_point: Set(form.end_point),
        fare: Set(form.fare),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    let id = route.id.to_string();
    support::created(&route, "Route created.", Redirect::route("transport-routes.show", &[("id", &id)]))
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::TransportRoutes, Ability::Update)?;
    let id = support::id(&req)?;
    let form: RouteForm = req.validated()?;
    let db = DB::connection()?;

    let route = transport_routes::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    form.check(user.school_id).await?;

    let mut route = route.into_active_model();
    route.vehicle_id = Set(form.vehicle_id);
    route.name = Set(form.name);
    route.start_point = Set(form.start_point);
    route.end_point = Set(form.end_point);
    route.fare = Set(form.fare);
    route.updated_at = Set(now());
    let route = route.update(db.inner()).await?;

    let id = route.id.to_string();
    support::updated(&route, "Route updated.", Redirect::route("transport-routes.show", &[("id", &id)]))
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<transport_routes::Entity>(&req, Resource::TransportRoutes, "transport-routes.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<transport_routes::Entity>(&req, Resource::TransportRoutes, "transport-routes.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<transport_routes::Entity>(&req, Resource::TransportRoutes, "transport-routes.index")
        .await
}

#[cfg(test)]
mod tests {
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn sorts_by_vehicle_registration() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;
        let mut vehicles = Vec::new();
        for registration_no in ["ZX-9", "AB-1"] {
            let response = app
                .post(&token, "/vehicles", json!({ "registration_no": registration_no, "model": "Van", "capacity": 12 }))
                .await;
            vehicles.push(response.json_body()["data"]["id"].as_i64().unwrap());
        }
        for (name, vehicle_id) in [("North", vehicles[0]), ("South", vehicles[1])] {
            let response = app
                .post(
                    &token,
                    "/transport-routes",
                    json!({ "vehicle_id": vehicle_id, "name": name, "start_point": "Depot", "end_point": "School", "fare": 1_500 }),
                )
                .await;
            expect!(response.status_code()).to_equal(201);
        }

        let body = app
            .get(Some(&token), "/transport-routes?sort=vehicle_registration")
            .await
            .json_body();
        let names: Vec<&str> = body["routes"]["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["South", "North"]);
        assert_eq!(body["routes"]["data"][0]["vehicle_registration"], json!("AB-1"));
    }

    #[tokio::test]
    async fn vehicles_of_other_schools_are_rejected() {
        let app = TestApp::new().await;
        let (_, outsider) = app.sign_in_at(app.other_school.id, Role::TransportManager).await;
        let token = app.token(Role::TransportManager).await;
        let foreign = app
            .post(&outsider, "/vehicles", json!({ "registration_no": "FOR-1", "model": "Van", "capacity": 12 }))
            .await
            .json_body()["data"]["id"]
            .as_i64()
            .unwrap();

        let response = app
            .post(
                &token,
                "/transport-routes",
                json!({ "vehicle_id": foreign, "name": "East", "start_point": "Depot", "end_point": "School" }),
            )
            .await;
        expect!(&response).to_have_validation_error("vehicle_id");
    }
}
