use campus::database::Model;
use campus::query::{FilterKind, SortDirection, TableQuery, TableSpec};
use campus::{FormRequest, Inertia, Redirect, Request, Response, DB};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::support::{self, authorize};
use crate::models::{hostels, now};
use crate::policies::{Ability, Resource};

#[derive(Debug, Deserialize, Validate)]
pub struct HostelForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub kind: String,
    #[validate(range(min = 1, max = 2000))]
    pub capacity: i32,
    #[validate(length(max = 150))]
    pub warden_name: Option<String>,
}

impl FormRequest for HostelForm {}

fn table() -> TableSpec<hostels::Entity> {
    use hostels::Column;

    TableSpec::new(Column::Id)
        .search(Column::Name)
        .search(Column::WardenName)
        .sort("name", Column::Name)
        .sort("capacity", Column::Capacity)
        .filter("kind", Column::Kind, FilterKind::Text)
        .soft_deletes(Column::DeletedAt)
        .default_sort("name", SortDirection::Asc)
}

pub async fn index(req: Request) -> Response {
    let user = authorize(&req, Resource::Hostels, Ability::View)?;
    let query = TableQuery::from_request(&req);
    let db = DB::connection()?;

    let hostels = table()
        .paginate(hostels::Entity::scoped(user.school_id), &query, db.inner())
        .await?;

    Inertia::render(
        "Hostels/Index",
        json!({
            "hostels": hostels,
            "kinds": hostels::KINDS,
            "can": support::abilities(&user, Resource::Hostels),
        }),
    )
}

pub async fn show(req: Request) -> Response {
    let user = authorize(&req, Resource::Hostels, Ability::View)?;
    let id = support::id(&req)?;
    let db = DB::connection()?;

    let hostel = hostels::Entity::find_scoped(db.inner(), user.school_id, id).await?;
    Inertia::render("Hostels/Show", json!({ "hostel": hostel }))
}

pub async fn store(req: Request) -> Response {
    let user = authorize(&req, Resource::Hostels, Ability::Create)?;
    let form: HostelForm = req.validated()?;
    support::one_of("kind", &form.kind, &hostels::KINDS)?;
    let db = DB::connection()?;
    let now = now();

    let hostel = hostels::ActiveModel {
        school_id: Set(user.school_id),
        name: Set(form.name),
        kind: Set(form.kind),
        capacity: Set(form.capacity),
        warden_name: Set(form.warden_name),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db.inner())
    .await?;

    let id = hostel.id.to_string();
    support::created(&hostel, "Hostel created.", Redirect::route("hostels.show", &[("id", &id)]))
}

pub async fn update(req: Request) -> Response {
    let user = authorize(&req, Resource::Hostels, Ability::Update)?;
    let id = support::id(&req)?;
    let form: HostelForm = req.validated()?;
    support::one_of("kind", &form.kind, &hostels::KINDS)?;
    let db = DB::connection()?;

    let mut hostel = hostels::Entity::find_scoped(db.inner(), user.school_id, id)
        .await?
        .into_active_model();
    hostel.name = Set(form.name);
    hostel.kind = Set(form.kind);
    hostel.capacity = Set(form.capacity);
    hostel.warden_name = Set(form.warden_name);
    hostel.updated_at = Set(now());
    let hostel = hostel.update(db.inner()).await?;

    let id = hostel.id.to_string();
    support::updated(&hostel, "Hostel updated.", Redirect::route("hostels.show", &[("id", &id)]))
}

pub async fn destroy(req: Request) -> Response {
    support::destroy::<hostels::Entity>(&req, Resource::Hostels, "hostels.index").await
}

pub async fn restore(req: Request) -> Response {
    support::restore::<hostels::Entity>(&req, Resource::Hostels, "hostels.show").await
}

pub async fn force_delete(req: Request) -> Response {
    support::force_delete::<hostels::Entity>(&req, Resource::Hostels, "hostels.index").await
}

#[cfg(test)]
mod tests {
    use crate::policies::Role;
    use crate::testing::TestApp;
    use campus::expect;
    use serde_json::json;

    #[tokio::test]
    async fn validates_kind_and_filters_by_it() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;

        let bad = app
            .post(&token, "/hostels", json!({ "name": "Oak", "kind": "dragons", "capacity": 40 }))
            .await;
        expect!(&bad).to_have_validation_error("kind");

        for (name, kind) in [("Oak", "boys"), ("Elm", "girls"), ("Ash", "girls")] {
            let created = app
                .post(&token, "/hostels", json!({ "name": name, "kind": kind, "capacity": 40, "warden_name": null }))
                .await;
            expect!(created.status_code()).to_equal(201);
        }

        let body = app.get(Some(&token), "/hostels?filter%5Bkind%5D=girls").await.json_body();
        expect!(body["hostels"]["data"].clone()).to_have_length(2);
        expect!(body["hostels"]["data"][0]["name"].clone()).to_equal(json!("Ash"));
    }

    #[tokio::test]
    async fn trashed_hostels_need_with_trashed() {
        let app = TestApp::new().await;
        let token = app.token(Role::Admin).await;
        let id = app
            .post(&token, "/hostels", json!({ "name": "Oak", "kind": "mixed", "capacity": 40 }))
            .await
            .json_body()["data"]["id"]
            .as_i64()
            .unwrap();
        app.delete(&token, &format!("/hostels/{}", id)).await;

        let body = app.get(Some(&token), "/hostels").await.json_body();
        expect!(body["hostels"]["meta"]["total"].as_u64()).to_equal(Some(0));

        let body = app.get(Some(&token), "/hostels?only_trashed=true").await.json_body();
        expect!(body["hostels"]["data"][0]["deleted_at"].is_null()).to_be_false();
    }

    #[tokio::test]
    async fn transport_managers_read_only() {
        let app = TestApp::new().await;
        let token = app.token(Role::TransportManager).await;

        expect!(app.get(Some(&token), "/hostels").await).to_have_status(200);
        expect!(
            app.post(&token, "/hostels", json!({ "name": "Oak", "kind": "mixed", "capacity": 40 }))
                .await
        )
        .to_have_status(403);
    }
}
