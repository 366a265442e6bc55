use campus::Application;

mod bootstrap;
mod config;
mod controllers;
mod jobs;
mod middleware;
mod migrations;
mod models;
mod notifications;
mod policies;
mod routes;
mod seeders;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() {
    Application::new()
        .config(config::register_all)
        .bootstrap(bootstrap::register)
        .routes(routes::register)
        .migrations::<migrations::Migrator>()
        .seeder(seeders::run)
        .run()
        .await;
}
