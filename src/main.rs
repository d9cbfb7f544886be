// Third-party dependencies
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::info;
use roster_service::routes::{
    account_routes, activity_routes, audit_routes, document_routes, org_routes, request_routes,
    roster_routes, share_routes,
};
use roster_service::services::notifier::{LogDispatcher, SharedDispatcher};
use roster_service::services::suggestions::{OfflineSuggestionBackend, SharedSuggestionBackend};
use roster_service::utils::store::{MemoryStore, SharedStore};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:9090".to_string());
    info!("Server starting at {}", address);

    let store: SharedStore = MemoryStore::shared();
    let dispatcher: SharedDispatcher = Arc::new(LogDispatcher);
    let suggestion_backend: SharedSuggestionBackend = Arc::new(OfflineSuggestionBackend);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(suggestion_backend.clone()))
            .configure(roster_routes::init_routes)
            .configure(document_routes::init_routes)
            .configure(share_routes::init_routes)
            .configure(request_routes::init_routes)
            .configure(org_routes::init_routes)
            .configure(account_routes::init_routes)
            .configure(activity_routes::init_routes)
            .configure(audit_routes::init_routes)
    })
    .bind(address)?
    .run()
    .await
}
