// Route exports
pub mod pets;

use actix_web::web;

pub use pets::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(pets::health_check))
        .service(web::scope("/api/pets").configure(pets::configure_pets))
        .service(web::scope("/api/v1").configure(pets::configure_scoring));
}
