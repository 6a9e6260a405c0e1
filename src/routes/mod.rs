// Route exports
pub mod assess;

pub use assess::AppState;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(assess::configure),
    );
}
