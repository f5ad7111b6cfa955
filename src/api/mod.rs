pub mod coords;
pub mod process;

pub use coords::get_coords;
pub use process::{process_status, start_processes, stop_processes};

use actix_web::{web, HttpResponse, Responder};

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

/// 注册全部路由；main 与测试共用
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/process/start", web::post().to(start_processes))
        .route("/api/process/stop", web::post().to(stop_processes))
        .service(
            web::resource("/api/process/status")
                .route(web::post().to(process_status))
                .route(web::get().to(process_status)),
        )
        .route("/api/coords", web::get().to(get_coords))
        .route("/health", web::get().to(health));
}
