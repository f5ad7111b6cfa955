use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::state::AppState;

/// 可选请求体：只处理列出的进程
#[derive(Deserialize)]
pub struct NamesRequest {
    pub names: Vec<String>,
}

/// 空请求体表示“全部”；请求体无法解析时返回 400，绝不退化为“全部”
fn requested_names(body: &web::Bytes) -> Result<Option<Vec<String>>, HttpResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice::<NamesRequest>(body)
        .map(|req| Some(req.names))
        .map_err(|e| {
            log::warn!("Rejected request body: {}", e);
            HttpResponse::BadRequest().json(serde_json::json!({
                "status": "error",
                "message": format!("invalid request body: {}", e)
            }))
        })
}

fn error_response(action: &str, e: anyhow::Error) -> HttpResponse {
    log::error!("{} failed: {:#}", action, e);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "status": "error",
        "message": format!("{} failed: {:#}", action, e)
    }))
}

pub async fn start_processes(data: web::Data<AppState>) -> impl Responder {
    log::info!("=== Start requested ===");

    match data.supervisor.start().await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => error_response("start", e),
    }
}

/// 停止始终返回 200，逐个进程的结果与错误都放在响应体里
pub async fn stop_processes(data: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    log::info!("=== Stop requested ===");

    let names = match requested_names(&body) {
        Ok(names) => names,
        Err(resp) => return resp,
    };

    match data.supervisor.stop(names.as_deref()).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            log::error!("stop failed: {:#}", e);
            HttpResponse::Ok().json(serde_json::json!({
                "status": "error",
                "message": format!("stop failed: {:#}", e)
            }))
        }
    }
}

pub async fn process_status(data: web::Data<AppState>, body: web::Bytes) -> impl Responder {
    let names = match requested_names(&body) {
        Ok(Some(names)) => names,
        Ok(None) => match data.supervisor.known_names().await {
            Ok(names) => names,
            Err(e) => return error_response("status", e),
        },
        Err(resp) => return resp,
    };

    match data.supervisor.status(&names).await {
        Ok(statuses) => HttpResponse::Ok().json(statuses),
        Err(e) => error_response("status", e),
    }
}
