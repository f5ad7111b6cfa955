use actix_web::{web, HttpResponse, Responder};
use std::io;

use crate::services::log_extractor;
use crate::state::AppState;

/// 读取仿真日志，返回基站列表和设备位置
///
/// 日志缺失和找不到设备位置都以 JSON 中的 error 字段表示，HTTP 状态仍为 200。
pub async fn get_coords(data: web::Data<AppState>) -> impl Responder {
    let bytes = match tokio::fs::read(&data.log_path).await {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Log file {:?} not found", data.log_path);
            return HttpResponse::Ok().json(serde_json::json!({
                "error": "Log file not found"
            }));
        }
        Err(e) => {
            log::error!("Failed to read log file {:?}: {}", data.log_path, e);
            return HttpResponse::Ok().json(serde_json::json!({
                "error": format!("Failed to read log file: {}", e)
            }));
        }
    };

    let report = log_extractor::parse(&String::from_utf8_lossy(&bytes));
    log::debug!(
        "Parsed {} towers, device location found: {}",
        report.towers.len(),
        report.device_location.is_some()
    );

    let device_location = match report.device_location {
        Some(location) => serde_json::json!(location),
        None => serde_json::json!({
            "error": "Calculated device location not found"
        }),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "device_location": device_location,
        "towers": report.towers
    }))
}
