// src/api/health.rs

pub async fn health_handler() -> &'static str {
    "ok"
}
