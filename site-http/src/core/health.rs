use crate::core::response::HealthResponse;

pub async fn health_check() -> HealthResponse {
    tracing::debug!("Health check requested");
    HealthResponse::healthy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn reports_ok_with_timestamp() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload["status"], "ok");
        assert!(payload["timestamp"].as_str().is_some_and(|ts| ts.contains('T')));
    }
}
