use crate::handler::json_response;
use crate::service::error::ServiceError;
use crate::service::property_service::PropertyService;
use axum::{
    Json, Router,
    extract::{
        Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::Response,
    routing::get,
};
use serde_json::{Value, json};
use site_kit::ListingFilter;

type IdParam = Result<Path<u64>, PathRejection>;
type JsonBody = Result<Json<Value>, JsonRejection>;

pub(crate) fn router(service: PropertyService) -> Router {
    let list_service = service.clone();
    let create_service = service.clone();
    let get_service = service.clone();
    let update_service = service.clone();
    let delete_service = service;

    Router::new()
        .route(
            "/properties",
            get(move |query: Result<Query<ListingFilter>, QueryRejection>| {
                list_properties(list_service.clone(), query)
            })
            .post(move |payload: JsonBody| create_property(create_service.clone(), payload)),
        )
        .route(
            "/properties/{id}",
            get(move |id: IdParam| get_property(get_service.clone(), id))
                .put(move |id: IdParam, payload: JsonBody| {
                    update_property(update_service.clone(), id, payload)
                })
                .delete(move |id: IdParam| delete_property(delete_service.clone(), id)),
        )
}

fn property_id(id: IdParam) -> Result<u64, ServiceError> {
    id.map(|Path(id)| id)
        .map_err(|_| ServiceError::bad_request("Invalid property id"))
}

fn payload(body: JsonBody) -> Result<Value, ServiceError> {
    match body {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => Err(
            ServiceError::payload_too_large("Request body is too large"),
        ),
        Err(rejection) => Err(ServiceError::bad_request(rejection.body_text())),
    }
}

async fn list_properties(
    service: PropertyService,
    query: Result<Query<ListingFilter>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let Query(filter) = query.map_err(|rejection| ServiceError::bad_request(rejection.body_text()))?;
    let data = service.list(&filter).await?;
    Ok(json_response(StatusCode::OK, data))
}

async fn get_property(service: PropertyService, id: IdParam) -> Result<Response, ServiceError> {
    let data = service.get(property_id(id)?).await?;
    Ok(json_response(StatusCode::OK, data))
}

async fn create_property(service: PropertyService, body: JsonBody) -> Result<Response, ServiceError> {
    let data = service.create(payload(body)?).await?;
    Ok(json_response(StatusCode::CREATED, data))
}

async fn update_property(
    service: PropertyService,
    id: IdParam,
    body: JsonBody,
) -> Result<Response, ServiceError> {
    let id = property_id(id)?;
    let data = service.update(id, payload(body)?).await?;
    Ok(json_response(StatusCode::OK, data))
}

async fn delete_property(service: PropertyService, id: IdParam) -> Result<Response, ServiceError> {
    service.delete(property_id(id)?).await?;
    Ok(json_response(StatusCode::OK, json!({ "success": true })))
}
