use crate::handlers::common::{json_body, success_response};
use crate::{errors::ServiceError, services::contact::ContactRequest, AppState};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub fn contact_routes() -> Router<Arc<AppState>> {
    Router::new().route("/contact", post(submit_contact))
}

async fn submit_contact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(payload)?;
    state.services.contact.submit(request).await?;
    Ok(success_response(json!({ "success": true })))
}
