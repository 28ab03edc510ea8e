use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{
        CreateWebsiteRequest, MessageResponse, NewWebsite, UpdateWebsiteRequest, Website,
        WebsiteChanges,
    },
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};

// --- Collection Handlers (/websites) ---

/// list_websites
///
/// Returns every tracked website with `createdBy` resolved to the owner's
/// `{_id, username}`. No filtering or pagination.
#[utoipa::path(
    get,
    path = "/websites",
    responses(
        (status = 200, description = "All websites", body = [Website]),
        (status = 401, description = "Missing or invalid token", body = MessageResponse)
    )
)]
pub async fn list_websites(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Website>>, ApiError> {
    let websites = state.repo.list_websites().await?;
    Ok(Json(websites))
}

/// create_website
///
/// Stores a new website owned by the caller. `riskLevel` defaults to `High`
/// and `isProtected` to `false`.
#[utoipa::path(
    post,
    path = "/websites",
    request_body = CreateWebsiteRequest,
    responses(
        (status = 201, description = "Created", body = Website),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 500, description = "Rejected or failed write", body = MessageResponse)
    )
)]
pub async fn create_website(
    AuthUser { id: owner_id }: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateWebsiteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Website>), ApiError> {
    let Json(payload) = payload?;
    let website = NewWebsite::try_from(payload)?;

    let created = state.repo.create_website(website, &owner_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// --- Single-Resource Handlers (/websites/{id}) ---

#[utoipa::path(
    get,
    path = "/websites/{id}",
    params(("id" = String, Path, description = "Website ObjectId")),
    responses(
        (status = 200, description = "Found", body = Website),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn get_website(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Website>, ApiError> {
    state
        .repo
        .get_website(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::WebsiteNotFound)
}

/// update_website
///
/// Partial update: only the fields present (and non-empty) in the body change.
/// The id is resolved before the body is looked at, so an unknown or malformed
/// id is 404 whatever the payload. Concurrent updates are last-write-wins.
#[utoipa::path(
    put,
    path = "/websites/{id}",
    params(("id" = String, Path, description = "Website ObjectId")),
    request_body = UpdateWebsiteRequest,
    responses(
        (status = 200, description = "Updated", body = Website),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn update_website(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateWebsiteRequest>, JsonRejection>,
) -> Result<Json<Website>, ApiError> {
    if state.repo.get_website(&id).await?.is_none() {
        return Err(ApiError::WebsiteNotFound);
    }

    let Json(payload) = payload?;
    let changes = WebsiteChanges::try_from(payload)?;

    state
        .repo
        .update_website(&id, changes)
        .await?
        .map(Json)
        .ok_or(ApiError::WebsiteNotFound)
}

#[utoipa::path(
    delete,
    path = "/websites/{id}",
    params(("id" = String, Path, description = "Website ObjectId")),
    responses(
        (status = 200, description = "Removed", body = MessageResponse),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn delete_website(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.repo.delete_website(&id).await? {
        Ok(Json(MessageResponse::new("Website removed")))
    } else {
        Err(ApiError::WebsiteNotFound)
    }
}

// --- Method & Route Fallbacks ---

/// preflight
///
/// CORS preflight. Answers before any authentication; the CORS headers are
/// attached by the router-wide layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// method_not_allowed
///
/// Fallback for unsupported methods on a website route. The token is still
/// verified first, so an anonymous caller sees 401 rather than 405.
pub async fn method_not_allowed(_auth: AuthUser) -> ApiError {
    ApiError::MethodNotAllowed
}

/// fallback
///
/// Router-wide fallback: OPTIONS on any path is a successful preflight,
/// anything else is an unknown route.
pub async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        ApiError::RouteNotFound.into_response()
    }
}
