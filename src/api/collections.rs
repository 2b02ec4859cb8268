//! Collection API endpoints
//!
//! Private collections are visible to their owner and collaborators only.
//! Everyone else gets a 404, as if the collection did not exist.
//!
//! Optional auth:
//! - GET    /api/v1/collections/{id}
//! - GET    /api/v1/collections/{id}/items
//! - GET    /api/v1/collections/{id}/collaborators
//!
//! Auth:
//! - GET    /api/v1/collections                       (own and shared)
//! - POST   /api/v1/collections
//! - PUT    /api/v1/collections/{id}                  (owner)
//! - DELETE /api/v1/collections/{id}                  (owner)
//! - POST   /api/v1/collections/{id}/items            (owner or editor)
//! - DELETE /api/v1/collections/{id}/items/{item_type}/{item_id}
//! - POST   /api/v1/collections/{id}/collaborators    (owner)
//! - DELETE /api/v1/collections/{id}/collaborators/{username}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::common::{parse_kind, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{
    AddCollaboratorInput, AddItemInput, Collaborator, Collection, CollectionItem, ContentType,
    CreateCollectionInput, PagedResult, UpdateCollectionInput,
};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/collections/{id}", get(get_collection))
        .route("/collections/{id}/items", get(list_items))
        .route("/collections/{id}/collaborators", get(list_collaborators))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/collections", get(list_collections).post(create_collection))
        .route(
            "/collections/{id}",
            put(update_collection).delete(delete_collection),
        )
        .route("/collections/{id}/items", post(add_item))
        .route(
            "/collections/{id}/items/{item_type}/{item_id}",
            delete(remove_item),
        )
        .route("/collections/{id}/collaborators", post(add_collaborator))
        .route(
            "/collections/{id}/collaborators/{username}",
            delete(remove_collaborator),
        )
}

async fn list_collections(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<PagedResult<Collection>>, ApiError> {
    Ok(Json(
        state
            .collection_service
            .list_for_user(&user.0, &page.params())
            .await?,
    ))
}

async fn create_collection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCollectionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state.collection_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

async fn get_collection(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Collection>, ApiError> {
    Ok(Json(state.collection_service.get(viewer.0.as_ref(), id).await?))
}

async fn update_collection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCollectionInput>,
) -> Result<Json<Collection>, ApiError> {
    Ok(Json(state.collection_service.update(&user.0, id, body).await?))
}

async fn delete_collection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.collection_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_items(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CollectionItem>>, ApiError> {
    Ok(Json(state.collection_service.items(viewer.0.as_ref(), id).await?))
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AddItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.collection_service.add_item(&user.0, id, body).await?;
    Ok((StatusCode::CREATED, Json(items)))
}

async fn remove_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, item_type, item_id)): Path<(i64, String, i64)>,
) -> Result<StatusCode, ApiError> {
    let item_type = parse_kind::<ContentType>(&item_type)?;
    state
        .collection_service
        .remove_item(&user.0, id, item_type, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_collaborators(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Collaborator>>, ApiError> {
    Ok(Json(
        state
            .collection_service
            .collaborators(viewer.0.as_ref(), id)
            .await?,
    ))
}

async fn add_collaborator(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AddCollaboratorInput>,
) -> Result<impl IntoResponse, ApiError> {
    let collaborator = state
        .collection_service
        .add_collaborator(&user.0, id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(collaborator)))
}

async fn remove_collaborator(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, username)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .collection_service
        .remove_collaborator(&user.0, id, &username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
