use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::Query;

use carshare_core::search::RentalSearchParameters;
use carshare_core::RentalId;
use carshare_rental::{CreateRentalRequest, RentalResponse, ReturnRentalRequest};

use crate::error::AppError;
use crate::middleware::{customer_auth_middleware, manager_auth_middleware, CurrentUser};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/rentals", post(add_rental).get(get_customer_rentals))
        .route("/rentals/return", post(return_rental))
        .route_layer(from_fn_with_state(state.clone(), customer_auth_middleware));

    let manager = Router::new()
        .route("/rentals/search", get(search_rentals))
        .route("/rentals/{id}", get(get_rental))
        .route_layer(from_fn_with_state(state, manager_auth_middleware));

    customer.merge(manager)
}

async fn add_rental(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateRentalRequest>,
) -> Result<(StatusCode, Json<RentalResponse>), AppError> {
    let rental = state.rentals.add_rental(user.id, request).await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

async fn return_rental(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<ReturnRentalRequest>,
) -> Result<Json<RentalResponse>, AppError> {
    let rental = state.rentals.set_actual_return_date(user.id, request).await?;
    Ok(Json(rental))
}

async fn get_customer_rentals(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<RentalResponse>>, AppError> {
    Ok(Json(state.rentals.get_customer_rentals(user.id).await?))
}

async fn get_rental(
    State(state): State<AppState>,
    Path(id): Path<RentalId>,
) -> Result<Json<RentalResponse>, AppError> {
    Ok(Json(state.rentals.get_rental(id).await?))
}

/// `?user_ids=1&user_ids=2&is_active=true`
async fn search_rentals(
    State(state): State<AppState>,
    Query(params): Query<RentalSearchParameters>,
) -> Result<Json<Vec<RentalResponse>>, AppError> {
    Ok(Json(state.rentals.search_rentals(&params).await?))
}
