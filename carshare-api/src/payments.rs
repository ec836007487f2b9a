use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use carshare_core::{RentalId, UserId};
use carshare_rental::{CancelPaymentResponse, CreatePaymentSessionRequest, PaymentResponse};

use crate::error::AppError;
use crate::middleware::{auth_middleware, CurrentUser, Role};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    pub user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub rental_id: RentalId,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/payments", get(get_payments))
        .route("/payments/create", post(create_payment_session))
        .route_layer(from_fn_with_state(state, auth_middleware));

    // provider redirect targets carry no token
    let redirects = Router::new()
        .route("/payments/success", get(payment_success))
        .route("/payments/cancel", get(payment_cancel));

    authenticated.merge(redirects)
}

/// Managers look up any customer by `user_id`; customers see only their own.
fn payments_owner(user: &CurrentUser, query: &PaymentsQuery) -> Result<UserId, AppError> {
    match (user.role, query.user_id) {
        (Role::Manager, Some(user_id)) => Ok(user_id),
        (Role::Customer, None) => Ok(user.id),
        (Role::Manager, None) => Err(AppError::ValidationError(
            "Parameter user_id is required for managers".to_string(),
        )),
        (Role::Customer, Some(_)) => Err(AppError::ValidationError(
            "Parameter user_id is not allowed for customers".to_string(),
        )),
    }
}

async fn get_payments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let owner = payments_owner(&user, &query)?;
    Ok(Json(state.payments.get_payments(owner).await?))
}

async fn create_payment_session(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentSessionRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let payment = state.payments.create_payment_session(request).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
) -> Result<Json<PaymentResponse>, AppError> {
    Ok(Json(state.payments.check_successful_payment(query.rental_id).await?))
}

async fn payment_cancel(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
) -> Json<CancelPaymentResponse> {
    Json(state.payments.cancel_payment(query.rental_id).await)
}
