use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        addb::AdExt,
        paymentdb::{NewTransaction, PaymentExt, RefundOutcome, StatusOutcome},
        tariffdb::TariffExt,
    },
    dtos::{
        paymentdtos::{
            CreateInvoiceDto, CreatePaymentAccountDto, CreateRefundDto, CreateTransactionDto,
            UpdateTransactionStatusDto, WalletDto,
        },
        userdtos::ListResponse,
    },
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddeware},
    models::{
        paymentmodel::{Transaction, TransactionType},
        usermodel::{User, UserRole},
    },
    service::{error::ServiceError, reference::new_reference},
    utils::text,
    AppState,
};

pub fn payments_handler() -> Router {
    let admin_only = Router::new()
        .route("/transactions/:transaction_id/status", put(update_transaction_status))
        .route("/invoices/issue", post(create_invoice))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn(auth));

    let signed_in = Router::new()
        .route("/transactions", get(get_my_transactions).post(create_transaction))
        .route("/transactions/:transaction_id", get(get_transaction))
        .route("/transactions/:transaction_id/refunds", post(request_refund))
        .route("/accounts", get(get_payment_accounts).post(create_payment_account))
        .route("/accounts/:account_id/primary", put(set_primary_account))
        .route("/wallets", get(get_wallets))
        .route("/invoices", get(get_my_invoices))
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/methods", get(get_payment_methods))
        .route("/currencies", get(get_currencies))
        .merge(admin_only)
        .merge(signed_in)
}

fn can_see(transaction: &Transaction, user: &User) -> bool {
    transaction.user_id == user.id || user.is_admin()
}

/// The paid-for record has to belong to the payer.
async fn check_reference(
    app_state: &AppState,
    body: &CreateTransactionDto,
    user_id: Uuid,
) -> Result<(), HttpError> {
    let Some(reference_id) = body.reference_id else {
        return Ok(());
    };

    let owned = match body.transaction_type {
        TransactionType::Advertisement => app_state
            .db_client
            .get_advertisement(reference_id)
            .await
            .map_err(HttpError::from_db)?
            .map_or(false, |ad| ad.advertiser_id == user_id),
        TransactionType::Subscription => app_state
            .db_client
            .get_subscription(reference_id)
            .await
            .map_err(HttpError::from_db)?
            .map_or(false, |row| row.subscription.user_id == user_id),
        _ => true,
    };

    if !owned {
        return Err(HttpError::field("reference_id", "Unknown reference"));
    }
    Ok(())
}

/// What a completed payment unlocks.
pub async fn get_payment_methods(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let methods = app_state
        .db_client
        .get_payment_methods()
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(methods)))
}

pub async fn get_currencies(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let currencies = app_state
        .db_client
        .get_currencies()
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(currencies)))
}

pub async fn create_transaction(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTransactionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let db = &app_state.db_client;
    let currency_code = body.currency_code.to_uppercase();

    let (method, currency) = futures::try_join!(
        db.get_payment_method(body.payment_method_id),
        db.get_currency(&currency_code),
    )
    .map_err(HttpError::from_db)?;

    let method = method
        .filter(|m| m.is_active)
        .ok_or_else(|| HttpError::field("payment_method_id", "Unknown payment method"))?;
    let currency = currency
        .filter(|c| c.is_active)
        .ok_or_else(|| HttpError::field("currency_code", "Unsupported currency"))?;

    body.check_against(&method)?;
    check_reference(&app_state, &body, user.user.id).await?;

    let transaction = db
        .create_transaction(NewTransaction {
            transaction_id: new_reference("TXN", Utc::now()),
            user_id: user.user.id,
            method,
            transaction_type: body.transaction_type,
            amount: body.amount,
            currency_code: currency.code,
            exchange_rate: currency.exchange_rate,
            description: text::sanitize(&body.description),
            reference_id: body.reference_id,
        })
        .await
        .map_err(HttpError::from_db)?;

    tracing::info!(
        "{} opened transaction {} for {}",
        user.user.username,
        transaction.transaction_id,
        transaction.total_amount
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": transaction,
        })),
    ))
}

pub async fn get_my_transactions(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let transactions = app_state
        .db_client
        .get_user_transactions(user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(transactions)))
}

pub async fn get_transaction(
    Path(transaction_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let transaction = app_state
        .db_client
        .get_transaction(transaction_id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or(ServiceError::NotFound("Transaction"))?;

    if !can_see(&transaction, &user.user) {
        return Err(ServiceError::NotOwner(user.user.id, "transaction").into());
    }

    Ok(Json(json!({
        "status": "success",
        "data": transaction,
    })))
}

pub async fn update_transaction_status(
    Path(transaction_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<UpdateTransactionStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .db_client
        .update_transaction_status(transaction_id, body.status)
        .await
        .map_err(HttpError::from_db)?;

    match outcome {
        StatusOutcome::Updated(transaction) => Ok(Json(json!({
            "status": "success",
            "data": transaction,
        }))),
        StatusOutcome::Rejected(current) => Err(HttpError::field(
            "status",
            format!(
                "A {} transaction cannot become {}",
                current.to_str(),
                body.status.to_str()
            ),
        )),
        StatusOutcome::NotFound => Err(ServiceError::NotFound("Transaction").into()),
    }
}

pub async fn request_refund(
    Path(transaction_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<CreateRefundDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    body.reason = text::sanitize(&body.reason);

    let outcome = app_state
        .db_client
        .request_refund(transaction_id, user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    match outcome {
        RefundOutcome::Created(refund) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "status": "success",
                "data": refund,
            })),
        )),
        RefundOutcome::Rejected(errors) => Err(errors.into()),
        RefundOutcome::NotFound => Err(ServiceError::NotFound("Transaction").into()),
    }
}

pub async fn get_payment_accounts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let accounts = app_state
        .db_client
        .get_payment_accounts(user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(accounts)))
}

pub async fn create_payment_account(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(mut body): Json<CreatePaymentAccountDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    body.account_name = text::sanitize(&body.account_name);
    body.account_number = body.account_number.trim().to_string();
    body.provider = text::sanitize(&body.provider);

    let account = app_state
        .db_client
        .create_payment_account(user.user.id, body)
        .await
        .map_err(HttpError::from_db)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": account,
        })),
    ))
}

pub async fn set_primary_account(
    Path(account_id): Path<Uuid>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let account = app_state
        .db_client
        .set_primary_account(account_id, user.user.id)
        .await
        .map_err(HttpError::from_db)?
        .ok_or(ServiceError::NotFound("Payment account"))?;

    Ok(Json(json!({
        "status": "success",
        "data": account,
    })))
}

pub async fn get_wallets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let wallets = app_state
        .db_client
        .get_wallets(user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    let results: Vec<WalletDto> = wallets.into_iter().map(WalletDto::from).collect();
    Ok(Json(ListResponse::all(results)))
}

pub async fn get_my_invoices(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let invoices = app_state
        .db_client
        .get_user_invoices(user.user.id)
        .await
        .map_err(HttpError::from_db)?;

    Ok(Json(ListResponse::all(invoices)))
}

pub async fn create_invoice(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(mut body): Json<CreateInvoiceDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;
    body.check_amounts()?;
    body.notes = text::sanitize(&body.notes);

    let invoice = app_state
        .db_client
        .create_invoice(new_reference("INV", Utc::now()), body)
        .await
        .map_err(HttpError::from_db)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": invoice,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{state, user_with_role};
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn payment_routes_reject_anonymous_callers() {
        let app = payments_handler().layer(Extension(state()));

        for uri in ["/transactions", "/wallets", "/accounts", "/invoices"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn only_admins_change_transaction_status() {
        let app = Router::new()
            .route("/transactions/:transaction_id/status", put(update_transaction_status))
            .layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin])
            }))
            .layer(Extension(JWTAuthMiddeware {
                user: user_with_role(UserRole::Client),
            }))
            .layer(Extension(state()));

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/transactions/{}/status", Uuid::new_v4()))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status":"completed"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
