//! HttpClient against a local axum server speaking the response envelope

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use cashier_client::{ClientConfig, HttpClient};
use cashier_engine::orders::send_new_lines;
use cashier_engine::{MemoryStore, OrderApi, OrderRegistry, RemoteError};
use rust_decimal::Decimal;
use shared::order::wire::{
    CheckoutEndpoint, CheckoutReceipt, CheckoutRequest, CreateLinesRequest, CreateLinesResponse,
    StatusUpdateRequest, VoidLinesRequest,
};
use shared::order::{LineCandidate, OrderContext};
use shared::{ApiResponse, AppError, ErrorCode};

const TOKEN: &str = "t-1";

async fn create_lines(headers: HeaderMap, Json(req): Json<CreateLinesRequest>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer t-1");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }

    let remote_line_ids = (1..=req.products.len())
        .map(|i| vec![format!("r-{}", i)])
        .collect();
    Json(ApiResponse::ok(CreateLinesResponse { remote_line_ids })).into_response()
}

async fn fetch_order() -> Response {
    let err = AppError::new(ErrorCode::OrderNotFound);
    (StatusCode::NOT_FOUND, Json(ApiResponse::<()>::error(&err))).into_response()
}

async fn update_status(Json(_): Json<StatusUpdateRequest>) -> Response {
    let err = AppError::with_message(ErrorCode::StatusTransitionInvalid, "Line r-1 is done");
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::<()>::error(&err)),
    )
        .into_response()
}

async fn void_lines(Json(_): Json<VoidLinesRequest>) -> Response {
    (StatusCode::FORBIDDEN, "wrong manager password").into_response()
}

async fn checkout(Json(req): Json<CheckoutRequest>) -> Response {
    Json(ApiResponse::ok(CheckoutReceipt {
        order_id: "o-1".into(),
        order_number: Some("A-17".into()),
        payable_total: req.payable_total,
        created_at: None,
    }))
    .into_response()
}

async fn validate_code() -> Response {
    let err = AppError::with_message(ErrorCode::DiscountCodeInvalid, "Code SUMMER is not valid");
    // rejection inside a 200 envelope
    Json(ApiResponse::<()>::error(&err)).into_response()
}

async fn transfer() -> &'static str {
    "<html>proxy error</html>"
}

async fn serve() -> String {
    let app = Router::new()
        .route("/api/orders/lines", post(create_lines))
        .route("/api/orders/current", post(fetch_order))
        .route("/api/orders/lines/status", post(update_status))
        .route("/api/orders/lines/void", post(void_lines))
        .route("/api/tables/transfer", post(transfer))
        .route("/api/checkout/take-away", post(checkout))
        .route("/api/discount-codes/validate", post(validate_code));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn client() -> HttpClient {
    ClientConfig::new(serve().await)
        .with_token(TOKEN)
        .with_timeout(5)
        .build_http_client()
        .unwrap()
}

fn take_away_checkout() -> CheckoutRequest {
    CheckoutRequest {
        endpoint: CheckoutEndpoint::TakeAway,
        context: OrderContext::take_away("s-1"),
        products: Vec::new(),
        remote_line_ids: Vec::new(),
        subtotal: Decimal::from(100),
        tax: Decimal::from(14),
        service_fee: Decimal::ZERO,
        delivery_fee: Decimal::ZERO,
        discount_total: Decimal::ZERO,
        payable_total: Decimal::from(114),
        splits: Vec::new(),
        discount_code: None,
        due_customer_id: None,
        due_module: false,
    }
}

#[tokio::test]
async fn send_new_lines_over_http() {
    let client = client().await;
    let registry = OrderRegistry::new(MemoryStore::shared());
    let handle = registry.switch_to(&OrderContext::dine_in("T2"));
    {
        let mut store = handle.lock();
        store
            .add_line(LineCandidate::new("tea", "Tea", Decimal::from(12)), Decimal::ONE)
            .unwrap();
        store
            .add_line(LineCandidate::new("cake", "Cake", Decimal::from(30)), Decimal::ONE)
            .unwrap();
    }

    assert_eq!(send_new_lines(&handle, &client).await.unwrap(), 2);
    let store = handle.lock();
    assert_eq!(store.lines()[0].remote_line_ids, vec!["r-1".to_string()]);
    assert_eq!(store.lines()[1].remote_line_ids, vec!["r-2".to_string()]);
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let client = ClientConfig::new(serve().await).build_http_client().unwrap();
    let err = client
        .create_lines(CreateLinesRequest {
            context: OrderContext::dine_in("T2"),
            products: Vec::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotAuthenticated);
}

#[tokio::test]
async fn missing_remote_order_is_empty() {
    let client = client().await;
    let lines = client
        .fetch_order(&OrderContext::dine_in("T5"))
        .await
        .unwrap();
    assert!(lines.is_empty());
}

#[tokio::test]
async fn envelope_message_is_kept() {
    let client = client().await;
    let err = client
        .update_status(StatusUpdateRequest {
            table_id: Some("T2".into()),
            remote_line_ids: vec!["r-1".into()],
            status: "preparing".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RemoteError::Rejected {
            code: ErrorCode::StatusTransitionInvalid,
            message: "Line r-1 is done".into(),
        }
    );

    let err = client
        .validate_discount_code(&OrderContext::take_away("s-1"), "SUMMER")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DiscountCodeInvalid);
    assert_eq!(err.to_string(), "Code SUMMER is not valid");
}

#[tokio::test]
async fn bare_status_is_rejection() {
    let client = client().await;
    let err = client
        .void_lines(VoidLinesRequest {
            table_id: Some("T2".into()),
            remote_line_ids: vec!["r-1".into()],
            manager_id: "m-1".into(),
            manager_password: "0000".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ManagerPasswordInvalid);
    assert_eq!(err.to_string(), "wrong manager password");
}

#[tokio::test]
async fn checkout_goes_to_endpoint_path() {
    let client = client().await;
    let receipt = client.checkout(take_away_checkout()).await.unwrap();
    assert_eq!(receipt.order_id, "o-1");
    assert_eq!(receipt.payable_total, Decimal::from(114));

    // no route for delivery on this server
    let mut request = take_away_checkout();
    request.endpoint = CheckoutEndpoint::Delivery;
    let err = client.checkout(request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn unreadable_body_is_transport() {
    let client = client().await;
    let err = client
        .transfer(shared::order::wire::TransferRequest {
            source_table_id: "T1".into(),
            destination_table_id: "T2".into(),
            remote_line_ids: vec!["r-1".into()],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ClientConfig::new(format!("http://{}", addr))
        .with_timeout(2)
        .build_http_client()
        .unwrap();
    let err = client
        .fetch_order(&OrderContext::dine_in("T1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
    assert_eq!(err.code(), ErrorCode::NetworkError);
}
