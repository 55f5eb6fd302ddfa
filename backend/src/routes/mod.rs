//! Route definitions for the ERP backend

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth (public)
        .route("/login", post(handlers::login))
        // Everything else requires a bearer token
        .merge(protected_routes(state))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes())
        .nest("/sales", sale_routes())
        .nest("/purchases", purchase_routes())
        .nest("/employees", employee_routes())
        .nest("/customers", customer_routes())
        .route("/products/restock", post(handlers::restock_products))
        .route("/accounts", get(handlers::list_accounts))
        .route("/transactions", get(handlers::transactions_by_memo))
        .nest("/reports", report_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Order lifecycle routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/items", get(handlers::get_order_items))
        .route(
            "/:order_id",
            get(handlers::get_order)
                .patch(handlers::update_order)
                .delete(handlers::cancel_order),
        )
        .route("/:order_id/checkout", patch(handlers::checkout_order))
        .route("/:order_id/delivery", patch(handlers::confirm_delivery))
}

/// Sale routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_sale))
        .route(
            "/:memo_no",
            get(handlers::get_sale).patch(handlers::update_sale),
        )
}

/// Purchase routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_purchase))
        .route("/:purchase_id", patch(handlers::update_purchase))
}

/// Salary and worker progress routes
fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/salary", post(handlers::submit_salary))
        .route("/progress", post(handlers::record_progress))
}

/// Customer routes
fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/:customer_id", get(handlers::get_customer))
        .route("/:customer_id/due/collect", post(handlers::collect_due))
}

/// Report routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/branch", get(handlers::branch_report))
        .route("/employee-progress", get(handlers::employee_progress_report))
}
