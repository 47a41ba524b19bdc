//! eWarehousing SDK
//!
//! A Rust library for the eWarehousing warehouse-management REST API.
//!
//! This SDK provides:
//! - Bearer-token lifecycle handling (login, refresh, expiry)
//! - Generic `filter`/`get`/`create`/`update`/`delete` calls on any resource
//! - Typed accessors for orders, shipments and stock
//! - Typed errors for authentication failures, bad requests and server errors
//!
//! # Example
//!
//! ```no_run
//! use ewhs_sdk::{ClientConfig, EwhsClient, EwhsError};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("api-user", "secret")
//!     .with_customer_code("CUST01")
//!     .with_wms_code("WMS01");
//! let client = EwhsClient::new(config)?;
//!
//! // List created orders
//! let orders = client.orders().list(&[("status", "created")]).await?;
//!
//! // Update one, inspecting validation errors
//! match client
//!     .orders()
//!     .update("94dbdb91-87ac-4634-b77d-e126a6206b15", &json!({"note": "Rush"}))
//!     .await
//! {
//!     Ok(order) => println!("Updated: {:?}", order),
//!     Err(EwhsError::BadRequest { errors }) => println!("Rejected: {}", errors),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ewhs_api;

// Re-export commonly used types
pub use config::{ClientConfig, DEFAULT_API_URL};
pub use ewhs_api::{
    auth::{Clock, SystemClock, TokenManager, TokenState},
    client::{EwhsClient, ResourceRequest, CLIENT_VERSION},
    resources::{Orders, Shipments, Stock},
    types::{ApiError, EwhsError},
    user_agent::UserAgent,
};
