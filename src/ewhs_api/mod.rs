/// eWarehousing API integration module
///
/// ## Authentication Flow
///
/// 1. The first call logs in with username and password (`wms/auth/login`)
/// 2. The API returns an access token, a refresh token and an expiry
/// 3. Calls reuse the access token until it expires
/// 4. After expiry the refresh token is exchanged for a new pair (`wms/auth/refresh`)
pub mod auth;
pub mod client;
pub mod resources;
pub mod types;
pub mod user_agent;

pub use auth::{Clock, Credentials, SystemClock, TokenManager, TokenState};
pub use client::{EwhsClient, ResourceRequest};
pub use resources::{Orders, Shipments, Stock};
pub use types::{ApiError, EwhsError};
pub use user_agent::UserAgent;
