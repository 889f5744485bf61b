//! Typed clients for storefront services.
//!
//! # Data Flow
//! ```text
//! Business logic
//!     → UserClient / ProductClient / PaymentClient
//!     → CallSite (operation name + fallback policy)
//!     → ResilientCaller
//! ```
//!
//! # Fallback Policy
//! - Reads that only feed a page degrade (guest user, unavailable product)
//! - Anything money or stock related raises `ServiceUnavailable`

pub mod payment;
pub mod product;
pub mod types;
pub mod user;

pub use payment::PaymentClient;
pub use product::ProductClient;
pub use types::{ChargeReceipt, ChargeRequest, PaymentMethodDto, ProductItemDto, StockUpdate, UserDto};
pub use user::UserClient;

use crate::caller::{CallSite, ServiceUnavailable};
use crate::resilience::CallError;
use crate::transport::TransportError;

pub const USER_SERVICE: &str = "user-service";
pub const PRODUCT_SERVICE: &str = "product-service";
pub const PAYMENT_SERVICE: &str = "payment-service";

/// Last numeric path segment, e.g. `7` in `/api/products/7`.
pub(crate) fn trailing_id(path: &str) -> Option<u64> {
    path.split('?')
        .next()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

/// A request for `site` that could not be built. Nothing was sent.
pub(crate) fn invalid_request<T>(site: &CallSite<T>, error: TransportError) -> ServiceUnavailable {
    tracing::error!(
        target_name = %site.target,
        operation = %site.operation,
        error = %error,
        "Failed to build outbound request"
    );
    ServiceUnavailable {
        target: site.target.clone(),
        operation: site.operation.clone(),
        cause: CallError::Permanent(error),
    }
}
