//! User service client.

use crate::caller::{CallSite, Fallback, ResilientCaller, ServiceUnavailable};
use crate::clients::types::{PaymentMethodDto, UserDto};
use crate::clients::{trailing_id, USER_SERVICE};
use crate::transport::OutboundRequest;

#[derive(Debug, Clone)]
pub struct UserClient {
    caller: ResilientCaller,
    get_user: CallSite<UserDto>,
    get_payment_method: CallSite<PaymentMethodDto>,
}

impl UserClient {
    pub fn new(caller: ResilientCaller) -> Self {
        // Pages can render for a guest; checkout can't proceed without a
        // payment method.
        let guest = Fallback::substitute(|request: &OutboundRequest, _| {
            UserDto::guest(trailing_id(&request.path).unwrap_or_default())
        });
        Self {
            caller,
            get_user: CallSite::new(USER_SERVICE, "get_user_by_id", guest),
            get_payment_method: CallSite::new(
                USER_SERVICE,
                "get_user_payment_method_by_id",
                Fallback::raise(),
            ),
        }
    }

    pub async fn get_user_by_id(&self, user_id: u64) -> Result<UserDto, ServiceUnavailable> {
        let request = OutboundRequest::get(format!("/api/users/{user_id}"));
        self.get_user.invoke(&self.caller, request).await
    }

    pub async fn get_user_payment_method_by_id(
        &self,
        user_id: u64,
    ) -> Result<PaymentMethodDto, ServiceUnavailable> {
        let request = OutboundRequest::get(format!("/api/users/{user_id}/payment-method"));
        self.get_payment_method.invoke(&self.caller, request).await
    }
}
