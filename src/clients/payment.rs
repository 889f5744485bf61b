//! Payment service client.

use crate::caller::{CallSite, Fallback, ResilientCaller, ServiceUnavailable};
use crate::clients::types::{ChargeReceipt, ChargeRequest};
use crate::clients::{invalid_request, PAYMENT_SERVICE};
use crate::transport::OutboundRequest;

#[derive(Debug, Clone)]
pub struct PaymentClient {
    caller: ResilientCaller,
    charge: CallSite<ChargeReceipt>,
}

impl PaymentClient {
    pub fn new(caller: ResilientCaller) -> Self {
        Self {
            caller,
            charge: CallSite::new(PAYMENT_SERVICE, "charge", Fallback::raise()),
        }
    }

    /// Charge an order. Never substitutes a receipt.
    pub async fn charge(&self, charge: &ChargeRequest) -> Result<ChargeReceipt, ServiceUnavailable> {
        let request = OutboundRequest::post("/api/payments/charge")
            .with_json(charge)
            .map_err(|e| invalid_request(&self.charge, e))?;
        self.charge.invoke(&self.caller, request).await
    }
}
