//! Product service client.

use crate::caller::{CallSite, Fallback, ResilientCaller, ServiceUnavailable};
use crate::clients::types::{ProductItemDto, StockUpdate};
use crate::clients::{invalid_request, trailing_id, PRODUCT_SERVICE};
use crate::transport::OutboundRequest;

#[derive(Debug, Clone)]
pub struct ProductClient {
    caller: ResilientCaller,
    get_item: CallSite<ProductItemDto>,
    update_stock: CallSite<()>,
}

impl ProductClient {
    pub fn new(caller: ResilientCaller) -> Self {
        let placeholder = Fallback::substitute(|request: &OutboundRequest, _| {
            ProductItemDto::unavailable(trailing_id(&request.path).unwrap_or_default())
        });
        Self {
            caller,
            get_item: CallSite::new(PRODUCT_SERVICE, "get_product_item", placeholder),
            update_stock: CallSite::new(PRODUCT_SERVICE, "update_stock", Fallback::raise()),
        }
    }

    pub async fn get_product_item(&self, product_id: u64) -> Result<ProductItemDto, ServiceUnavailable> {
        let request = OutboundRequest::get(format!("/api/products/{product_id}"));
        self.get_item.invoke(&self.caller, request).await
    }

    /// Apply a stock change. The service answers 204 on success.
    pub async fn update_stock(&self, update: &StockUpdate) -> Result<(), ServiceUnavailable> {
        let request = OutboundRequest::put(format!("/api/products/{}/stock", update.product_id))
            .with_json(update)
            .map_err(|e| invalid_request(&self.update_stock, e))?;
        self.update_stock.invoke(&self.caller, request).await
    }
}

