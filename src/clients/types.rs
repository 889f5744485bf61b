//! Payloads exchanged with storefront services.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// True for the placeholder handed out when the user service is down.
    #[serde(default)]
    pub guest: bool,
}

impl UserDto {
    pub fn guest(id: u64) -> Self {
        Self {
            id,
            username: "guest".to_string(),
            email: None,
            guest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodDto {
    pub id: u64,
    pub user_id: u64,
    pub kind: String,
    pub last_four: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductItemDto {
    pub id: u64,
    pub name: String,
    /// Price in minor currency units.
    pub price_cents: u64,
    pub stock: u32,
    #[serde(default = "available")]
    pub available: bool,
}

fn available() -> bool {
    true
}

impl ProductItemDto {
    /// Shown in listings when the product service can't be reached.
    pub fn unavailable(id: u64) -> Self {
        Self {
            id,
            name: "Product temporarily unavailable".to_string(),
            price_cents: 0,
            stock: 0,
            available: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub product_id: u64,
    /// Signed change; negative when an order reserves stock.
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub order_id: u64,
    pub user_id: u64,
    pub payment_method_id: u64,
    pub amount_cents: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub transaction_id: String,
    pub order_id: u64,
    pub status: String,
}
