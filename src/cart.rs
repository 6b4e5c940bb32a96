// Shopping cart
// Ordered line items with quantity/price aggregation and order submission

use crate::api::{ApiError, BackendApi};
use crate::config::CartConfig;
use crate::models::{OrderPayload, OrderProduct, SelectedParam};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CartError {
    #[error("Cart is empty")]
    Empty,

    #[error("No cart line with id {0}")]
    UnknownLine(u64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(u32),

    #[error(transparent)]
    Api(#[from] ApiError),
}

// A priced product ready to go into the cart
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub amount: u32,
    pub price_single: f64,
    pub params: BTreeMap<String, SelectedParam>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub line_id: u64,
    pub id: String,
    pub name: String,
    pub amount: u32,
    pub price_single: f64,
    pub price: f64,
    pub params: BTreeMap<String, SelectedParam>,
}

impl CartLine {
    fn order_product(&self) -> OrderProduct {
        OrderProduct {
            id: self.id.clone(),
            amount: self.amount,
            price: self.price,
            price_single: self.price_single,
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartTotals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub total_number: u32,
}

pub struct Cart {
    config: CartConfig,
    lines: Vec<CartLine>,
    next_line_id: u64,
}

impl Cart {
    pub fn new(config: CartConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
            next_line_id: 1,
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, line_id: u64) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.line_id == line_id)
    }

    // Append a line, returns its handle
    pub fn add(&mut self, item: LineItem) -> Result<u64, CartError> {
        if !self.config.amount.contains(item.amount) {
            return Err(CartError::InvalidAmount(item.amount));
        }

        let line_id = self.next_line_id;
        self.next_line_id += 1;

        debug!("Adding {} x{} to cart as line {}", item.id, item.amount, line_id);
        self.lines.push(CartLine {
            line_id,
            price: item.price_single * item.amount as f64,
            id: item.id,
            name: item.name,
            amount: item.amount,
            price_single: item.price_single,
            params: item.params,
        });
        Ok(line_id)
    }

    pub fn remove(&mut self, line_id: u64) -> Result<CartLine, CartError> {
        let position = self
            .lines
            .iter()
            .position(|line| line.line_id == line_id)
            .ok_or(CartError::UnknownLine(line_id))?;

        debug!("Removing cart line {}", line_id);
        Ok(self.lines.remove(position))
    }

    pub fn set_amount(&mut self, line_id: u64, amount: u32) -> Result<&CartLine, CartError> {
        if !self.config.amount.contains(amount) {
            return Err(CartError::InvalidAmount(amount));
        }

        let line = self
            .lines
            .iter_mut()
            .find(|line| line.line_id == line_id)
            .ok_or(CartError::UnknownLine(line_id))?;
        line.amount = amount;
        line.price = line.price_single * amount as f64;
        Ok(&*line)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    // Subtotal, item count and total; the delivery fee only applies to a
    // non-empty order.
    pub fn totals(&self) -> CartTotals {
        let subtotal: f64 = self.lines.iter().map(|line| line.price).sum();
        let total_number = self.lines.iter().map(|line| line.amount).sum();

        let delivery_fee = if subtotal != 0.0 {
            self.config.default_delivery_fee
        } else {
            0.0
        };

        CartTotals {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
            total_number,
        }
    }

    pub fn order_payload(&self, phone: &str, address: &str) -> OrderPayload {
        let totals = self.totals();
        OrderPayload {
            address: address.to_string(),
            phone: phone.to_string(),
            total_price: totals.total,
            subtotal_price: totals.subtotal,
            total_number: totals.total_number,
            delivery_fee: totals.delivery_fee,
            products: self.lines.iter().map(CartLine::order_product).collect(),
        }
    }

    pub async fn submit_order(
        &self,
        backend: &dyn BackendApi,
        phone: &str,
        address: &str,
    ) -> Result<OrderPayload, CartError> {
        if self.is_empty() {
            return Err(CartError::Empty);
        }

        let payload = self.order_payload(phone, address);
        backend.submit_order(&payload).await?;
        info!(
            "Order submitted: {} lines, total {}",
            payload.products.len(),
            payload.total_price
        );
        Ok(payload)
    }
}
