//! Order aggregate: an immutable snapshot of a placed cart.

use chrono::{DateTime, Utc};
use common::{BuyerId, OrderId, ProductId, SellerId};
use serde::{Deserialize, Serialize};

use crate::error::{TransitionError, ValidationError};
use crate::value_objects::{Address, Money};

use super::{OrderStatus, PaymentMethod, PaymentStatus};

/// Human-readable, globally unique order number (`CMD-<millis>-<token>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub const PREFIX: &'static str = "CMD";

    /// Builds an order number from a timestamp and a random token.
    pub fn compose(epoch_millis: i64, token: &str) -> Self {
        Self(format!("{}-{epoch_millis}-{token}", Self::PREFIX))
    }

    /// Wraps an already-formatted order number, as read back from storage.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One product line of an order.
///
/// `unit_price` and `breed` are copies taken when the order was placed and
/// never follow later edits of the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub breed: String,
}

impl LineItem {
    pub fn new(
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
        breed: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            breed: breed.into(),
        }
    }

    /// Returns `unit_price × quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Everything needed to place an order, before it gets a number.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub buyer_id: BuyerId,
    pub seller_id: Option<SellerId>,
    pub items: Vec<LineItem>,
    pub delivery_address: Address,
}

/// Order aggregate root.
///
/// The line items and total are fixed at placement. Afterwards only the
/// status, the payment status, and the notes change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    buyer_id: BuyerId,
    seller_id: Option<SellerId>,
    items: Vec<LineItem>,
    total_amount: Money,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    delivery_address: Address,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Flat persistence form of an [`Order`], used by storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub buyer_id: BuyerId,
    pub seller_id: Option<SellerId>,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub delivery_address: Address,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending, cash-on-delivery order from a cart snapshot.
    ///
    /// Fails if the cart is empty, a line has a zero quantity, or the total
    /// overflows.
    pub fn place(request: PlaceOrder, order_number: OrderNumber) -> Result<Self, ValidationError> {
        if request.items.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        let mut total = Money::zero();
        for item in &request.items {
            if item.quantity == 0 {
                return Err(ValidationError::InvalidQuantity {
                    quantity: i64::from(item.quantity),
                });
            }
            total = item
                .line_total()
                .and_then(|line| total.checked_add(line))
                .ok_or(ValidationError::TotalOverflow)?;
        }
        request.delivery_address.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            order_number,
            buyer_id: request.buyer_id,
            seller_id: request.seller_id,
            items: request.items,
            total_amount: total,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            delivery_address: request.delivery_address,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the order to `target` if the lifecycle allows it.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cancels the order, recording why.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition_to(OrderStatus::Cancelled)?;
        self.notes = Some(reason.into());
        Ok(())
    }

    /// Records a payment status change.
    pub fn set_payment_status(&mut self, payment_status: PaymentStatus) {
        self.payment_status = payment_status;
        self.updated_at = Utc::now();
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn buyer_id(&self) -> BuyerId {
        self.buyer_id
    }

    pub fn seller_id(&self) -> Option<SellerId> {
        self.seller_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn delivery_address(&self) -> &Address {
        &self.delivery_address
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the total number of units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Returns the flat persistence form.
    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            order_number: self.order_number.clone(),
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            items: self.items.clone(),
            total_amount: self.total_amount,
            status: self.status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            delivery_address: self.delivery_address.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Self {
            id: record.id,
            order_number: record.order_number,
            buyer_id: record.buyer_id,
            seller_id: record.seller_id,
            items: record.items,
            total_amount: record.total_amount,
            status: record.status,
            payment_method: record.payment_method,
            payment_status: record.payment_status,
            delivery_address: record.delivery_address,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: Vec<LineItem>) -> PlaceOrder {
        PlaceOrder {
            buyer_id: BuyerId::new(),
            seller_id: Some(SellerId::new()),
            items,
            delivery_address: Address::new("Cocody, Rue des Jardins", "Abidjan"),
        }
    }

    fn number() -> OrderNumber {
        OrderNumber::compose(1_700_000_000_000, "abc123xyz")
    }

    #[test]
    fn test_order_number_format() {
        assert_eq!(number().as_str(), "CMD-1700000000000-abc123xyz");
    }

    #[test]
    fn test_place_computes_total() {
        let order = Order::place(
            request(vec![
                LineItem::new(ProductId::new(), 2, Money::from_units(15000), "Californien"),
                LineItem::new(ProductId::new(), 1, Money::from_units(8000), "Fauve de Bourgogne"),
            ]),
            number(),
        )
        .unwrap();

        assert_eq!(order.total_amount().units(), 38000);
        assert_eq!(order.total_quantity(), 3);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_method(), PaymentMethod::CashOnDelivery);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
    }

    #[test]
    fn test_place_rejects_empty_cart() {
        let err = Order::place(request(vec![]), number()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyCart);
    }

    #[test]
    fn test_place_rejects_zero_quantity() {
        let err = Order::place(
            request(vec![LineItem::new(
                ProductId::new(),
                0,
                Money::from_units(100),
                "Rex",
            )]),
            number(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidQuantity { quantity: 0 });
    }

    #[test]
    fn test_place_rejects_overflowing_total() {
        let err = Order::place(
            request(vec![LineItem::new(
                ProductId::new(),
                u32::MAX,
                Money::from_units(i64::MAX / 2),
                "Géant des Flandres",
            )]),
            number(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::TotalOverflow);
    }

    #[test]
    fn test_cancel_records_reason_and_is_terminal() {
        let mut order = Order::place(
            request(vec![LineItem::new(
                ProductId::new(),
                1,
                Money::from_units(100),
                "Rex",
            )]),
            number(),
        )
        .unwrap();

        order.cancel("out of stock").unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.notes(), Some("out of stock"));
        assert!(order.transition_to(OrderStatus::Confirmed).is_err());
    }

    #[test]
    fn test_record_roundtrip_preserves_snapshot() {
        let order = Order::place(
            request(vec![LineItem::new(
                ProductId::new(),
                3,
                Money::from_units(500),
                "Bélier",
            )]),
            number(),
        )
        .unwrap();
        let restored = Order::from(order.to_record());
        assert_eq!(restored, order);
    }
}
