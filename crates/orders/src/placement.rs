//! The order placement saga.
//!
//! Steps, in order:
//! 1. Resolve the cart against the catalog, checking the combined demand per
//!    product, and freeze the line snapshot
//! 2. Persist the order under a freshly generated order number
//! 3. Reserve stock line by line with conditional decrements
//! 4. Publish `CategoryTouched` for every affected category
//!
//! If step 3 fails, the lines already reserved are restocked and the order is
//! cancelled; the failure is logged for reconciliation.

use std::collections::HashMap;
use std::time::Instant;

use common::{CategoryId, ProductId, SellerId};
use domain::{
    BuyerProfile, Identity, LineItem, Order, OrderStatus, PlaceOrder, Role, ValidationError,
};
use store::{Store, StoreError, error::constraints};

use crate::engine::{CartItem, OrderEngine, OrderView, PlaceOrderRequest};
use crate::number::OrderNumberGenerator;
use crate::{OrderError, Result};

/// Total number of order numbers tried before giving up.
pub const ORDER_NUMBER_ATTEMPTS: u32 = 2;

/// Stock taken (or to be taken) for one order line.
#[derive(Debug, Clone, Copy)]
struct Reservation {
    product_id: ProductId,
    category_id: CategoryId,
    quantity: u32,
}

/// Why reserving stock stopped part-way.
enum ReservationFailure {
    OutOfStock { breed: String },
    Store(StoreError),
}

impl<S: Store, G: OrderNumberGenerator> OrderEngine<S, G> {
    /// Places an order for the calling client.
    ///
    /// Authorization is checked before any validation, and validation before
    /// anything is written.
    #[tracing::instrument(
        skip(self, request),
        fields(user_id = %identity.user_id, items = request.items.len())
    )]
    pub async fn place_order(
        &self,
        identity: &Identity,
        request: PlaceOrderRequest,
    ) -> Result<OrderView> {
        let started = Instant::now();
        let result = self.run_placement(identity, request).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(view) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_number = %view.order.order_number(),
                    total = %view.order.total_amount(),
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.kind()).increment(1);
                tracing::info!(reason = e.kind(), error = %e, "order rejected");
            }
        }
        result
    }

    async fn run_placement(
        &self,
        identity: &Identity,
        request: PlaceOrderRequest,
    ) -> Result<OrderView> {
        if !identity.has_role(Role::Client) {
            return Err(OrderError::forbidden("Only clients can place orders"));
        }
        let buyer = self
            .store
            .find_buyer_by_user(identity.user_id)
            .await?
            .ok_or_else(|| OrderError::not_found("BuyerProfile", identity.user_id))?;

        let quantities = validate_cart(&request.items)?;
        let (seller_id, items, reservations) = self.resolve_cart(&request.items, &quantities).await?;

        let order = self
            .persist_new_order(PlaceOrder {
                buyer_id: buyer.id,
                seller_id,
                items,
                delivery_address: delivery_address(request, &buyer),
            })
            .await?;

        if let Err(failure) = self.reserve_stock(&order, &reservations).await {
            return Err(self.compensate(order, failure).await);
        }

        self.events
            .touch_categories(reservations.iter().map(|r| r.category_id))
            .await;
        self.view(order).await
    }

    /// Checks each line and freezes its price and breed, fail-fast in cart order.
    ///
    /// Lines naming the same product are checked against its stock together,
    /// so a cart that can never be served is rejected before anything is written.
    async fn resolve_cart(
        &self,
        cart: &[CartItem],
        quantities: &[u32],
    ) -> Result<(Option<SellerId>, Vec<LineItem>, Vec<Reservation>)> {
        let mut seller_id = None;
        let mut items = Vec::with_capacity(cart.len());
        let mut reservations = Vec::with_capacity(cart.len());
        let mut demand: HashMap<ProductId, u64> = HashMap::new();

        for (item, &quantity) in cart.iter().zip(quantities) {
            let product = self
                .store
                .get_product(item.product_id)
                .await?
                .ok_or_else(|| OrderError::not_found("Product", item.product_id))?;
            let wanted = demand.entry(product.id).or_default();
            *wanted += u64::from(quantity);
            if !product.can_fulfill_total(*wanted) {
                return Err(OrderError::InsufficientStock {
                    breed: product.breed,
                });
            }
            match seller_id {
                None => seller_id = Some(product.seller_id),
                Some(existing) if existing != product.seller_id => {
                    return Err(ValidationError::MixedSellers.into());
                }
                Some(_) => {}
            }
            reservations.push(Reservation {
                product_id: product.id,
                category_id: product.category_id,
                quantity,
            });
            items.push(LineItem::new(
                product.id,
                quantity,
                product.price,
                product.breed,
            ));
        }
        Ok((seller_id, items, reservations))
    }

    /// Inserts the order, drawing a new number when the store reports a clash.
    async fn persist_new_order(&self, request: PlaceOrder) -> Result<Order> {
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let order = Order::place(request.clone(), self.numbers.next_number())?;
            match self.store.insert_order(&order).await {
                Ok(()) => return Ok(order),
                Err(e) if e.is_unique_violation_of(constraints::ORDER_NUMBER) => {
                    tracing::warn!(
                        attempt,
                        order_number = %order.order_number(),
                        "order number already taken"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(OrderError::OrderNumberExhausted {
            attempts: ORDER_NUMBER_ATTEMPTS,
        })
    }

    /// Decrements stock line by line. On failure returns the lines already
    /// reserved alongside the cause.
    async fn reserve_stock(
        &self,
        order: &Order,
        reservations: &[Reservation],
    ) -> std::result::Result<(), (Vec<Reservation>, ReservationFailure)> {
        let mut reserved = Vec::with_capacity(reservations.len());
        for (reservation, item) in reservations.iter().zip(order.items()) {
            match self
                .store
                .decrement_stock_if_available(reservation.product_id, reservation.quantity)
                .await
            {
                Ok(true) => reserved.push(*reservation),
                Ok(false) => {
                    return Err((
                        reserved,
                        ReservationFailure::OutOfStock {
                            breed: item.breed.clone(),
                        },
                    ));
                }
                Err(e) => return Err((reserved, ReservationFailure::Store(e))),
            }
        }
        Ok(())
    }

    /// Undoes a partial reservation: restocks, cancels the order, and logs
    /// the event for reconciliation. Returns the error for the caller.
    async fn compensate(
        &self,
        mut order: Order,
        (reserved, failure): (Vec<Reservation>, ReservationFailure),
    ) -> OrderError {
        metrics::counter!("order_compensations_total").increment(1);

        let mut restock_failures = 0u32;
        for reservation in reserved.iter().rev() {
            match self
                .store
                .restock(reservation.product_id, reservation.quantity)
                .await
            {
                Ok(true) => {}
                Ok(false) => restock_failures += 1,
                Err(e) => {
                    restock_failures += 1;
                    tracing::error!(
                        product_id = %reservation.product_id,
                        error = %e,
                        "compensating restock failed"
                    );
                }
            }
        }

        let (reason, error) = match failure {
            ReservationFailure::OutOfStock { breed } => (
                format!("Stock for {breed} ran out while the order was being placed"),
                OrderError::InsufficientStock { breed },
            ),
            ReservationFailure::Store(e) => (
                "Stock reservation failed while the order was being placed".to_string(),
                OrderError::Store(e),
            ),
        };

        let cancelled = match order.cancel(reason.clone()) {
            Ok(()) => self
                .store
                .update_order_status(&order, OrderStatus::Pending)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "could not store compensating cancellation");
                    false
                }),
            Err(e) => {
                tracing::error!(error = %e, "order could not be cancelled");
                false
            }
        };

        tracing::error!(
            reconciliation_needed = true,
            order_id = %order.id(),
            order_number = %order.order_number(),
            lines_restocked = reserved.len() as u32 - restock_failures,
            restock_failures,
            order_cancelled = cancelled,
            reason = %reason,
            "order placement compensated"
        );

        self.events
            .touch_categories(reserved.iter().map(|r| r.category_id))
            .await;
        error
    }
}

/// Rejects empty carts and quantities outside `1..=u32::MAX`.
fn validate_cart(items: &[CartItem]) -> std::result::Result<Vec<u32>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    items
        .iter()
        .map(|item| {
            u32::try_from(item.quantity)
                .ok()
                .filter(|&q| q >= 1)
                .ok_or(ValidationError::InvalidQuantity {
                    quantity: item.quantity,
                })
        })
        .collect()
}

fn delivery_address(request: PlaceOrderRequest, buyer: &BuyerProfile) -> domain::Address {
    request
        .delivery_address
        .unwrap_or_else(|| buyer.delivery_address.clone())
}
