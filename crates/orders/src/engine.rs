//! Order engine: construction, read paths, and the post-placement lifecycle.

use std::collections::HashMap;

use catalog::CatalogEventBus;
use common::{BuyerId, OrderId, ProductId, SellerId};
use domain::{
    Address, BuyerSummary, Identity, Order, OrderStatus, PaymentStatus, Role, SellerSummary,
    ValidationError,
};
use store::Store;

use crate::number::{OrderNumberGenerator, TimestampOrderNumbers};
use crate::{OrderError, Result};

/// One line of a submitted cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    /// Signed so that zero and negative quantities reach validation.
    pub quantity: i64,
}

/// A cart submitted for placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrderRequest {
    pub items: Vec<CartItem>,
    /// Falls back to the buyer's default address when absent.
    pub delivery_address: Option<Address>,
}

/// An order with its counterpart summaries resolved at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order: Order,
    pub seller: Option<SellerSummary>,
    pub buyer: Option<BuyerSummary>,
}

/// Places orders and drives them through their lifecycle.
///
/// Placement is a saga over two store operations: the order is persisted,
/// then each line's stock is decremented conditionally. A failed decrement
/// restocks what was taken and cancels the order.
#[derive(Clone)]
pub struct OrderEngine<S, G = TimestampOrderNumbers> {
    pub(crate) store: S,
    pub(crate) events: CatalogEventBus,
    pub(crate) numbers: G,
}

impl<S: Store> OrderEngine<S> {
    /// Creates an engine with timestamp-based order numbers.
    pub fn new(store: S, events: CatalogEventBus) -> Self {
        Self::with_generator(store, events, TimestampOrderNumbers)
    }
}

impl<S: Store, G: OrderNumberGenerator> OrderEngine<S, G> {
    /// Creates an engine with a custom order number generator.
    pub fn with_generator(store: S, events: CatalogEventBus, numbers: G) -> Self {
        Self {
            store,
            events,
            numbers,
        }
    }

    /// Returns the calling buyer's orders, newest first.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn list_for_buyer(&self, identity: &Identity) -> Result<Vec<OrderView>> {
        if !identity.has_role(Role::Client) {
            return Err(OrderError::forbidden("Only clients have purchase orders"));
        }
        let buyer = self
            .store
            .find_buyer_by_user(identity.user_id)
            .await?
            .ok_or_else(|| OrderError::not_found("BuyerProfile", identity.user_id))?;

        let orders = self.store.orders_for_buyer(buyer.id).await?;
        let mut sellers: HashMap<SellerId, Option<SellerSummary>> = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let seller = match order.seller_id() {
                Some(seller_id) => self.seller_summary(&mut sellers, seller_id).await?,
                None => None,
            };
            views.push(OrderView {
                order,
                seller,
                buyer: None,
            });
        }
        Ok(views)
    }

    /// Returns the orders assigned to the calling seller, newest first.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn list_for_seller(&self, identity: &Identity) -> Result<Vec<OrderView>> {
        if !identity.has_role(Role::Eleveur) {
            return Err(OrderError::forbidden("Only sellers have sales orders"));
        }
        let seller = self
            .store
            .find_seller_by_user(identity.user_id)
            .await?
            .ok_or_else(|| OrderError::not_found("SellerProfile", identity.user_id))?;

        let orders = self.store.orders_for_seller(seller.id).await?;
        let mut buyers: HashMap<BuyerId, Option<BuyerSummary>> = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let buyer = self.buyer_summary(&mut buyers, order.buyer_id()).await?;
            views.push(OrderView {
                order,
                seller: None,
                buyer,
            });
        }
        Ok(views)
    }

    /// Returns one order to its buyer, its assigned seller, or back office.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn get_order(&self, identity: &Identity, order_id: OrderId) -> Result<OrderView> {
        let order = self.load(order_id).await?;
        let allowed = match identity.role {
            Role::Gestionnaire | Role::Admin => true,
            Role::Client => self
                .store
                .find_buyer_by_user(identity.user_id)
                .await?
                .is_some_and(|b| b.id == order.buyer_id()),
            Role::Eleveur => self.is_assigned_seller(identity, &order).await?,
        };
        if !allowed {
            return Err(OrderError::forbidden("You do not have access to this order"));
        }
        self.view(order).await
    }

    /// Moves an order along its lifecycle. Assigned seller or back office.
    ///
    /// Cancelling restocks every line.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn update_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<OrderView> {
        let mut order = self.load(order_id).await?;
        self.authorize_fulfilment(identity, &order).await?;

        let expected = order.status();
        if target == OrderStatus::Cancelled {
            order.cancel(format!("Cancelled by {}", identity.role))?;
        } else {
            order.transition_to(target)?;
        }
        self.save_status(&order, expected).await?;
        tracing::info!(
            order_number = %order.order_number(),
            from = %expected,
            to = %target,
            "order status changed"
        );

        if target == OrderStatus::Cancelled {
            self.restock_order(&order).await;
        }
        self.view(order).await
    }

    /// Cancels the calling buyer's own pending order and restocks it.
    #[tracing::instrument(skip(self, reason), fields(user_id = %identity.user_id))]
    pub async fn cancel_order(
        &self,
        identity: &Identity,
        order_id: OrderId,
        reason: Option<String>,
    ) -> Result<OrderView> {
        if !identity.has_role(Role::Client) {
            return Err(OrderError::forbidden("Only the buyer can cancel an order"));
        }
        let buyer = self
            .store
            .find_buyer_by_user(identity.user_id)
            .await?
            .ok_or_else(|| OrderError::not_found("BuyerProfile", identity.user_id))?;
        let mut order = self.load(order_id).await?;
        if order.buyer_id() != buyer.id {
            return Err(OrderError::forbidden("You can only cancel your own orders"));
        }
        if order.status() != OrderStatus::Pending {
            return Err(OrderError::NotCancellable {
                status: order.status(),
            });
        }

        order.cancel(reason.unwrap_or_else(|| "Cancelled by buyer".to_string()))?;
        self.save_status(&order, OrderStatus::Pending).await?;
        tracing::info!(order_number = %order.order_number(), "order cancelled by buyer");

        self.restock_order(&order).await;
        self.view(order).await
    }

    /// Records the payment outcome. Assigned seller or back office.
    #[tracing::instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn set_payment_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<OrderView> {
        if payment_status == PaymentStatus::Pending {
            return Err(ValidationError::field("paymentStatus", "must be paid or failed").into());
        }
        let mut order = self.load(order_id).await?;
        self.authorize_fulfilment(identity, &order).await?;

        let expected = order.status();
        order.set_payment_status(payment_status);
        self.save_status(&order, expected).await?;
        tracing::info!(
            order_number = %order.order_number(),
            payment_status = payment_status.as_str(),
            "payment status changed"
        );
        self.view(order).await
    }

    pub(crate) async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Order", order_id))
    }

    /// Writes the order's mutable fields if its status is still `expected`.
    async fn save_status(&self, order: &Order, expected: OrderStatus) -> Result<()> {
        if self.store.update_order_status(order, expected).await? {
            return Ok(());
        }
        match self.store.get_order(order.id()).await? {
            Some(_) => Err(OrderError::ConcurrentUpdate {
                order_id: order.id(),
            }),
            None => Err(OrderError::not_found("Order", order.id())),
        }
    }

    /// Puts every line of a cancelled order back into stock.
    ///
    /// The cancellation is already stored, so failures are logged for
    /// reconciliation rather than returned.
    pub(crate) async fn restock_order(&self, order: &Order) {
        let mut categories = Vec::new();
        for item in order.items() {
            match self.store.restock(item.product_id, item.quantity).await {
                Ok(true) => {
                    if let Ok(Some(product)) = self.store.get_product(item.product_id).await {
                        categories.push(product.category_id);
                    }
                }
                Ok(false) => {
                    tracing::warn!(
                        order_number = %order.order_number(),
                        product_id = %item.product_id,
                        "product no longer exists, line not restocked"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        reconciliation_needed = true,
                        order_number = %order.order_number(),
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %e,
                        "restock of cancelled order line failed"
                    );
                }
            }
        }
        self.events.touch_categories(categories).await;
    }

    async fn authorize_fulfilment(&self, identity: &Identity, order: &Order) -> Result<()> {
        if identity.role.is_elevated() || self.is_assigned_seller(identity, order).await? {
            return Ok(());
        }
        Err(OrderError::forbidden(
            "Only the assigned seller or back office can update this order",
        ))
    }

    async fn is_assigned_seller(&self, identity: &Identity, order: &Order) -> Result<bool> {
        if !identity.has_role(Role::Eleveur) {
            return Ok(false);
        }
        let seller = self.store.find_seller_by_user(identity.user_id).await?;
        Ok(seller.is_some_and(|s| Some(s.id) == order.seller_id()))
    }

    pub(crate) async fn view(&self, order: Order) -> Result<OrderView> {
        let seller = match order.seller_id() {
            Some(seller_id) => self.store.get_seller(seller_id).await?.map(|s| s.summary()),
            None => None,
        };
        let buyer = self
            .store
            .get_buyer(order.buyer_id())
            .await?
            .map(|b| b.summary());
        Ok(OrderView {
            order,
            seller,
            buyer,
        })
    }

    async fn seller_summary(
        &self,
        cache: &mut HashMap<SellerId, Option<SellerSummary>>,
        seller_id: SellerId,
    ) -> Result<Option<SellerSummary>> {
        if let Some(cached) = cache.get(&seller_id) {
            return Ok(cached.clone());
        }
        let summary = self.store.get_seller(seller_id).await?.map(|s| s.summary());
        cache.insert(seller_id, summary.clone());
        Ok(summary)
    }

    async fn buyer_summary(
        &self,
        cache: &mut HashMap<BuyerId, Option<BuyerSummary>>,
        buyer_id: BuyerId,
    ) -> Result<Option<BuyerSummary>> {
        if let Some(cached) = cache.get(&buyer_id) {
            return Ok(cached.clone());
        }
        let summary = self.store.get_buyer(buyer_id).await?.map(|b| b.summary());
        cache.insert(buyer_id, summary.clone());
        Ok(summary)
    }
}
