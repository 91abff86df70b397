//! Order engine tests against the in-memory store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use catalog::{CatalogService, ProfileService};
use common::{BuyerId, CategoryId, OrderId, ProductId, SellerId};
use domain::{
    Address, BuyerKind, BuyerProfile, Category, CategoryStats, Identity, Money, NewProduct, Order,
    OrderNumber, OrderStatus, PaymentStatus, Product, ProductPatch, Role, SellerProfile, UserId,
    ValidationError,
};
use orders::{
    CartItem, OrderEngine, OrderError, OrderNumberGenerator, PlaceOrderRequest,
    TimestampOrderNumbers,
};
use store::{
    CategoryStore, InMemoryStore, OrderStore, ProductPage, ProductQuery, ProductStore,
    ProfileStore, Store,
};

/// Hands out a scripted sequence of order numbers, repeating the last one.
struct ScriptedNumbers(Mutex<VecDeque<&'static str>>);

impl ScriptedNumbers {
    fn new(tokens: &[&'static str]) -> Self {
        Self(Mutex::new(tokens.iter().copied().collect()))
    }
}

impl OrderNumberGenerator for ScriptedNumbers {
    fn next_number(&self) -> OrderNumber {
        let mut tokens = self.0.lock().unwrap();
        let token = if tokens.len() > 1 {
            tokens.pop_front().unwrap()
        } else {
            tokens[0]
        };
        OrderNumber::compose(1_700_000_000_000, token)
    }
}

/// In-memory store where one product sells out between the cart check and
/// the stock reservation, as when another buyer wins the race.
#[derive(Clone)]
struct SoldOutOnReserve {
    inner: InMemoryStore,
    sold_out: Arc<Mutex<Option<ProductId>>>,
}

impl SoldOutOnReserve {
    fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            sold_out: Arc::new(Mutex::new(None)),
        }
    }

    fn sell_out(&self, product: &Product) {
        *self.sold_out.lock().unwrap() = Some(product.id);
    }
}

#[async_trait]
impl ProfileStore for SoldOutOnReserve {
    async fn insert_buyer(&self, profile: &BuyerProfile) -> store::Result<()> {
        self.inner.insert_buyer(profile).await
    }

    async fn insert_seller(&self, profile: &SellerProfile) -> store::Result<()> {
        self.inner.insert_seller(profile).await
    }

    async fn get_buyer(&self, buyer_id: BuyerId) -> store::Result<Option<BuyerProfile>> {
        self.inner.get_buyer(buyer_id).await
    }

    async fn get_seller(&self, seller_id: SellerId) -> store::Result<Option<SellerProfile>> {
        self.inner.get_seller(seller_id).await
    }

    async fn find_buyer_by_user(&self, user_id: UserId) -> store::Result<Option<BuyerProfile>> {
        self.inner.find_buyer_by_user(user_id).await
    }

    async fn find_seller_by_user(&self, user_id: UserId) -> store::Result<Option<SellerProfile>> {
        self.inner.find_seller_by_user(user_id).await
    }

    async fn set_seller_approval(
        &self,
        seller_id: SellerId,
        approved: bool,
    ) -> store::Result<Option<SellerProfile>> {
        self.inner.set_seller_approval(seller_id, approved).await
    }
}

#[async_trait]
impl CategoryStore for SoldOutOnReserve {
    async fn insert_category(&self, category: &Category) -> store::Result<()> {
        self.inner.insert_category(category).await
    }

    async fn get_category(&self, category_id: CategoryId) -> store::Result<Option<Category>> {
        self.inner.get_category(category_id).await
    }

    async fn find_category_by_name(&self, name: &str) -> store::Result<Option<Category>> {
        self.inner.find_category_by_name(name).await
    }

    async fn list_active_categories(&self) -> store::Result<Vec<Category>> {
        self.inner.list_active_categories().await
    }

    async fn recompute_category_stock(&self, category_id: CategoryId) -> store::Result<Option<u64>> {
        self.inner.recompute_category_stock(category_id).await
    }

    async fn category_stats(&self) -> store::Result<Vec<CategoryStats>> {
        self.inner.category_stats().await
    }
}

#[async_trait]
impl ProductStore for SoldOutOnReserve {
    async fn insert_product(&self, product: &Product) -> store::Result<()> {
        self.inner.insert_product(product).await
    }

    async fn get_product(&self, product_id: ProductId) -> store::Result<Option<Product>> {
        self.inner.get_product(product_id).await
    }

    async fn update_product(&self, product: &Product, expected_version: i64) -> store::Result<bool> {
        self.inner.update_product(product, expected_version).await
    }

    async fn delete_product(&self, product_id: ProductId) -> store::Result<Option<Product>> {
        self.inner.delete_product(product_id).await
    }

    async fn query_products(&self, query: &ProductQuery) -> store::Result<ProductPage> {
        self.inner.query_products(query).await
    }

    async fn products_by_seller(&self, seller_id: SellerId) -> store::Result<Vec<Product>> {
        self.inner.products_by_seller(seller_id).await
    }

    async fn decrement_stock_if_available(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> store::Result<bool> {
        let sold_out = *self.sold_out.lock().unwrap();
        if sold_out == Some(product_id) {
            return Ok(false);
        }
        self.inner
            .decrement_stock_if_available(product_id, quantity)
            .await
    }

    async fn restock(&self, product_id: ProductId, quantity: u32) -> store::Result<bool> {
        self.inner.restock(product_id, quantity).await
    }
}

#[async_trait]
impl OrderStore for SoldOutOnReserve {
    async fn insert_order(&self, order: &Order) -> store::Result<()> {
        self.inner.insert_order(order).await
    }

    async fn get_order(&self, order_id: OrderId) -> store::Result<Option<Order>> {
        self.inner.get_order(order_id).await
    }

    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> store::Result<bool> {
        self.inner.update_order_status(order, expected).await
    }

    async fn orders_for_buyer(&self, buyer_id: BuyerId) -> store::Result<Vec<Order>> {
        self.inner.orders_for_buyer(buyer_id).await
    }

    async fn orders_for_seller(&self, seller_id: SellerId) -> store::Result<Vec<Order>> {
        self.inner.orders_for_seller(seller_id).await
    }
}

struct Market<S = InMemoryStore, G = TimestampOrderNumbers> {
    store: S,
    catalog: CatalogService<S>,
    engine: OrderEngine<S, G>,
    seller: Identity,
    buyer: Identity,
    category: Category,
}

async fn market() -> Market {
    market_on(InMemoryStore::new(), TimestampOrderNumbers).await
}

async fn market_with<G: OrderNumberGenerator>(numbers: G) -> Market<InMemoryStore, G> {
    market_on(InMemoryStore::new(), numbers).await
}

async fn market_on<S: Store, G: OrderNumberGenerator>(store: S, numbers: G) -> Market<S, G> {
    let catalog = CatalogService::new(store.clone());
    let engine = OrderEngine::with_generator(store.clone(), catalog.events().clone(), numbers);
    let profiles = ProfileService::new(store.clone());

    let admin = Identity::new(UserId::new(), Role::Admin);
    let seller = Identity::new(UserId::new(), Role::Eleveur);
    let seller_profile = profiles
        .register_seller(&seller, "Élevage du Bandama", "Bouaké", None)
        .await
        .unwrap();
    profiles
        .set_seller_approval(&admin, seller_profile.id, true)
        .await
        .unwrap();

    let buyer = Identity::new(UserId::new(), Role::Client);
    profiles
        .register_buyer(
            &buyer,
            BuyerKind::Particulier,
            Address::new("Plateau, Avenue Chardy", "Abidjan"),
        )
        .await
        .unwrap();

    let category = catalog
        .create_category(&admin, "Chair", None)
        .await
        .unwrap();

    Market {
        store,
        catalog,
        engine,
        seller,
        buyer,
        category,
    }
}

impl<S: Store, G: OrderNumberGenerator> Market<S, G> {
    async fn list(&self, breed: &str, price: i64, stock: i64) -> Product {
        self.list_as(&self.seller, breed, price, stock).await
    }

    async fn list_as(&self, seller: &Identity, breed: &str, price: i64, stock: i64) -> Product {
        self.catalog
            .create_product(
                seller,
                NewProduct {
                    category_id: self.category.id,
                    breed: breed.to_string(),
                    age_weeks: 10,
                    weight_kg: 2.5,
                    price: Money::from_units(price),
                    description: None,
                    images: vec![],
                    stock,
                    is_available: None,
                },
            )
            .await
            .unwrap()
    }

    async fn stock_of(&self, product: &Product) -> u32 {
        self.store
            .get_product(product.id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    async fn category_total(&self) -> u64 {
        self.store
            .get_category(self.category.id)
            .await
            .unwrap()
            .unwrap()
            .stock_total
    }
}

fn cart(lines: &[(&Product, i64)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: lines
            .iter()
            .map(|(product, quantity)| CartItem {
                product_id: product.id,
                quantity: *quantity,
            })
            .collect(),
        delivery_address: None,
    }
}

#[tokio::test]
async fn placement_totals_lines_and_takes_stock() {
    let market = market().await;
    let californien = market.list("Californien", 15000, 2).await;
    let rex = market.list("Rex", 8000, 5).await;

    let view = market
        .engine
        .place_order(&market.buyer, cart(&[(&californien, 2), (&rex, 1)]))
        .await
        .unwrap();

    assert_eq!(view.order.total_amount(), Money::from_units(38000));
    assert_eq!(view.order.status(), OrderStatus::Pending);
    assert_eq!(view.order.payment_status(), PaymentStatus::Pending);
    assert_eq!(view.order.delivery_address().city, "Abidjan");
    assert!(view.order.order_number().as_str().starts_with("CMD-"));
    assert_eq!(view.seller.unwrap().farm_name, "Élevage du Bandama");

    assert_eq!(market.stock_of(&californien).await, 0);
    assert_eq!(market.stock_of(&rex).await, 4);
    assert_eq!(market.category_total().await, 4);
}

#[tokio::test]
async fn explicit_delivery_address_wins() {
    let market = market().await;
    let product = market.list("Papillon", 9000, 3).await;
    let mut request = cart(&[(&product, 1)]);
    request.delivery_address = Some(Address::new("Quartier Commerce", "Yamoussoukro"));

    let view = market
        .engine
        .place_order(&market.buyer, request)
        .await
        .unwrap();
    assert_eq!(view.order.delivery_address().city, "Yamoussoukro");
}

#[tokio::test]
async fn insufficient_stock_persists_nothing() {
    let market = market().await;
    let product = market.list("Géant des Flandres", 25000, 1).await;

    let err = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 2)]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, OrderError::InsufficientStock { ref breed } if breed == "Géant des Flandres")
    );
    assert_eq!(err.to_string(), "Insufficient stock for Géant des Flandres");
    assert_eq!(market.store.order_count().await, 0);
    assert_eq!(market.stock_of(&product).await, 1);
}

#[tokio::test]
async fn withdrawn_product_cannot_be_ordered() {
    let market = market().await;
    let product = market.list("Bélier", 12000, 4).await;
    market
        .catalog
        .update_product(
            &market.seller,
            product.id,
            ProductPatch {
                is_available: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InsufficientStock { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() {
    let market = market().await;
    let product = market.list("Fauve de Bourgogne", 10000, 1).await;

    let first = {
        let engine = market.engine.clone();
        let buyer = market.buyer;
        let request = cart(&[(&product, 1)]);
        tokio::spawn(async move { engine.place_order(&buyer, request).await })
    };
    let second = {
        let engine = market.engine.clone();
        let buyer = market.buyer;
        let request = cart(&[(&product, 1)]);
        tokio::spawn(async move { engine.place_order(&buyer, request).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let placed = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(placed, 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(OrderError::InsufficientStock { .. })))
    );
    assert_eq!(market.stock_of(&product).await, 0);
    assert_eq!(market.category_total().await, 0);
}

#[tokio::test]
async fn empty_cart_and_bad_quantities_are_rejected() {
    let market = market().await;
    let product = market.list("Angora", 20000, 3).await;

    let err = market
        .engine
        .place_order(&market.buyer, cart(&[]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation(ValidationError::EmptyCart)
    ));

    let err = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation(ValidationError::InvalidQuantity { quantity: 0 })
    ));

    assert_eq!(market.store.order_count().await, 0);
    assert_eq!(market.stock_of(&product).await, 3);
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let market = market().await;
    let request = PlaceOrderRequest {
        items: vec![CartItem {
            product_id: domain::ProductId::new(),
            quantity: 1,
        }],
        delivery_address: None,
    };
    let err = market
        .engine
        .place_order(&market.buyer, request)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::NotFound {
            entity: "Product",
            ..
        }
    ));
}

#[tokio::test]
async fn only_clients_with_a_profile_can_order() {
    let market = market().await;
    let product = market.list("Rex", 8000, 3).await;

    let err = market
        .engine
        .place_order(&market.seller, cart(&[(&product, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    let stranger = Identity::new(UserId::new(), Role::Client);
    let err = market
        .engine
        .place_order(&stranger, cart(&[(&product, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::NotFound {
            entity: "BuyerProfile",
            ..
        }
    ));
    assert_eq!(market.stock_of(&product).await, 3);
}

#[tokio::test]
async fn carts_spanning_two_sellers_are_rejected() {
    let market = market().await;
    let admin = Identity::new(UserId::new(), Role::Admin);
    let other_seller = Identity::new(UserId::new(), Role::Eleveur);
    let profiles = ProfileService::new(market.store.clone());
    let profile = profiles
        .register_seller(&other_seller, "Ferme du Nord", "Korhogo", None)
        .await
        .unwrap();
    profiles
        .set_seller_approval(&admin, profile.id, true)
        .await
        .unwrap();

    let ours = market.list("Californien", 15000, 2).await;
    let theirs = market.list_as(&other_seller, "Rex", 8000, 2).await;

    let err = market
        .engine
        .place_order(&market.buyer, cart(&[(&ours, 1), (&theirs, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::Validation(ValidationError::MixedSellers)
    ));
    assert_eq!(market.store.order_count().await, 0);
}

#[tokio::test]
async fn unit_price_is_frozen_at_placement() {
    let market = market().await;
    let product = market.list("Néo-Zélandais", 15000, 5).await;
    let view = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 2)]))
        .await
        .unwrap();

    market
        .catalog
        .update_product(
            &market.seller,
            product.id,
            ProductPatch {
                price: Some(Money::from_units(99000)),
                breed: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reloaded = market
        .engine
        .get_order(&market.buyer, view.order.id())
        .await
        .unwrap();
    let line = &reloaded.order.items()[0];
    assert_eq!(line.unit_price, Money::from_units(15000));
    assert_eq!(line.breed, "Néo-Zélandais");
    assert_eq!(reloaded.order.total_amount(), Money::from_units(30000));
}

#[tokio::test]
async fn repeated_lines_are_checked_against_stock_together() {
    let market = market().await;
    let product = market.list("Rex", 8000, 3).await;

    let err = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 2), (&product, 2)]))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::InsufficientStock { ref breed } if breed == "Rex"));
    assert_eq!(market.store.order_count().await, 0);
    assert_eq!(market.stock_of(&product).await, 3);

    let view = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 2), (&product, 1)]))
        .await
        .unwrap();
    assert_eq!(view.order.items().len(), 2);
    assert_eq!(market.stock_of(&product).await, 0);
}

#[tokio::test]
async fn stock_running_out_mid_placement_is_compensated() {
    let store = SoldOutOnReserve::new();
    let market = market_on(store.clone(), TimestampOrderNumbers).await;
    let first = market.list("Hotot", 11000, 2).await;
    let second = market.list("Californien", 9000, 2).await;
    store.sell_out(&second);

    let err = market
        .engine
        .place_order(&market.buyer, cart(&[(&first, 1), (&second, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InsufficientStock { ref breed } if breed == "Californien"));

    // The first line was reserved, then given back.
    assert_eq!(market.stock_of(&first).await, 2);
    assert_eq!(market.stock_of(&second).await, 2);
    assert_eq!(market.category_total().await, 4);

    let orders = market.engine.list_for_buyer(&market.buyer).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order.status(), OrderStatus::Cancelled);
    assert!(orders[0].order.notes().is_some());
}

#[tokio::test]
async fn colliding_order_number_is_retried() {
    let market = market_with(ScriptedNumbers::new(&["aaaaaaaaa", "aaaaaaaaa", "bbbbbbbbb"])).await;
    let product = market.list("Rex", 8000, 5).await;

    let first = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();
    let second = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();

    assert_eq!(first.order.order_number().as_str(), "CMD-1700000000000-aaaaaaaaa");
    assert_eq!(second.order.order_number().as_str(), "CMD-1700000000000-bbbbbbbbb");
    assert_eq!(market.stock_of(&product).await, 3);
}

#[tokio::test]
async fn persistent_collisions_give_up_without_taking_stock() {
    let market = market_with(ScriptedNumbers::new(&["samesame0"])).await;
    let product = market.list("Rex", 8000, 5).await;

    market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();
    let err = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrderError::OrderNumberExhausted {
            attempts: orders::ORDER_NUMBER_ATTEMPTS
        }
    ));
    assert_eq!(market.store.order_count().await, 1);
    assert_eq!(market.stock_of(&product).await, 4);
}

#[tokio::test]
async fn seller_walks_order_to_delivery() {
    let market = market().await;
    let product = market.list("Californien", 15000, 3).await;
    let placed = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();
    let id = placed.order.id();

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        let view = market
            .engine
            .update_status(&market.seller, id, status)
            .await
            .unwrap();
        assert_eq!(view.order.status(), status);
    }

    let err = market
        .engine
        .update_status(&market.seller, id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition(_)));
    assert_eq!(market.stock_of(&product).await, 2);

    let paid = market
        .engine
        .set_payment_status(&market.seller, id, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.order.payment_status(), PaymentStatus::Paid);
}

#[tokio::test]
async fn skipping_a_lifecycle_step_is_rejected() {
    let market = market().await;
    let product = market.list("Rex", 8000, 3).await;
    let placed = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();

    let err = market
        .engine
        .update_status(&market.seller, placed.order.id(), OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition(_)));
}

#[tokio::test]
async fn buyer_cancellation_restocks() {
    let market = market().await;
    let product = market.list("Chinchilla", 13000, 4).await;
    let placed = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 3)]))
        .await
        .unwrap();
    assert_eq!(market.stock_of(&product).await, 1);

    let cancelled = market
        .engine
        .cancel_order(&market.buyer, placed.order.id(), None)
        .await
        .unwrap();
    assert_eq!(cancelled.order.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.order.notes(), Some("Cancelled by buyer"));
    assert_eq!(market.stock_of(&product).await, 4);
    assert_eq!(market.category_total().await, 4);

    let err = market
        .engine
        .cancel_order(&market.buyer, placed.order.id(), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::NotCancellable {
            status: OrderStatus::Cancelled
        }
    ));
    assert_eq!(market.stock_of(&product).await, 4);
}

#[tokio::test]
async fn buyer_cannot_cancel_confirmed_order() {
    let market = market().await;
    let product = market.list("Rex", 8000, 2).await;
    let placed = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();
    market
        .engine
        .update_status(&market.seller, placed.order.id(), OrderStatus::Confirmed)
        .await
        .unwrap();

    let err = market
        .engine
        .cancel_order(&market.buyer, placed.order.id(), Some("changed my mind".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotCancellable { .. }));

    let manager = Identity::new(UserId::new(), Role::Gestionnaire);
    let view = market
        .engine
        .update_status(&manager, placed.order.id(), OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(view.order.notes(), Some("Cancelled by gestionnaire"));
    assert_eq!(market.stock_of(&product).await, 2);
}

#[tokio::test]
async fn stale_status_write_is_a_conflict() {
    let market = market().await;
    let product = market.list("Rex", 8000, 2).await;
    let placed = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();

    let mut stale = placed.order.clone();
    market
        .engine
        .update_status(&market.seller, placed.order.id(), OrderStatus::Confirmed)
        .await
        .unwrap();

    stale.cancel("late writer").unwrap();
    let written = market
        .store
        .update_order_status(&stale, OrderStatus::Pending)
        .await
        .unwrap();
    assert!(!written);

    let current = market
        .store
        .get_order(placed.order.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status(), OrderStatus::Confirmed);
}

#[tokio::test]
async fn order_visibility_follows_ownership() {
    let market = market().await;
    let product = market.list("Rex", 8000, 2).await;
    let placed = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();
    let id = placed.order.id();

    market.engine.get_order(&market.seller, id).await.unwrap();
    let admin = Identity::new(UserId::new(), Role::Admin);
    market.engine.get_order(&admin, id).await.unwrap();

    let other_client = Identity::new(UserId::new(), Role::Client);
    let err = market.engine.get_order(&other_client, id).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    let other_seller = Identity::new(UserId::new(), Role::Eleveur);
    let err = market
        .engine
        .update_status(&other_seller, id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
}

#[tokio::test]
async fn listings_are_scoped_to_each_side() {
    let market = market().await;
    let product = market.list("Rex", 8000, 5).await;
    for _ in 0..2 {
        market
            .engine
            .place_order(&market.buyer, cart(&[(&product, 1)]))
            .await
            .unwrap();
    }

    let bought = market.engine.list_for_buyer(&market.buyer).await.unwrap();
    assert_eq!(bought.len(), 2);
    assert!(bought.iter().all(|v| v.seller.is_some() && v.buyer.is_none()));

    let sold = market.engine.list_for_seller(&market.seller).await.unwrap();
    assert_eq!(sold.len(), 2);
    assert!(
        sold.iter()
            .all(|v| v.buyer.as_ref().is_some_and(|b| b.city == "Abidjan"))
    );

    let err = market
        .engine
        .list_for_seller(&market.buyer)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
}

#[tokio::test]
async fn pending_is_not_a_payment_outcome() {
    let market = market().await;
    let product = market.list("Rex", 8000, 2).await;
    let placed = market
        .engine
        .place_order(&market.buyer, cart(&[(&product, 1)]))
        .await
        .unwrap();

    let err = market
        .engine
        .set_payment_status(&market.seller, placed.order.id(), PaymentStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
}
