//! Catalog service tests against the in-memory store.

use catalog::{CatalogError, CatalogService, ProfileService};
use domain::{Category, Identity, Money, NewProduct, ProductPatch, Role, UserId};
use store::{CategoryStore, InMemoryStore, ProductQuery, ProductStore, StoreError};

struct World {
    store: InMemoryStore,
    catalog: CatalogService<InMemoryStore>,
    seller: Identity,
    category: Category,
}

async fn world() -> World {
    let store = InMemoryStore::new();
    let catalog = CatalogService::new(store.clone());
    let profiles = ProfileService::new(store.clone());

    let seller = Identity::new(UserId::new(), Role::Eleveur);
    let profile = profiles
        .register_seller(&seller, "Ferme de la Comoé", "Abengourou", None)
        .await
        .unwrap();
    let admin = Identity::new(UserId::new(), Role::Admin);
    profiles
        .set_seller_approval(&admin, profile.id, true)
        .await
        .unwrap();

    let category = catalog
        .create_category(&admin, "Chair", Some("Lapins de chair".to_string()))
        .await
        .unwrap();

    World {
        store,
        catalog,
        seller,
        category,
    }
}

fn new_product(world: &World, stock: i64) -> NewProduct {
    NewProduct {
        category_id: world.category.id,
        breed: "Néo-Zélandais blanc".to_string(),
        age_weeks: 12,
        weight_kg: 2.8,
        price: Money::from_units(15000),
        description: None,
        images: vec![],
        stock,
        is_available: None,
    }
}

async fn stock_total(world: &World) -> u64 {
    world
        .store
        .get_category(world.category.id)
        .await
        .unwrap()
        .unwrap()
        .stock_total
}

#[tokio::test]
async fn create_product_recomputes_category() {
    let world = world().await;
    world
        .catalog
        .create_product(&world.seller, new_product(&world, 3))
        .await
        .unwrap();
    world
        .catalog
        .create_product(&world.seller, new_product(&world, 4))
        .await
        .unwrap();

    assert_eq!(stock_total(&world).await, 7);
}

#[tokio::test]
async fn unapproved_seller_cannot_list() {
    let world = world().await;
    let profiles = ProfileService::new(world.store.clone());
    let newcomer = Identity::new(UserId::new(), Role::Eleveur);
    profiles
        .register_seller(&newcomer, "Ferme Nouvelle", "Daloa", None)
        .await
        .unwrap();

    let err = world
        .catalog
        .create_product(&newcomer, new_product(&world, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
}

#[tokio::test]
async fn seller_without_profile_is_not_found() {
    let world = world().await;
    let stranger = Identity::new(UserId::new(), Role::Eleveur);
    let err = world
        .catalog
        .create_product(&stranger, new_product(&world, 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::NotFound {
            entity: "SellerProfile",
            ..
        }
    ));
}

#[tokio::test]
async fn client_cannot_create_products() {
    let world = world().await;
    let client = Identity::new(UserId::new(), Role::Client);
    let err = world
        .catalog
        .create_product(&client, new_product(&world, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
}

#[tokio::test]
async fn invalid_fields_are_rejected() {
    let world = world().await;
    let mut input = new_product(&world, 1);
    input.weight_kg = 80.0;
    let err = world
        .catalog
        .create_product(&world.seller, input)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let world = world().await;
    let mut input = new_product(&world, 1);
    input.category_id = domain::CategoryId::new();
    let err = world
        .catalog
        .create_product(&world.seller, input)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::NotFound {
            entity: "Category",
            ..
        }
    ));
}

#[tokio::test]
async fn withdrawing_a_product_lowers_category_total() {
    let world = world().await;
    let product = world
        .catalog
        .create_product(&world.seller, new_product(&world, 5))
        .await
        .unwrap();
    assert_eq!(stock_total(&world).await, 5);

    world
        .catalog
        .update_product(
            &world.seller,
            product.id,
            ProductPatch {
                is_available: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(stock_total(&world).await, 0);
    let listed = world
        .catalog
        .list_products(&ProductQuery::new())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn moving_a_product_touches_both_categories() {
    let world = world().await;
    let admin = Identity::new(UserId::new(), Role::Gestionnaire);
    let other = world
        .catalog
        .create_category(&admin, "Reproducteurs", None)
        .await
        .unwrap();
    let product = world
        .catalog
        .create_product(&world.seller, new_product(&world, 6))
        .await
        .unwrap();

    world
        .catalog
        .update_product(
            &world.seller,
            product.id,
            ProductPatch {
                category_id: Some(other.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(stock_total(&world).await, 0);
    let moved = world.store.get_category(other.id).await.unwrap().unwrap();
    assert_eq!(moved.stock_total, 6);
}

#[tokio::test]
async fn only_owner_or_back_office_can_modify() {
    let world = world().await;
    let product = world
        .catalog
        .create_product(&world.seller, new_product(&world, 2))
        .await
        .unwrap();

    let intruder = Identity::new(UserId::new(), Role::Eleveur);
    let err = world
        .catalog
        .delete_product(&intruder, product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));

    let manager = Identity::new(UserId::new(), Role::Gestionnaire);
    world
        .catalog
        .delete_product(&manager, product.id)
        .await
        .unwrap();
    assert_eq!(stock_total(&world).await, 0);
    assert!(world.store.get_product(product.id).await.unwrap().is_none());
}

#[tokio::test]
async fn stale_update_is_a_conflict() {
    let world = world().await;
    let product = world
        .catalog
        .create_product(&world.seller, new_product(&world, 2))
        .await
        .unwrap();

    // Another writer moves the version on between read and write.
    world
        .store
        .decrement_stock_if_available(product.id, 1)
        .await
        .unwrap();
    let stale = product
        .patched(ProductPatch {
            price: Some(Money::from_units(1)),
            ..Default::default()
        })
        .unwrap();
    let result = world.store.update_product(&stale, product.version).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { .. })
    ));

    // The service re-reads, so its own update goes through.
    let updated = world
        .catalog
        .update_product(
            &world.seller,
            product.id,
            ProductPatch {
                price: Some(Money::from_units(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.stock, 1);
}

#[tokio::test]
async fn duplicate_category_is_rejected() {
    let world = world().await;
    let admin = Identity::new(UserId::new(), Role::Admin);
    let err = world
        .catalog
        .create_category(&admin, "Chair", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::AlreadyExists(_)));

    let err = world
        .catalog
        .create_category(&world.seller, "Angora", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
}

#[tokio::test]
async fn listing_by_missing_category_is_not_found() {
    let world = world().await;
    let err = world
        .catalog
        .list_products_by_category(domain::CategoryId::new(), ProductQuery::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));
}

#[tokio::test]
async fn my_products_include_unlisted() {
    let world = world().await;
    world
        .catalog
        .create_product(&world.seller, new_product(&world, 0))
        .await
        .unwrap();
    world
        .catalog
        .create_product(&world.seller, new_product(&world, 2))
        .await
        .unwrap();

    let mine = world.catalog.list_my_products(&world.seller).await.unwrap();
    assert_eq!(mine.len(), 2);

    let public = world
        .catalog
        .list_products(&ProductQuery::new())
        .await
        .unwrap();
    assert_eq!(public.total, 1);
    assert_eq!(public.stock_sum, 2);
}

#[tokio::test]
async fn details_resolve_seller_and_category() {
    let world = world().await;
    let product = world
        .catalog
        .create_product(&world.seller, new_product(&world, 1))
        .await
        .unwrap();

    let details = world.catalog.get_product(product.id).await.unwrap();
    assert_eq!(details.seller.unwrap().farm_name, "Ferme de la Comoé");
    assert_eq!(details.category.unwrap().name, "Chair");
}

#[tokio::test]
async fn stats_and_recompute() {
    let world = world().await;
    world
        .catalog
        .create_product(&world.seller, new_product(&world, 3))
        .await
        .unwrap();

    let stats = world.catalog.category_stats().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].product_count, 1);
    assert_eq!(stats[0].stock_total, 3);

    let admin = Identity::new(UserId::new(), Role::Admin);
    let first = world
        .catalog
        .recompute_category(&admin, world.category.id)
        .await
        .unwrap();
    let second = world
        .catalog
        .recompute_category(&admin, world.category.id)
        .await
        .unwrap();
    assert_eq!(first, 3);
    assert_eq!(first, second);

    let err = world
        .catalog
        .recompute_category(&world.seller, world.category.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
}
