//! Catalog and order log round trips through the local store.

mod common;

use coffee_inventory::error::AppError;
use coffee_inventory::inventory;
use coffee_inventory::models::NewCoffee;
use coffee_inventory::store::LocalStore;
use tempfile::TempDir;

use common::coffee;

fn store(dir: &TempDir) -> LocalStore {
    LocalStore::new(
        dir.path().join("inventory.json"),
        dir.path().join("orders.json"),
    )
}

#[tokio::test]
async fn test_order_persists_stock_and_log() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let mut catalog = store.load_inventory().await.unwrap();
    catalog.coffees.push(coffee("c1", "Yirgacheffe", 10, 18.5));
    store.save_inventory(&catalog).await.unwrap();

    let mut catalog = store.load_inventory().await.unwrap();
    let mut orders = store.load_orders().await.unwrap();
    let order = inventory::record_order(&mut catalog, &mut orders, "c1", 4).unwrap();
    store.save_inventory(&catalog).await.unwrap();
    store.save_orders(&orders).await.unwrap();

    let catalog = store.load_inventory().await.unwrap();
    let orders = store.load_orders().await.unwrap();
    assert_eq!(catalog.coffees[0].stock_quantity, 6);
    assert!(catalog.coffees[0].is_available);
    assert_eq!(orders.orders.len(), 1);
    assert_eq!(orders.orders[0].id, order.id);
    assert_eq!(orders.orders[0].total_price, 74.0);
}

#[tokio::test]
async fn test_rejected_order_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let mut catalog = store.load_inventory().await.unwrap();
    catalog.coffees.push(coffee("c1", "Yirgacheffe", 10, 18.5));
    let mut orders = store.load_orders().await.unwrap();
    let before = (catalog.clone(), orders.clone());

    let err = inventory::record_order(&mut catalog, &mut orders, "c1", 11).unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientStock {
            available: 10,
            requested: 11
        }
    ));
    assert_eq!(catalog, before.0);
    assert_eq!(orders, before.1);
}

#[tokio::test]
async fn test_added_coffee_is_found_by_list_number() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let mut catalog = store.load_inventory().await.unwrap();

    for name in ["Sumatra", "Antigua"] {
        inventory::add_coffee(
            &mut catalog,
            NewCoffee {
                name: name.to_string(),
                origin: "Somewhere".to_string(),
                roast_level: "Dark".to_string(),
                price_per_bag: 14.0,
                stock_quantity: 3,
                ..Default::default()
            },
        )
        .unwrap();
    }
    store.save_inventory(&catalog).await.unwrap();

    let catalog = store.load_inventory().await.unwrap();
    assert_eq!(inventory::find_coffee(&catalog, "1").unwrap().name, "Antigua");
    assert_eq!(inventory::find_coffee(&catalog, "2").unwrap().name, "Sumatra");
    assert!(matches!(
        inventory::find_coffee(&catalog, "3"),
        Err(AppError::NotFound(_))
    ));
}
