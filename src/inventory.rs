// =============================================================================
// INVENTORY OPERATIONS
// =============================================================================
// In-memory operations on the catalog and order log. Callers load the
// documents through `LocalStore`, run one of these, and save the result.
//
// NOTES:
// - Stock-changing paths recompute `is_available`; the toggle does not
// - Order recording validates everything before touching anything, so a
//   rejected order leaves both documents exactly as they were
// =============================================================================

use chrono::Utc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{Coffee, InventoryData, NewCoffee, Order, OrderData};
use crate::store::generate_id;

// -----------------------------------------------------------------------------
// LOOKUP
// -----------------------------------------------------------------------------

/// Coffees in display order (alphabetical by name).
pub fn sorted_by_name(inventory: &InventoryData) -> Vec<&Coffee> {
    let mut coffees: Vec<&Coffee> = inventory.coffees.iter().collect();
    coffees.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    coffees
}

/// Resolve `key` to a position in `inventory.coffees`.
///
/// `key` is either a coffee id or a 1-based number into the alphabetical
/// listing shown by `sorted_by_name`. Ids win over numbers.
pub fn position(inventory: &InventoryData, key: &str) -> AppResult<usize> {
    let key = key.trim();
    if let Some(pos) = inventory.coffees.iter().position(|c| c.id == key) {
        return Ok(pos);
    }

    if let Ok(number) = key.parse::<usize>() {
        if let Some(coffee) = number
            .checked_sub(1)
            .and_then(|i| sorted_by_name(inventory).get(i).copied())
        {
            let id = coffee.id.clone();
            if let Some(pos) = inventory.coffees.iter().position(|c| c.id == id) {
                return Ok(pos);
            }
        }
    }

    Err(AppError::NotFound(format!("Coffee with ID '{}' not found", key)))
}

pub fn find_coffee<'a>(inventory: &'a InventoryData, key: &str) -> AppResult<&'a Coffee> {
    let pos = position(inventory, key)?;
    Ok(&inventory.coffees[pos])
}

// -----------------------------------------------------------------------------
// ADD
// -----------------------------------------------------------------------------

/// Append a new coffee with a fresh id and return a copy of it.
pub fn add_coffee(inventory: &mut InventoryData, new: NewCoffee) -> AppResult<Coffee> {
    for (field, value) in [
        ("name", &new.name),
        ("origin", &new.origin),
        ("roast", &new.roast_level),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::InvalidInput(format!("{} is required", field)));
        }
    }
    if !new.price_per_bag.is_finite() || new.price_per_bag < 0.0 {
        return Err(AppError::InvalidInput(format!(
            "price must be a non-negative number, got {}",
            new.price_per_bag
        )));
    }

    let now = Utc::now();
    let coffee = Coffee {
        id: generate_id(),
        name: new.name.trim().to_string(),
        origin: new.origin.trim().to_string(),
        roast_level: new.roast_level.trim().to_string(),
        description: new.description,
        price_per_bag: new.price_per_bag,
        stock_quantity: new.stock_quantity,
        flavor_notes: new.flavor_notes,
        image_url: new.image_url.unwrap_or_default(),
        is_available: new.stock_quantity > 0,
        roasted_date: now,
        created_at: now,
        updated_at: now,
    };

    info!(id = %coffee.id, name = %coffee.name, stock = coffee.stock_quantity, "Coffee added");
    inventory.coffees.push(coffee.clone());
    Ok(coffee)
}

// -----------------------------------------------------------------------------
// STOCK & AVAILABILITY
// -----------------------------------------------------------------------------

/// Set the stock level; returns the previous level.
pub fn update_stock(inventory: &mut InventoryData, key: &str, quantity: u32) -> AppResult<u32> {
    let pos = position(inventory, key)?;
    let coffee = &mut inventory.coffees[pos];
    let old = coffee.stock_quantity;
    coffee.set_stock(quantity, Utc::now());

    info!(id = %coffee.id, old_stock = old, new_stock = quantity, "Stock updated");
    Ok(old)
}

/// Flip `is_available` without looking at stock; returns the new value.
pub fn toggle_availability(inventory: &mut InventoryData, key: &str) -> AppResult<bool> {
    let pos = position(inventory, key)?;
    let coffee = &mut inventory.coffees[pos];
    coffee.is_available = !coffee.is_available;
    coffee.updated_at = Utc::now();

    info!(id = %coffee.id, available = coffee.is_available, "Availability toggled");
    Ok(coffee.is_available)
}

// -----------------------------------------------------------------------------
// ORDERS
// -----------------------------------------------------------------------------

/// Record a sale: append an order and take the bags out of stock.
pub fn record_order(
    inventory: &mut InventoryData,
    orders: &mut OrderData,
    key: &str,
    quantity: u32,
) -> AppResult<Order> {
    if quantity == 0 {
        return Err(AppError::InvalidInput(
            "quantity must be greater than zero".to_string(),
        ));
    }

    let pos = position(inventory, key)?;
    let coffee = &mut inventory.coffees[pos];
    if coffee.stock_quantity < quantity {
        return Err(AppError::InsufficientStock {
            available: coffee.stock_quantity,
            requested: quantity,
        });
    }

    let mut id = generate_id();
    while orders.orders.iter().any(|o| o.id == id) {
        id = generate_id();
    }

    let now = Utc::now();
    let order = Order {
        id,
        coffee_id: coffee.id.clone(),
        coffee_name: coffee.name.clone(),
        quantity_bags: quantity,
        price_per_bag: coffee.price_per_bag,
        total_price: f64::from(quantity) * coffee.price_per_bag,
        order_date: now,
    };

    coffee.set_stock(coffee.stock_quantity - quantity, now);
    orders.orders.push(order.clone());

    info!(
        order_id = %order.id,
        coffee_id = %order.coffee_id,
        quantity = quantity,
        total = order.total_price,
        remaining = coffee.stock_quantity,
        "Order recorded"
    );
    Ok(order)
}
