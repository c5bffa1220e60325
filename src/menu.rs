//! Interactive menu mode

use anyhow::Result;
use console::{style, Term};
use dialoguer::{Input, Select};

use coffee_inventory::models::{parse_flavor_notes, NewCoffee};

use crate::cli::{App, CROSS, INFO};

const OPTIONS: &[&str] = &[
    "Add New Coffee",
    "Update Stock Quantity",
    "List All Coffees",
    "Record Order/Sale",
    "Toggle Coffee Availability",
    "View Sales Report",
    "Sync to API",
    "Pull from API",
    "Switch to Auto-Sync Mode",
    "Exit",
];

enum Next {
    Continue,
    Auto,
    Exit,
}

/// Run the menu until the user exits or switches to auto mode.
pub async fn run(app: &App) -> Result<()> {
    println!("{}", style("Coffee Inventory Manager").bold());
    println!(
        "  Inventory file: {}",
        style(app.store.inventory_path().display()).cyan()
    );
    println!(
        "  Orders file: {}",
        style(app.store.orders_path().display()).cyan()
    );

    loop {
        println!();
        let choice = Select::new()
            .with_prompt("Main Menu")
            .items(OPTIONS)
            .default(0)
            .interact()?;

        match dispatch(app, choice).await {
            Ok(Next::Continue) => {}
            Ok(Next::Auto) => {
                println!();
                println!("{} Starting auto-sync mode...", INFO);
                return app.auto().await;
            }
            Ok(Next::Exit) => {
                println!("Goodbye!");
                return Ok(());
            }
            Err(e) => println!("{} Error: {:#}", CROSS, e),
        }

        println!();
        println!("{}", style("Press any key to continue...").dim());
        let term = Term::stdout();
        let _ = term.read_key();
        let _ = term.clear_screen();
    }
}

async fn dispatch(app: &App, choice: usize) -> Result<Next> {
    match choice {
        0 => app.add(prompt_new_coffee()?).await?,
        1 => {
            app.list().await?;
            let key = prompt_key()?;
            let stock: u32 = Input::new()
                .with_prompt("New stock quantity (bags)")
                .interact_text()?;
            app.update_stock(&key, stock).await?;
        }
        2 => app.list().await?,
        3 => {
            app.list().await?;
            let key = prompt_key()?;
            let quantity: u32 = Input::new()
                .with_prompt("Quantity (bags)")
                .interact_text()?;
            app.order(&key, quantity).await?;
        }
        4 => {
            app.list().await?;
            let key = prompt_key()?;
            app.toggle(&key).await?;
        }
        5 => {
            let days: u32 = Input::new()
                .with_prompt("Number of days")
                .default(30)
                .interact_text()?;
            app.report(days).await?;
        }
        6 => app.sync().await?,
        7 => app.pull().await?,
        8 => return Ok(Next::Auto),
        _ => return Ok(Next::Exit),
    }
    Ok(Next::Continue)
}

fn prompt_key() -> Result<String> {
    Ok(Input::<String>::new()
        .with_prompt("Coffee number or ID")
        .interact_text()?)
}

fn prompt_new_coffee() -> Result<NewCoffee> {
    println!();
    println!("{}", style("=== Add New Coffee ===").bold());

    let name: String = Input::new().with_prompt("Coffee name").interact_text()?;
    let origin: String = Input::new().with_prompt("Origin").interact_text()?;
    let roast_level: String = Input::new()
        .with_prompt("Roast level (Light/Medium/Dark)")
        .interact_text()?;
    let price_per_bag: f64 = Input::new()
        .with_prompt("Price per bag ($)")
        .interact_text()?;
    let stock_quantity: u32 = Input::new()
        .with_prompt("Initial stock (bags)")
        .interact_text()?;
    let description: String = Input::new()
        .with_prompt("Description (optional)")
        .allow_empty(true)
        .interact_text()?;
    let image_url: String = Input::new()
        .with_prompt("Image URL (optional)")
        .allow_empty(true)
        .interact_text()?;
    let flavors: String = Input::new()
        .with_prompt("Flavor notes (comma-separated, optional)")
        .allow_empty(true)
        .interact_text()?;

    Ok(NewCoffee {
        name,
        origin,
        roast_level,
        description,
        price_per_bag,
        stock_quantity,
        flavor_notes: parse_flavor_notes(&flavors),
        image_url: Some(image_url).filter(|url| !url.trim().is_empty()),
    })
}
