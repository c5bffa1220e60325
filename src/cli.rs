//! CLI command definitions and handlers

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use console::{style, Emoji};
use dialoguer::Confirm;

use coffee_inventory::clock::SystemClock;
use coffee_inventory::config::Config;
use coffee_inventory::inventory;
use coffee_inventory::metrics;
use coffee_inventory::models::{parse_flavor_notes, InventoryData, NewCoffee};
use coffee_inventory::remote::build_http_client;
use coffee_inventory::report::SalesReport;
use coffee_inventory::store::LocalStore;
use coffee_inventory::sync::{ItemOutcome, PullOutcome, SyncEngine, SyncReport};
use coffee_inventory::watcher::{ChangeWatcher, SyncRun};

pub static CHECK: Emoji = Emoji("✓ ", "* ");
pub static CROSS: Emoji = Emoji("✗ ", "x ");
pub static ARROW: Emoji = Emoji("→ ", "-> ");
pub static INFO: Emoji = Emoji("ℹ ", "i ");
pub static WARN: Emoji = Emoji("⚠ ", "! ");

// -----------------------------------------------------------------------------
// OUTPUT LINES
// -----------------------------------------------------------------------------

/// One line per pulled coffee, alphabetical like `list`.
fn pulled_lines(inventory: &InventoryData) -> Vec<String> {
    inventory::sorted_by_name(inventory)
        .into_iter()
        .map(|coffee| {
            format!(
                "{} - {} bags @ ${:.2}/bag",
                coffee.name, coffee.stock_quantity, coffee.price_per_bag
            )
        })
        .collect()
}

/// Console line for a finished watcher sync. Auto mode shows these even
/// when the log filter hides the watcher's own events.
fn sync_status_line(run: SyncRun, at: &str) -> String {
    match run {
        SyncRun::Succeeded => format!("[{}] {}Sync completed successfully", at, CHECK),
        SyncRun::CompletedWithErrors => format!("[{}] {}Sync completed with errors", at, WARN),
        SyncRun::Failed => format!("[{}] {}Sync failed", at, CROSS),
        SyncRun::Skipped => format!("[{}] {}Sync skipped, another sync was running", at, WARN),
    }
}

#[derive(Parser)]
#[command(name = "coffee-inventory")]
#[command(author, version, about = "Coffee catalog and sales manager with API sync")]
pub struct Cli {
    /// Command to run (interactive menu when omitted)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the catalog file
    #[arg(long, global = true, value_name = "PATH")]
    pub inventory_path: Option<PathBuf>,

    /// Path to the order log file
    #[arg(long, global = true, value_name = "PATH")]
    pub orders_path: Option<PathBuf>,

    /// Answer "yes" to every prompt
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the catalog file and push it to the API on every change
    Auto,

    /// Add a new coffee
    Add(AddArgs),

    /// Set the stock level of a coffee
    Update {
        /// Coffee id or list number
        id: String,

        /// New stock quantity in bags
        #[arg(short, long)]
        stock: u32,
    },

    /// Toggle a coffee's availability on/off
    Toggle {
        /// Coffee id or list number
        id: String,
    },

    /// List all coffees
    List,

    /// Record a sale
    Order {
        /// Coffee id or list number
        id: String,

        /// Bags sold
        #[arg(short, long)]
        quantity: u32,
    },

    /// Show the sales report
    Report {
        /// Look back this many days
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },

    /// Push the local catalog to the API
    Sync,

    /// Replace the local catalog with the API's
    Pull,

    /// Interactive menu
    Menu,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub origin: String,

    /// Roast level (Light/Medium/Dark)
    #[arg(long)]
    pub roast: String,

    /// Price per bag
    #[arg(long)]
    pub price: f64,

    /// Initial stock in bags
    #[arg(long)]
    pub stock: u32,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub image: Option<String>,

    /// Comma-separated flavor notes
    #[arg(long, default_value = "")]
    pub flavors: String,
}

impl AddArgs {
    pub fn into_new_coffee(self) -> NewCoffee {
        NewCoffee {
            name: self.name,
            origin: self.origin,
            roast_level: self.roast,
            description: self.description,
            price_per_bag: self.price,
            stock_quantity: self.stock,
            flavor_notes: parse_flavor_notes(&self.flavors),
            image_url: self.image,
        }
    }
}

// =============================================================================
// APP
// =============================================================================
/// Everything a command handler needs. Shared by one-shot commands and the
/// interactive menu.
pub struct App {
    pub config: Config,
    pub store: LocalStore,
    pub engine: Arc<SyncEngine>,
    assume_yes: bool,
}

impl App {
    pub fn new(config: Config, assume_yes: bool) -> Result<Self> {
        let http = build_http_client(config.http_timeout).context("Failed to build HTTP client")?;
        let store = LocalStore::new(&config.inventory_path, &config.orders_path);
        Ok(Self {
            config,
            store,
            engine: Arc::new(SyncEngine::new(http)),
            assume_yes,
        })
    }

    /// Ask a yes/no question; `--yes` answers it.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    async fn load_inventory(&self) -> Result<InventoryData> {
        self.store.load_inventory().await.with_context(|| {
            format!(
                "Failed to load catalog from {}",
                self.store.inventory_path().display()
            )
        })
    }

    async fn save_inventory(&self, inventory: &InventoryData) -> Result<()> {
        self.store.save_inventory(inventory).await.with_context(|| {
            format!(
                "Failed to save catalog to {}",
                self.store.inventory_path().display()
            )
        })
    }

    /// After a mutation: offer to push the catalog.
    async fn offer_push(&self, inventory: &InventoryData, prompt: &str) -> Result<()> {
        if !inventory.is_sync_configured() {
            return Ok(());
        }
        println!();
        if self.confirm(prompt, true)? {
            self.push(inventory).await?;
        }
        Ok(())
    }

    async fn push(&self, inventory: &InventoryData) -> Result<SyncReport> {
        println!(
            "{} Syncing {} coffees to {}...",
            ARROW,
            inventory.coffees.len(),
            style(&inventory.api_url).cyan()
        );
        let report = self.engine.push_all(inventory).await?;
        print_sync_report(&report);
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // COMMANDS
    // -------------------------------------------------------------------------

    pub async fn add(&self, new: NewCoffee) -> Result<()> {
        let mut inventory = self.load_inventory().await?;
        let coffee = inventory::add_coffee(&mut inventory, new)?;
        self.save_inventory(&inventory).await?;

        println!("{} Coffee added successfully!", CHECK);
        println!("  ID: {}", style(&coffee.id).cyan());
        println!("  Name: {}", coffee.name);
        println!("  Price: ${:.2}/bag", coffee.price_per_bag);
        println!("  Stock: {} bags", coffee.stock_quantity);

        self.offer_push(&inventory, "Sync to API now?").await
    }

    pub async fn update_stock(&self, key: &str, stock: u32) -> Result<()> {
        let mut inventory = self.load_inventory().await?;
        let old = inventory::update_stock(&mut inventory, key, stock)?;
        self.save_inventory(&inventory).await?;

        let coffee = inventory::find_coffee(&inventory, key)?;
        println!("{} Stock updated for '{}'", CHECK, style(&coffee.name).green());
        println!("  Old stock: {} bags", old);
        println!("  New stock: {} bags", stock);
        if stock == 0 {
            println!("  {} Marked unavailable (out of stock)", INFO);
        }

        self.offer_push(&inventory, "Sync to API now?").await
    }

    pub async fn toggle(&self, key: &str) -> Result<()> {
        let mut inventory = self.load_inventory().await?;
        let available = inventory::toggle_availability(&mut inventory, key)?;
        self.save_inventory(&inventory).await?;

        let coffee = inventory::find_coffee(&inventory, key)?;
        let status = if available {
            style("available").green()
        } else {
            style("unavailable").red()
        };
        println!("{} '{}' is now {}", CHECK, coffee.name, status);

        self.offer_push(&inventory, "Sync to API now?").await
    }

    pub async fn list(&self) -> Result<()> {
        let inventory = self.load_inventory().await?;
        print_catalog(&inventory);
        Ok(())
    }

    pub async fn order(&self, key: &str, quantity: u32) -> Result<()> {
        let mut inventory = self.load_inventory().await?;
        let mut orders = self
            .store
            .load_orders()
            .await
            .context("Failed to load order log")?;

        let order = inventory::record_order(&mut inventory, &mut orders, key, quantity)?;
        self.save_inventory(&inventory).await?;
        self.store
            .save_orders(&orders)
            .await
            .context("Failed to save order log")?;

        let coffee = inventory::find_coffee(&inventory, &order.coffee_id)?;
        println!("{} Order recorded successfully!", CHECK);
        println!("  Order ID: {}", style(&order.id).cyan());
        println!("  Coffee: {}", order.coffee_name);
        println!("  Quantity: {} bags", order.quantity_bags);
        println!("  Total: ${:.2}", order.total_price);
        println!("  Remaining stock: {} bags", coffee.stock_quantity);

        self.offer_push(&inventory, "Sync inventory to API now?").await
    }

    pub async fn report(&self, days: u32) -> Result<()> {
        let orders = self
            .store
            .load_orders()
            .await
            .context("Failed to load order log")?;
        let report = SalesReport::build(&orders, days, Utc::now());
        print_report(&report);
        Ok(())
    }

    /// Push with an advisory connection test first.
    pub async fn sync(&self) -> Result<()> {
        let inventory = self.load_inventory().await?;
        let client = self.engine.client_for(&inventory)?;

        println!("{} Testing API connection...", INFO);
        if !client.test_connection().await {
            println!(
                "{} Could not connect to API at {}",
                WARN,
                style(client.base_url()).yellow()
            );
            if !self.confirm("Continue anyway?", false)? {
                println!("{} Sync cancelled", INFO);
                return Ok(());
            }
        }

        self.push(&inventory).await?;
        Ok(())
    }

    /// Pull, refusing when the API is unreachable.
    pub async fn pull(&self) -> Result<()> {
        let mut inventory = self.load_inventory().await?;
        let client = self.engine.client_for(&inventory)?;

        println!("{} Testing API connection...", INFO);
        if !client.test_connection().await {
            println!(
                "{} Could not connect to API at {}",
                CROSS,
                style(client.base_url()).red()
            );
            return Ok(());
        }

        if !inventory.coffees.is_empty() {
            println!();
            println!(
                "{} This will replace your {} local coffees with data from the API!",
                WARN,
                style(inventory.coffees.len()).yellow().bold()
            );
            if !self.confirm("Continue?", false)? {
                println!("{} Pull cancelled", INFO);
                return Ok(());
            }
        }

        println!("{} Pulling inventory from {}...", ARROW, style(client.base_url()).cyan());
        match self
            .engine
            .pull_all(&mut inventory, self.store.inventory_path())
            .await?
        {
            PullOutcome::NothingToPull => {
                println!("{} No coffees found on API server", INFO);
            }
            PullOutcome::Replaced(count) => {
                println!("{} Successfully pulled {} coffees from API", CHECK, count);
                println!();
                println!("{}", style("Pulled coffees:").bold());
                for line in pulled_lines(&inventory) {
                    println!("  {} {}", ARROW, line);
                }
            }
        }
        Ok(())
    }

    /// Watch the catalog until Ctrl+C.
    pub async fn auto(&self) -> Result<()> {
        let inventory = self.load_inventory().await?;
        let path = self.store.inventory_path();

        println!("{}", style("Coffee Inventory - Auto Mode").bold());
        println!();
        println!("  Watching: {}", style(path.display()).cyan());
        println!("  Loaded {} coffees", inventory.coffees.len());
        println!("  API URL: {}", style(&inventory.api_url).cyan());

        match self.engine.client_for(&inventory) {
            Ok(client) => {
                if client.test_connection().await {
                    println!("  {} Connected", CHECK);
                } else {
                    println!(
                        "  {} API connection failed. Will retry on each sync.",
                        WARN
                    );
                }
            }
            Err(e) => println!("  {} {}", WARN, e),
        }

        if let Some(port) = self.config.metrics_port {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            metrics::setup_metrics(Some(addr)).context("Failed to start metrics listener")?;
            println!("  Metrics: {}", style(format!("http://{}/metrics", addr)).dim());
        }
        metrics::set_catalog_size(inventory.coffees.len());

        println!();
        println!("{} Monitoring for changes. Press Ctrl+C to exit.", INFO);
        println!();

        let watcher = ChangeWatcher::with_timing(
            path,
            Arc::clone(&self.engine),
            self.config.sync_cooldown,
            self.config.sync_settle,
            Arc::new(SystemClock),
        )
        .on_sync_complete(|run| {
            let at = Local::now().format("%H:%M:%S").to_string();
            println!("{}", sync_status_line(run, &at));
        });
        let summary = watcher
            .run(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;

        println!();
        println!(
            "{} Auto-sync mode stopped at {} ({} syncs, {} failed, {} changes skipped)",
            INFO,
            Local::now().format("%H:%M:%S"),
            summary.syncs(),
            summary.failed,
            summary.dropped + summary.skipped
        );
        Ok(())
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

pub fn print_catalog(inventory: &InventoryData) {
    if inventory.coffees.is_empty() {
        println!("{} No coffees in inventory.", INFO);
        return;
    }

    println!();
    println!(
        "{}",
        style(format!("Inventory ({} coffees):", inventory.coffees.len())).bold()
    );
    println!("{}", "=".repeat(80));

    for (number, coffee) in inventory::sorted_by_name(inventory).iter().enumerate() {
        let marker = if coffee.is_available {
            style("●").green()
        } else {
            style("○").red()
        };
        println!(
            "{:>3}. {} {} {}",
            number + 1,
            marker,
            style(&coffee.name).bold(),
            style(format!("[{}]", coffee.id)).dim()
        );
        println!(
            "     Origin: {} | Roast: {}",
            coffee.origin, coffee.roast_level
        );
        println!(
            "     Price: ${:.2}/bag | Stock: {} bags",
            coffee.price_per_bag, coffee.stock_quantity
        );
        if !coffee.flavor_notes.is_empty() {
            println!("     Flavors: {}", coffee.flavor_notes.join(", "));
        }
        println!();
    }
}

pub fn print_report(report: &SalesReport) {
    println!();
    println!(
        "{}",
        style(format!("Sales Report (Last {} days)", report.days)).bold()
    );
    println!("{}", "=".repeat(80));

    if report.is_empty() {
        println!("{} No orders in this period.", INFO);
        return;
    }

    println!("Total Orders: {}", report.total_orders);
    println!("Total Revenue: ${:.2}", report.total_revenue);
    println!("Total Bags Sold: {}", report.total_bags);
    println!("Average Order Value: ${:.2}", report.average_order_value());
    println!();

    println!("{}", style("Sales by Coffee:").bold());
    println!("{}", "-".repeat(80));
    for sale in &report.by_coffee {
        println!("{}", style(&sale.coffee_name).cyan());
        println!(
            "  Orders: {} | Bags: {} | Revenue: ${:.2}",
            sale.order_count, sale.total_bags, sale.total_revenue
        );
    }

    println!();
    println!("{}", style("Recent Orders:").bold());
    println!("{}", "-".repeat(80));
    for order in &report.recent {
        println!(
            "{} | {} | {} bags | ${:.2}",
            order.order_date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            order.coffee_name,
            order.quantity_bags,
            order.total_price
        );
    }
}

pub fn print_sync_report(report: &SyncReport) {
    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Created => println!("  {} Created: {}", CHECK, item.name),
            ItemOutcome::Updated => println!("  {} Updated: {}", CHECK, item.name),
            ItemOutcome::Failed(reason) => println!(
                "  {} Failed: {} {}",
                CROSS,
                item.name,
                style(format!("({})", reason)).dim()
            ),
        }
    }

    println!();
    let summary = format!(
        "Sync complete: {} succeeded ({} created, {} updated), {} failed",
        report.succeeded(),
        report.created,
        report.updated,
        report.failed
    );
    if report.is_success() {
        println!("{} {}", CHECK, style(summary).green());
    } else {
        println!("{} {}", WARN, style(summary).yellow());
    }
}
