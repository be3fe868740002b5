//! # Seed Data Generator
//!
//! Populates the database with a small store for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./caixa_dev.db for company "loja-1"
//! cargo run -p caixa-db --bin seed
//!
//! # Specify database path and company
//! cargo run -p caixa-db --bin seed -- --db ./data/caixa.db --company loja-2
//! ```
//!
//! ## Generated Data
//! - Grocery products with SKU `{CATEGORY}-{NNN}` and EAN-like barcodes
//! - A handful of customers, some holding cashback balance
//! - Two card fee profiles (debit plus credit 1x..6x)
//! - The "Vendas" ledger category

use std::env;

use caixa_core::types::Rate;
use caixa_core::{CardTier, Customer, FeeProfile, Product, SALES_CATEGORY};
use caixa_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Product categories: (code, [(name, price_cents)])
const CATEGORIES: &[(&str, &[(&str, i64)])] = &[
    (
        "MERC",
        &[
            ("Arroz Tipo 1 5kg", 2890),
            ("Feijão Carioca 1kg", 899),
            ("Açúcar Refinado 1kg", 499),
            ("Café Torrado 500g", 1790),
            ("Óleo de Soja 900ml", 749),
            ("Macarrão Espaguete 500g", 459),
            ("Farinha de Trigo 1kg", 589),
            ("Sal Refinado 1kg", 249),
        ],
    ),
    (
        "BEB",
        &[
            ("Água Mineral 1,5L", 299),
            ("Refrigerante Guaraná 2L", 899),
            ("Suco de Laranja 1L", 1099),
            ("Cerveja Lata 350ml", 449),
        ],
    ),
    (
        "LIMP",
        &[
            ("Detergente 500ml", 279),
            ("Sabão em Pó 1kg", 1490),
            ("Água Sanitária 2L", 689),
            ("Esponja Multiuso", 199),
        ],
    ),
];

/// Customers: (name, phone, cashback_balance_cents)
const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Maria Souza", "11999990001", 2500),
    ("João Pereira", "11999990002", 0),
    ("Ana Lima", "11999990003", 850),
];

/// Fee profiles: (name, debit bps, credit bps for 1x..6x)
const FEE_PROFILES: &[(&str, u32, [u32; 6])] = &[
    ("Stone", 199, [319, 459, 529, 599, 669, 739]),
    ("Cielo", 239, [349, 489, 559, 629, 699, 769]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,caixa=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./caixa_dev.db");
    let mut company = String::from("loja-1");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--company" | "-c" => {
                if i + 1 < args.len() {
                    company = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Caixa POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./caixa_dev.db)");
                println!("  -c, --company <ID>     Company owning the fee profiles (default: loja-1)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, company = %company, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0usize;

    for (category_code, products) in CATEGORIES {
        for (index, (name, price_cents)) in products.iter().enumerate() {
            let product = generate_product(category_code, index, name, *price_cents);
            if let Err(e) = db.products().insert(&product).await {
                warn!(sku = %product.sku, error = %e, "Failed to insert product");
                continue;
            }
            generated += 1;
        }
    }

    for (name, phone, balance) in CUSTOMERS {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
            cashback_balance_cents: *balance,
        };
        db.customers().insert(&customer).await?;
    }

    for (name, debit, credit) in FEE_PROFILES {
        let mut profile = FeeProfile::new(*name).with_rate(CardTier::Debit, Rate::from_bps(*debit));
        for (n, bps) in credit.iter().enumerate() {
            profile = profile.with_rate(CardTier::Credit(n as u8 + 1), Rate::from_bps(*bps));
        }
        db.fee_profiles().save(&company, &profile).await?;
    }

    db.ledger().ensure_category(SALES_CATEGORY).await?;

    info!(
        products = generated,
        customers = CUSTOMERS.len(),
        fee_profiles = FEE_PROFILES.len(),
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    let sample = db.products().search_prefix("arroz", 10).await?;
    info!(results = sample.len(), "Prefix search 'arroz'");

    db.close().await;
    Ok(())
}

/// Builds one product with a deterministic SKU and barcode.
fn generate_product(category: &str, index: usize, name: &str, price_cents: i64) -> Product {
    let sku = format!("{}-{:03}", category, index + 1);
    let seed = category.bytes().map(u64::from).sum::<u64>() * 100 + index as u64;

    Product {
        id: Uuid::new_v4().to_string(),
        sku,
        barcode: Some(format!("789{:010}", seed)),
        name: name.to_string(),
        price_cents,
    }
}
