//! Orchestration: read, normalize, derive, write, verify.

use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::date_dim::build_date_dim;
use crate::error::{EtlError, Result};
use crate::normalize::{normalize_customers, normalize_products, normalize_sales};
use crate::reader::read_table;
use crate::table::Table;
use crate::warehouse::Warehouse;

pub const DIM_PRODUCT: &str = "dim_product";
pub const DIM_CUSTOMER: &str = "dim_customer";
pub const DIM_DATE: &str = "dim_date";
pub const FACT_SALES: &str = "fact_sales";

/// Row counts for one written table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: String,
    pub written: usize,
    pub counted: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub tables: Vec<TableCount>,
}

/// The normalized star schema, before it is written.
#[derive(Debug, Clone)]
pub struct StarSchema {
    pub products: Table,
    pub customers: Table,
    pub dates: Table,
    pub sales: Table,
}

impl StarSchema {
    /// Tables in write order.
    pub fn tables(&self) -> [&Table; 4] {
        [&self.products, &self.customers, &self.dates, &self.sales]
    }
}

/// Normalize the three sources and derive the date dimension.
pub fn transform(products: Table, customers: Table, sales: Table) -> Result<StarSchema> {
    let products = normalize_products(products)?.renamed(DIM_PRODUCT);
    let customers = normalize_customers(customers)?.renamed(DIM_CUSTOMER);
    let sales = normalize_sales(sales)?.renamed(FACT_SALES);

    let dates = build_date_dim(sales.column("order_date")?);
    if dates.is_empty() {
        tracing::warn!("no valid order dates, dim_date will be empty");
    }

    Ok(StarSchema {
        products,
        customers,
        dates,
        sales,
    })
}

/// Run the whole load once.
pub async fn run(config: &PipelineConfig) -> Result<RunSummary> {
    if let Some(parent) = config.output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| EtlError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    println!("Starting ETL process...");

    // All sources are loaded before the store is touched.
    let products = read_source(&config.products_path, "products").await?;
    let customers = read_source(&config.customers_path, "customers").await?;
    let sales = read_source(&config.sales_path, "sales").await?;

    let schema = transform(products, customers, sales)?;
    tracing::info!(
        products = schema.products.len(),
        customers = schema.customers.len(),
        dates = schema.dates.len(),
        sales = schema.sales.len(),
        "star schema built"
    );

    let warehouse = Warehouse::open(&config.output_path).await?;
    let tables = schema.tables();
    warehouse.replace_all(&tables, config.write_mode).await?;

    let mut counts = Vec::with_capacity(tables.len());
    for table in tables {
        let counted = warehouse.count_rows(table.name()).await?;
        if counted != table.len() as i64 {
            return Err(EtlError::CountMismatch {
                table: table.name().to_string(),
                expected: table.len(),
                actual: counted,
            });
        }
        println!("✅ {}: {} rows", table.name(), counted);
        counts.push(TableCount {
            table: table.name().to_string(),
            written: table.len(),
            counted,
        });
    }
    warehouse.close().await;

    println!(
        "ETL completed! Database saved at: {}",
        config.output_path.display()
    );

    Ok(RunSummary {
        output_path: config.output_path.clone(),
        tables: counts,
    })
}

async fn read_source(path: &Path, name: &str) -> Result<Table> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    println!("Reading {} ...", file_name);
    read_table(path, name).await
}
