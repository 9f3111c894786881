//! Warehouse Loader - Builds the e-commerce star schema from flat files
//!
//! Responsibilities:
//! - Read products, customers and sales sources (CSV or spreadsheet)
//! - Normalize prices, emails, order dates and quantities
//! - Derive the calendar dimension from order dates
//! - Replace dim_product, dim_customer, dim_date and fact_sales in SQLite
//! - Report row counts read back from the store
//!
//! Every run rebuilds all four tables from scratch.
//!
//! Usage:
//!   cargo run --bin warehouse
//!   cargo run --bin warehouse -- --data-dir ./data --output ./output/ecommerce_dw.sqlite --atomic

mod coerce;
mod config;
mod date_dim;
mod error;
mod logging;
mod normalize;
mod pipeline;
mod reader;
mod table;
mod warehouse;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{default_root, PipelineConfig};
use crate::warehouse::WriteMode;

#[derive(Parser, Debug)]
#[command(name = "warehouse", about = "Loads the e-commerce star schema into SQLite")]
struct Args {
    /// Directory holding sample_products.csv, sample_customers.csv and sample_sales.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Products source (overrides --data-dir)
    #[arg(long)]
    products: Option<PathBuf>,

    /// Customers source (overrides --data-dir)
    #[arg(long)]
    customers: Option<PathBuf>,

    /// Sales source (overrides --data-dir)
    #[arg(long)]
    sales: Option<PathBuf>,

    /// Output database file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Replace all four tables in a single transaction
    #[arg(long, default_value = "false")]
    atomic: bool,

    /// Log filter for stderr diagnostics (e.g. warn, info, warehouse=debug)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::from_root(&default_root());
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(path) = self.products {
            config.products_path = path;
        }
        if let Some(path) = self.customers {
            config.customers_path = path;
        }
        if let Some(path) = self.sales {
            config.sales_path = path;
        }
        if let Some(path) = self.output {
            config.output_path = path;
        }
        if self.atomic {
            config.write_mode = WriteMode::Atomic;
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(&args.log_level)?;

    let config = args.into_config();
    tracing::debug!(?config, "resolved configuration");

    let summary = match pipeline::run(&config).await {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!(kind = ?err.kind(), "run aborted");
            return Err(err).with_context(|| {
                format!(
                    "warehouse load into {} failed",
                    config.output_path.display()
                )
            });
        }
    };

    for table in &summary.tables {
        tracing::debug!(
            table = %table.table,
            written = table.written,
            counted = table.counted,
            "row count verified"
        );
    }
    tracing::info!(output = %summary.output_path.display(), "run complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let config = Args::parse_from(["warehouse"]).into_config();
        assert_eq!(config, PipelineConfig::from_root(&default_root()));
    }

    #[test]
    fn test_args_overrides() {
        let config = Args::parse_from([
            "warehouse",
            "--data-dir",
            "/in",
            "--sales",
            "/elsewhere/sales.xlsx",
            "--output",
            "/out/dw.sqlite",
            "--atomic",
        ])
        .into_config();
        assert_eq!(config.products_path, PathBuf::from("/in/sample_products.csv"));
        assert_eq!(config.sales_path, PathBuf::from("/elsewhere/sales.xlsx"));
        assert_eq!(config.output_path, PathBuf::from("/out/dw.sqlite"));
        assert_eq!(config.write_mode, WriteMode::Atomic);
    }
}
