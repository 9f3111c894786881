//! Run configuration.

use std::path::{Path, PathBuf};

use crate::warehouse::WriteMode;

pub const PRODUCTS_FILE: &str = "sample_products.csv";
pub const CUSTOMERS_FILE: &str = "sample_customers.csv";
pub const SALES_FILE: &str = "sample_sales.csv";
pub const OUTPUT_FILE: &str = "ecommerce_dw.sqlite";

/// Everything a run needs to know. Passed explicitly to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub products_path: PathBuf,
    pub customers_path: PathBuf,
    pub sales_path: PathBuf,
    pub output_path: PathBuf,
    pub write_mode: WriteMode,
}

impl PipelineConfig {
    /// Standard layout under a project root: `data/` for inputs, `output/` for the database.
    pub fn from_root(root: &Path) -> Self {
        let data_dir = root.join("data");
        Self {
            products_path: data_dir.join(PRODUCTS_FILE),
            customers_path: data_dir.join(CUSTOMERS_FILE),
            sales_path: data_dir.join(SALES_FILE),
            output_path: root.join("output").join(OUTPUT_FILE),
            write_mode: WriteMode::default(),
        }
    }

    /// Point all three inputs at another directory, keeping the file names.
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        self.products_path = data_dir.join(PRODUCTS_FILE);
        self.customers_path = data_dir.join(CUSTOMERS_FILE);
        self.sales_path = data_dir.join(SALES_FILE);
        self
    }
}

/// Repository root this binary was built from.
pub fn default_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}
