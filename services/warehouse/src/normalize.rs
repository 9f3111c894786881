//! Per-entity normalization.
//!
//! Each normalizer keeps every input row. Values that cannot be coerced turn
//! into missing values; only an absent column is an error.

use crate::coerce::{multiply, settle_numeric, to_date, to_number};
use crate::error::Result;
use crate::table::{SemanticType, Table, Value};

/// Coerce `price` to a number.
pub fn normalize_products(mut products: Table) -> Result<Table> {
    coerce_numeric_column(&mut products, "price")?;
    Ok(products)
}

/// Lowercase and trim `email`.
pub fn normalize_customers(mut customers: Table) -> Result<Table> {
    let idx = customers.require_column("email")?;
    let emails = customers
        .rows()
        .iter()
        .map(|row| match &row[idx] {
            Value::Null => Value::Null,
            Value::Text(s) => Value::Text(s.to_lowercase().trim().to_string()),
            Value::Integer(i) => Value::Text(i.to_string()),
            Value::Real(f) => Value::Text(f.to_string()),
            Value::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
        })
        .collect();
    customers.replace_column("email", SemanticType::Text, emails)?;
    Ok(customers)
}

/// Parse `order_date`, coerce `unit_price` and `quantity`, derive `total_amount`.
pub fn normalize_sales(mut sales: Table) -> Result<Table> {
    let date_idx = sales.require_column("order_date")?;
    let dates: Vec<Value> = sales.rows().iter().map(|row| to_date(&row[date_idx])).collect();
    log_coerced(&sales, "order_date", date_idx, &dates);
    sales.replace_column("order_date", SemanticType::Date, dates)?;

    coerce_numeric_column(&mut sales, "unit_price")?;
    coerce_numeric_column(&mut sales, "quantity")?;

    let price_idx = sales.require_column("unit_price")?;
    let qty_idx = sales.require_column("quantity")?;
    let totals = sales
        .rows()
        .iter()
        .map(|row| multiply(&row[price_idx], &row[qty_idx]))
        .collect();
    let (ty, totals) = settle_numeric(totals);
    sales.put_column("total_amount", ty, totals);

    Ok(sales)
}

fn coerce_numeric_column(table: &mut Table, column: &str) -> Result<()> {
    let idx = table.require_column(column)?;
    let values: Vec<Value> = table.rows().iter().map(|row| to_number(&row[idx])).collect();
    log_coerced(table, column, idx, &values);
    let (ty, values) = settle_numeric(values);
    table.replace_column(column, ty, values)
}

/// Report how many present values were replaced by missing ones.
fn log_coerced(table: &Table, column: &str, idx: usize, coerced: &[Value]) {
    let lost = table
        .rows()
        .iter()
        .zip(coerced)
        .filter(|(row, value)| !row[idx].is_null() && value.is_null())
        .count();
    if lost > 0 {
        tracing::info!(
            table = table.name(),
            column,
            values = lost,
            "unparseable values coerced to missing"
        );
    }
}
