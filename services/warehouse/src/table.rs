//! In-memory tables with an explicit, typed field list.

use chrono::NaiveDate;

use crate::error::{EtlError, Result};

/// Declared storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Integer,
    Real,
    Text,
    Date,
}

impl SemanticType {
    /// Column type used in `CREATE TABLE`.
    pub fn sql_type(self) -> &'static str {
        match self {
            SemanticType::Integer => "INTEGER",
            SemanticType::Real => "REAL",
            SemanticType::Text => "TEXT",
            SemanticType::Date => "DATE",
        }
    }
}

/// A single cell. Missing values are `Null`, never a NaN sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: SemanticType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: SemanticType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
        }
    }
}

/// Ordered rows under a fixed field list.
///
/// Every row holds exactly `fields.len()` values, in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    fields: Vec<Field>,
    rows: Vec<Vec<Value>>,
    primary_key: Option<String>,
}

impl Table {
    /// Build a table from rows, deriving each field's nullability from the data.
    pub fn from_rows(
        name: impl Into<String>,
        columns: Vec<(String, SemanticType)>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        let fields = columns
            .into_iter()
            .enumerate()
            .map(|(idx, (name, ty))| {
                let nullable = rows.iter().any(|row| row[idx].is_null());
                Field::new(name, ty, nullable)
            })
            .collect();
        Self {
            name: name.into(),
            fields,
            rows,
            primary_key: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same rows and fields under another name.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Index of a column the caller cannot proceed without.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| EtlError::MissingColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Replace a column's values and declared type in place.
    pub fn replace_column(&mut self, name: &str, ty: SemanticType, values: Vec<Value>) -> Result<()> {
        let idx = self.require_column(name)?;
        self.set_column(idx, ty, values);
        Ok(())
    }

    /// Append a column, or overwrite it if the name is already present.
    pub fn put_column(&mut self, name: &str, ty: SemanticType, values: Vec<Value>) {
        match self.column_index(name) {
            Some(idx) => self.set_column(idx, ty, values),
            None => {
                let nullable = values.iter().any(Value::is_null);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
                self.fields.push(Field::new(name, ty, nullable));
            }
        }
    }

    fn set_column(&mut self, idx: usize, ty: SemanticType, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let nullable = values.iter().any(Value::is_null);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        let field = &mut self.fields[idx];
        field.ty = ty;
        field.nullable = nullable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            "sales",
            vec![
                ("order_id".to_string(), SemanticType::Integer),
                ("note".to_string(), SemanticType::Text),
            ],
            vec![
                vec![Value::Integer(1), Value::Text("a".to_string())],
                vec![Value::Integer(2), Value::Null],
            ],
        )
    }

    #[test]
    fn test_from_rows_derives_nullability() {
        let table = sample();
        assert!(!table.field("order_id").unwrap().nullable);
        assert!(table.field("note").unwrap().nullable);
    }

    #[test]
    fn test_require_column_missing() {
        let err = sample().require_column("price").unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { ref column, .. } if column == "price"));
    }

    #[test]
    fn test_replace_column_retypes_and_recomputes_nullability() {
        let mut table = sample();
        table
            .replace_column(
                "note",
                SemanticType::Real,
                vec![Value::Real(1.5), Value::Real(2.0)],
            )
            .unwrap();
        let field = table.field("note").unwrap();
        assert_eq!(field.ty, SemanticType::Real);
        assert!(!field.nullable);
        assert_eq!(table.rows()[1][1], Value::Real(2.0));
    }

    #[test]
    fn test_put_column_appends() {
        let mut table = sample();
        table.put_column(
            "total",
            SemanticType::Integer,
            vec![Value::Integer(10), Value::Null],
        );
        assert_eq!(table.fields().len(), 3);
        assert_eq!(table.fields()[2].name, "total");
        assert!(table.fields()[2].nullable);
        assert_eq!(table.rows()[0].len(), 3);
    }

    #[test]
    fn test_put_column_overwrites_existing() {
        let mut table = sample();
        table.put_column(
            "note",
            SemanticType::Text,
            vec![Value::Text("x".to_string()), Value::Text("y".to_string())],
        );
        assert_eq!(table.fields().len(), 2);
        assert_eq!(table.column("note").unwrap()[1], &Value::Text("y".to_string()));
    }

    #[test]
    fn test_renamed_keeps_rows() {
        let table = sample().renamed("fact_sales");
        assert_eq!(table.name(), "fact_sales");
        assert_eq!(table.len(), 2);
    }
}
