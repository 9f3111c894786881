//! Calendar dimension derived from order dates.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::pipeline::DIM_DATE;
use crate::table::{SemanticType, Table, Value};

/// One calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRow {
    pub date_key: i64,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_week: String,
}

impl DateRow {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date_key: date_key(date),
            date,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            day_of_week: date.format("%A").to_string(),
        }
    }

    fn into_values(self) -> Vec<Value> {
        vec![
            Value::Integer(self.date_key),
            Value::Date(self.date),
            Value::Integer(i64::from(self.year)),
            Value::Integer(i64::from(self.month)),
            Value::Integer(i64::from(self.day)),
            Value::Text(self.day_of_week),
        ]
    }
}

/// `YYYYMMDD` surrogate key, e.g. 2023-03-07 -> 20230307.
pub fn date_key(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// Distinct non-missing dates as dimension rows, ascending.
pub fn date_rows<'a>(dates: impl IntoIterator<Item = &'a Value>) -> Vec<DateRow> {
    dates
        .into_iter()
        .filter_map(Value::as_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(DateRow::from_date)
        .collect()
}

/// Build `dim_date` from the normalized `order_date` column.
///
/// No dates yields an empty table with the full column list.
pub fn build_date_dim<'a>(dates: impl IntoIterator<Item = &'a Value>) -> Table {
    let rows = date_rows(dates)
        .into_iter()
        .map(DateRow::into_values)
        .collect();
    let columns = vec![
        ("date_key".to_string(), SemanticType::Integer),
        ("date".to_string(), SemanticType::Date),
        ("year".to_string(), SemanticType::Integer),
        ("month".to_string(), SemanticType::Integer),
        ("day".to_string(), SemanticType::Integer),
        ("day_of_week".to_string(), SemanticType::Text),
    ];
    Table::from_rows(DIM_DATE, columns, rows).with_primary_key("date_key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::to_date;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_date_key_encoding() {
        let d = NaiveDate::from_ymd_opt(2023, 3, 7).unwrap();
        assert_eq!(date_key(d), 20230307);
    }

    #[test]
    fn test_duplicates_collapse() {
        let dates = vec![date(2023, 1, 1), date(2023, 1, 1), date(2023, 1, 2)];
        let dim = build_date_dim(&dates);
        assert_eq!(dim.len(), 2);
        let keys: Vec<&Value> = dim.column("date_key").unwrap();
        assert_eq!(keys, vec![&Value::Integer(20230101), &Value::Integer(20230102)]);
    }

    #[test]
    fn test_missing_dates_excluded() {
        let dates = vec![Value::Null, date(2024, 5, 1), Value::Null];
        let rows = date_rows(&dates);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_key, 20240501);
        assert_eq!(rows[0].day_of_week, "Wednesday");
    }

    #[test]
    fn test_rows_sorted_by_date() {
        let dates = vec![date(2024, 2, 1), date(2023, 12, 31), date(2024, 1, 15)];
        let keys: Vec<i64> = date_rows(&dates).iter().map(|r| r.date_key).collect();
        assert_eq!(keys, vec![20231231, 20240115, 20240201]);
    }

    #[test]
    fn test_row_attributes() {
        let row = DateRow::from_date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(row.year, 2024);
        assert_eq!(row.month, 2);
        assert_eq!(row.day, 29);
        assert_eq!(row.day_of_week, "Thursday");
    }

    #[test]
    fn test_empty_input_keeps_columns() {
        let dates = vec![Value::Null];
        let dim = build_date_dim(&dates);
        assert!(dim.is_empty());
        assert_eq!(dim.name(), DIM_DATE);
        let names: Vec<&str> = dim.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["date_key", "date", "year", "month", "day", "day_of_week"]);
        assert_eq!(dim.primary_key(), Some("date_key"));
    }

    // -------------------------------------------------------------------------
    // PROPERTY TESTS
    // -------------------------------------------------------------------------

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        (1000i32..=9999, 1u32..=366)
            .prop_filter_map("valid ordinal day", |(year, ordinal)| {
                NaiveDate::from_yo_opt(year, ordinal)
            })
    }

    proptest! {
        #[test]
        fn test_date_key_round_trips(d in any_date()) {
            let key = date_key(d);
            prop_assert_eq!(
                NaiveDate::parse_from_str(&key.to_string(), "%Y%m%d").ok(),
                Some(d)
            );
            prop_assert_eq!(to_date(&Value::Integer(key)), Value::Date(d));
        }

        #[test]
        fn test_any_duplicates_collapse(dates in prop::collection::vec(any_date(), 0..40)) {
            let values: Vec<Value> = dates
                .iter()
                .chain(dates.iter())
                .map(|d| Value::Date(*d))
                .chain(std::iter::once(Value::Null))
                .collect();
            let distinct: BTreeSet<NaiveDate> = dates.iter().copied().collect();

            let rows = date_rows(&values);
            prop_assert_eq!(rows.len(), distinct.len());
            prop_assert!(rows.windows(2).all(|w| w[0].date_key < w[1].date_key));
            prop_assert_eq!(build_date_dim(&values).len(), distinct.len());
        }
    }
}
