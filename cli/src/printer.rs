use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime};
use reportql::{ArabicNumberSequence, LabelSequence, ResultHandler};
use sqlx::{Column, ColumnIndex, Database, Decode, Row, Type};

/// 逐行打印结果，每行以图例编号开头
#[derive(Debug, Default)]
pub struct RowPrinter {
    columns: Vec<String>,
    labels: ArabicNumberSequence,
    rows: usize,
}

impl RowPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn format_row(&mut self, values: Vec<String>) -> String {
        let label = self.labels.next_label();
        let cells: Vec<String> = self
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| format!("{}={}", column, value))
            .collect();
        format!("{}. {}", label, cells.join(", "))
    }
}

/// 按类型 T 解码一列，类型不兼容时返回 `None`
fn try_cell<'r, R, T>(row: &'r R, index: usize) -> Option<String>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database> + Display,
{
    match row.try_get::<Option<T>, usize>(index) {
        Ok(Some(value)) => Some(value.to_string()),
        Ok(None) => Some("NULL".to_string()),
        Err(_) => None,
    }
}

macro_rules! impl_row_printer {
    ($db:ty) => {
        impl ResultHandler<$db> for RowPrinter {
            fn init(&mut self, columns: &[<$db as Database>::Column]) -> reportql::Result<()> {
                self.columns = columns.iter().map(|c| c.name().to_string()).collect();
                Ok(())
            }

            fn handle(&mut self, row: &<$db as Database>::Row) -> reportql::Result<()> {
                let values = (0..row.len())
                    .map(|i| {
                        try_cell::<_, i64>(row, i)
                            .or_else(|| try_cell::<_, i32>(row, i))
                            .or_else(|| try_cell::<_, i16>(row, i))
                            .or_else(|| try_cell::<_, f64>(row, i))
                            .or_else(|| try_cell::<_, f32>(row, i))
                            .or_else(|| try_cell::<_, bool>(row, i))
                            .or_else(|| try_cell::<_, NaiveDate>(row, i))
                            .or_else(|| try_cell::<_, NaiveDateTime>(row, i))
                            .or_else(|| try_cell::<_, String>(row, i))
                            .unwrap_or_else(|| "?".to_string())
                    })
                    .collect();
                let line = self.format_row(values);
                println!("{}", line);
                self.rows += 1;
                Ok(())
            }
        }
    };
}

impl_row_printer!(sqlx::MySql);
impl_row_printer!(sqlx::Postgres);
impl_row_printer!(sqlx::Sqlite);
