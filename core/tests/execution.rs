#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use futures_util::TryStreamExt;
use reportql::{DbDriver, DbPool, DimensionType, Error, Filter, QueryBuilder, ResultHandler};
use sqlx::sqlite::{SqliteColumn, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, Sqlite};

async fn setup() -> SqliteConnection {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    let statements = [
        "CREATE TABLE Site (SiteId INTEGER PRIMARY KEY, ActivityId INTEGER, DatabaseId INTEGER, PartnerId INTEGER, LocationId INTEGER, Date2 TEXT)",
        "CREATE TABLE LocationAdminLink (LocationId INTEGER, AdminEntityId INTEGER)",
        "INSERT INTO Site VALUES (1, 1, 1, 10, 100, '2024-01-10')",
        "INSERT INTO Site VALUES (2, 1, 1, 11, 101, '2024-02-10')",
        "INSERT INTO Site VALUES (3, 2, 1, 10, 102, '2024-03-10')",
        "INSERT INTO Site VALUES (4, 2, 2, 12, 100, NULL)",
        "INSERT INTO Site VALUES (5, 1, 2, 10, 103, '2023-12-01')",
        "INSERT INTO LocationAdminLink VALUES (100, 7)",
        "INSERT INTO LocationAdminLink VALUES (101, 7)",
        "INSERT INTO LocationAdminLink VALUES (102, 8)",
    ];
    for statement in statements {
        sqlx::query(statement).execute(&mut conn).await.unwrap();
    }
    conn
}

#[derive(Default)]
struct SiteCollector {
    init_calls: usize,
    columns: Vec<String>,
    ids: Vec<i64>,
    fail_after: Option<usize>,
}

impl ResultHandler<Sqlite> for SiteCollector {
    fn init(&mut self, columns: &[SqliteColumn]) -> reportql::Result<()> {
        self.init_calls += 1;
        self.columns = columns.iter().map(|c| c.name().to_string()).collect();
        Ok(())
    }

    fn handle(&mut self, row: &SqliteRow) -> reportql::Result<()> {
        if self.fail_after == Some(self.ids.len()) {
            return Err(Error::handler("stop"));
        }
        self.ids.push(row.try_get(0)?);
        Ok(())
    }
}

fn site_ids() -> QueryBuilder {
    let mut builder = QueryBuilder::select(["Site.SiteId AS id"]);
    builder.from("Site");
    builder
}

#[tokio::test]
async fn for_each_result_applies_filter() {
    let mut conn = setup().await;

    let mut filter = Filter::new();
    filter
        .add_restriction(DimensionType::AdminLevel, 7)
        .restrict(DimensionType::Partner, [10, 12]);

    let mut builder = site_ids();
    builder.filtered_by(&filter).order_by("Site.SiteId");

    let mut handler = SiteCollector::default();
    builder.for_each_result(&mut conn, &mut handler).await.unwrap();

    assert_eq!(handler.init_calls, 1);
    assert_eq!(handler.columns, vec!["id"]);
    assert_eq!(handler.ids, vec![1, 4]);
}

#[tokio::test]
async fn for_each_result_inits_once_on_empty_result() {
    let mut conn = setup().await;

    let mut builder = site_ids();
    builder.where_("Site.SiteId").equal_to(99);

    let mut handler = SiteCollector::default();
    builder.for_each_result(&mut conn, &mut handler).await.unwrap();

    assert_eq!(handler.init_calls, 1);
    assert!(handler.columns.is_empty());
    assert!(handler.ids.is_empty());
}

#[tokio::test]
async fn for_each_result_releases_cursor_when_handler_fails() {
    let mut conn = setup().await;

    let mut builder = site_ids();
    builder.order_by("Site.SiteId");

    let mut handler = SiteCollector {
        fail_after: Some(2),
        ..Default::default()
    };
    let err = builder
        .for_each_result(&mut conn, &mut handler)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Handler(_)));
    assert_eq!(handler.ids, vec![1, 2]);

    // 连接可以立即复用
    let count: Option<i64> = QueryBuilder::select(["COUNT(*)"])
        .from("Site")
        .single_scalar_result_or_null(&mut conn)
        .await
        .unwrap();
    assert_eq!(count, Some(5));
}

#[tokio::test]
async fn for_each_result_releases_cursor_when_init_fails() {
    let mut conn = setup().await;

    struct RejectColumns {
        handled: usize,
    }
    impl ResultHandler<Sqlite> for RejectColumns {
        fn init(&mut self, _columns: &[SqliteColumn]) -> reportql::Result<()> {
            Err(Error::handler("unexpected columns"))
        }

        fn handle(&mut self, _row: &SqliteRow) -> reportql::Result<()> {
            self.handled += 1;
            Ok(())
        }
    }

    let mut handler = RejectColumns { handled: 0 };
    let err = site_ids()
        .for_each_result(&mut conn, &mut handler)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Handler(_)));
    assert_eq!(handler.handled, 0);

    let count: Option<i64> = QueryBuilder::select(["COUNT(*)"])
        .from("Site")
        .single_scalar_result_or_null(&mut conn)
        .await
        .unwrap();
    assert_eq!(count, Some(5));
}

#[tokio::test]
async fn decode_errors_carry_sql() {
    let mut conn = setup().await;

    struct TextReader;
    impl ResultHandler<Sqlite> for TextReader {
        fn handle(&mut self, row: &SqliteRow) -> reportql::Result<()> {
            let _: String = row.try_get("missing_column")?;
            Ok(())
        }
    }

    let builder = site_ids();
    let err = builder
        .for_each_result(&mut conn, &mut TextReader)
        .await
        .unwrap_err();
    match err {
        Error::Query { sql, .. } => assert_eq!(sql, "SELECT Site.SiteId AS id FROM Site "),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn execution_failure_is_wrapped_with_sql() {
    let mut conn = setup().await;

    let mut builder = QueryBuilder::select(["x"]);
    builder.from("NoSuchTable");

    let err = builder
        .for_each_result(&mut conn, &mut SiteCollector::default())
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with("Exception thrown while processing SQL: 'SELECT x FROM NoSuchTable"));
    assert!(matches!(err, Error::Query { .. }));
}

#[tokio::test]
async fn single_scalar_result_or_null() {
    let mut conn = setup().await;

    let mut filter = Filter::new();
    filter
        .add_restriction(DimensionType::AdminLevel, 7)
        .restrict(DimensionType::Partner, [10, 12]);
    let mut count = QueryBuilder::select(["COUNT(*)"]);
    count.from("Site").filtered_by(&filter);
    let n: Option<i64> = count.single_scalar_result_or_null(&mut conn).await.unwrap();
    assert_eq!(n, Some(2));

    // 第一列为 NULL
    let mut latest = QueryBuilder::select(["MAX(Site.Date2)"]);
    latest.from("Site").where_("Site.PartnerId").equal_to(12);
    let date = latest.single_date_result_or_null(&mut conn).await.unwrap();
    assert_eq!(date, None);

    // 没有任何行
    let mut none = site_ids();
    none.where_("Site.SiteId").equal_to(99);
    let id: Option<i64> = none.single_scalar_result_or_null(&mut conn).await.unwrap();
    assert_eq!(id, None);
}

#[tokio::test]
async fn single_date_result() {
    let mut conn = setup().await;

    let mut filter = Filter::new();
    filter.add_restriction(DimensionType::Activity, 1);
    let mut latest = QueryBuilder::select(["MAX(Site.Date2)"]);
    latest.from("Site").filtered_by(&filter);

    let date = latest.single_date_result_or_null(&mut conn).await.unwrap();
    assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 10));
}

#[tokio::test]
async fn derived_table_binds_execute_in_placeholder_order() {
    let mut conn = setup().await;

    let mut derived = QueryBuilder::select(["PartnerId", "COUNT(*) AS n"]);
    derived
        .from("Site")
        .where_("ActivityId")
        .equal_to(1)
        .group_by("PartnerId");

    let mut builder = QueryBuilder::select(["Site.SiteId", "d.n"]);
    builder.from("Site").where_("Site.DatabaseId").equal_to(2);
    builder
        .left_join_derived(&derived, "d")
        .on("d.PartnerId = Site.PartnerId");
    builder.order_by("Site.SiteId");

    let prepared = builder.prepare::<Sqlite>();
    let rows: Vec<SqliteRow> = prepared.execute_query(&mut conn).try_collect().await.unwrap();
    let values: Vec<(i64, Option<i64>)> = rows
        .iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect();
    assert_eq!(values, vec![(4, None), (5, Some(2))]);
}

#[tokio::test]
async fn dropped_row_stream_releases_connection() {
    let mut conn = setup().await;

    let prepared = site_ids().prepare::<Sqlite>();
    {
        let mut rows = prepared.execute_query(&mut conn);
        let first = rows.try_next().await.unwrap();
        assert!(first.is_some());
    }

    let n: Option<i64> = QueryBuilder::select(["COUNT(*)"])
        .from("LocationAdminLink")
        .single_scalar_result_or_null(&mut conn)
        .await
        .unwrap();
    assert_eq!(n, Some(3));
}

#[tokio::test]
async fn null_bind_compares_as_sql_null() {
    let mut conn = setup().await;

    let mut builder = QueryBuilder::select(["COUNT(*)"]);
    builder.from("Site").where_("Site.PartnerId").equal_to(None::<i32>);
    let n: Option<i64> = builder.single_scalar_result_or_null(&mut conn).await.unwrap();
    assert_eq!(n, Some(0));

    let mut missing = QueryBuilder::select(["COUNT(*)"]);
    missing.from("Site").where_true("Site.Date2 IS NULL");
    let n: Option<i64> = missing.single_scalar_result_or_null(&mut conn).await.unwrap();
    assert_eq!(n, Some(1));
}

#[tokio::test]
async fn db_pool_connects_by_url() {
    let pool = DbPool::connect("sqlite::memory:").await.unwrap();
    assert_eq!(pool.driver(), DbDriver::Sqlite);
    #[cfg(feature = "postgres")]
    assert!(matches!(pool.pg_pool(), Err(Error::NoPoolAvailable)));
    #[cfg(feature = "mysql")]
    assert!(matches!(pool.mysql_pool(), Err(Error::NoPoolAvailable)));

    let mut builder = QueryBuilder::select(["COUNT(*)"]);
    builder.from("sqlite_master");
    let n: Option<i64> = builder
        .single_scalar_result_or_null(pool.sqlite_pool().unwrap())
        .await
        .unwrap();
    assert_eq!(n, Some(0));
}
