//! 查询执行
//!
//! [`PreparedQuery`] 持有已转换占位符的 SQL 和按位置排列的参数，
//! 每次执行都从调用方提供的 executor（连接池、连接或事务）获取语句和游标，
//! 并在所有退出路径上释放它们：行流是普通的 Rust 值，离开作用域即被 drop。

use std::marker::PhantomData;

use futures_core::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use sqlx::query::Query;
use sqlx::{ColumnIndex, Database, Decode, Executor, IntoArguments, Row, Type};

use crate::database_info::{bind_all, DatabaseInfo};
use crate::error::{Error, Result};
use crate::query_builder::BindValue;

/// 逐行处理查询结果
///
/// `init` 在处理任何行之前调用一次，用于根据列信息做准备；
/// 列信息取自第一行，结果为空时传入空切片。
pub trait ResultHandler<DB: Database> {
    fn init(&mut self, columns: &[DB::Column]) -> Result<()> {
        let _ = columns;
        Ok(())
    }

    fn handle(&mut self, row: &DB::Row) -> Result<()>;
}

/// 固化后的查询：SQL 已使用驱动对应的占位符
#[derive(Debug)]
pub struct PreparedQuery<DB> {
    sql: String,
    binds: Vec<BindValue>,
    _db: PhantomData<fn() -> DB>,
}

impl<DB: DatabaseInfo> PreparedQuery<DB> {
    pub(crate) fn new(sql: String, binds: Vec<BindValue>) -> Self {
        Self {
            sql,
            binds,
            _db: PhantomData,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

impl<DB> PreparedQuery<DB>
where
    DB: DatabaseInfo,
    for<'a> <DB as Database>::Arguments<'a>: IntoArguments<'a, DB>,
{
    fn query(&self) -> Query<'_, DB, <DB as Database>::Arguments<'_>> {
        tracing::debug!(
            target: "reportql::sql",
            sql = %self.sql,
            params = self.binds.len(),
            "executing query"
        );
        bind_all(sqlx::query::<DB>(&self.sql), &self.binds)
    }

    fn wrap(&self, err: Error) -> Error {
        match err {
            Error::DatabaseError(source) => Error::query(&self.sql, source),
            other => other,
        }
    }

    /// 执行查询并返回行流（游标），由调用方决定何时消费和释放
    pub fn execute_query<'e, 'c: 'e, E>(&'e self, executor: E) -> BoxStream<'e, Result<DB::Row>>
    where
        E: 'e + Executor<'c, Database = DB>,
    {
        let sql = self.sql.as_str();
        self.query()
            .fetch(executor)
            .map_err(move |source| Error::query(sql, source))
            .boxed()
    }

    /// 执行查询，先调用一次 `init`，再对每一行调用 `handle`
    ///
    /// 任一步骤失败都会立即停止迭代并释放游标；数据库错误统一包装为 [`Error::Query`]。
    pub async fn for_each_result<'c, E, H>(&self, executor: E, handler: &mut H) -> Result<()>
    where
        E: Executor<'c, Database = DB>,
        H: ResultHandler<DB> + ?Sized,
    {
        let mut rows = self.query().fetch(executor);
        let mut initialized = false;

        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|source| Error::query(&self.sql, source))?
        {
            if !initialized {
                handler.init(row.columns()).map_err(|e| self.wrap(e))?;
                initialized = true;
            }
            handler.handle(&row).map_err(|e| self.wrap(e))?;
        }

        if !initialized {
            handler.init(&[]).map_err(|e| self.wrap(e))?;
        }
        Ok(())
    }

    /// 执行查询并返回第一行第一列的值；没有结果或值为 NULL 时返回 `None`
    pub async fn single_scalar_result_or_null<'c, T, E>(&self, executor: E) -> Result<Option<T>>
    where
        E: Executor<'c, Database = DB>,
        T: for<'r> Decode<'r, DB> + Type<DB>,
        usize: ColumnIndex<<DB as Database>::Row>,
    {
        let row = self
            .query()
            .fetch_optional(executor)
            .await
            .map_err(|source| Error::query(&self.sql, source))?;

        match row {
            Some(row) => row
                .try_get::<Option<T>, usize>(0)
                .map_err(|source| Error::query(&self.sql, source)),
            None => Ok(None),
        }
    }
}
