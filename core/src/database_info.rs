//! 数据库信息抽象层
//!
//! 为执行层提供各数据库的差异：驱动类型（决定占位符格式）以及参数绑定。

use crate::db_pool::DbDriver;
use crate::query_builder::BindValue;
use sqlx::query::Query;
use sqlx::Database;

/// 将单个绑定值应用到查询中
///
/// 每个数据库的具体实现都通过这个宏展开，这样泛型执行代码只需要
/// `DB: DatabaseInfo` 一个约束，而不必为每个基本类型重复 `Encode`/`Type` 约束。
macro_rules! apply_bind_value {
    ($query:expr, $bind:expr) => {
        match $bind.clone() {
            BindValue::String(s) => $query.bind(s),
            BindValue::Int64(i) => $query.bind(i),
            BindValue::Int32(i) => $query.bind(i),
            BindValue::Int16(i) => $query.bind(i),
            BindValue::Float64(f) => $query.bind(f),
            BindValue::Float32(f) => $query.bind(f),
            BindValue::Bool(b) => $query.bind(b),
            BindValue::Date(d) => $query.bind(d),
            BindValue::DateTime(dt) => $query.bind(dt),
            BindValue::Null => $query.bind(Option::<String>::None),
        }
    };
}

/// 数据库信息 trait
///
/// 每个数据库类型（`sqlx::MySql`, `sqlx::Postgres`, `sqlx::Sqlite`）
/// 都需要实现此 trait。
pub trait DatabaseInfo: Database {
    /// 获取数据库驱动类型，占位符格式由 [`DbDriver::placeholder`] 决定
    fn get_driver() -> DbDriver;

    /// 按位置绑定一个参数
    fn bind_value<'q>(
        query: Query<'q, Self, <Self as Database>::Arguments<'q>>,
        value: &BindValue,
    ) -> Query<'q, Self, <Self as Database>::Arguments<'q>>;
}

/// 按顺序绑定所有参数：第 N 个值对应 SQL 中第 N 个占位符
pub(crate) fn bind_all<'q, DB: DatabaseInfo>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    binds: &[BindValue],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>> {
    for bind in binds {
        query = DB::bind_value(query, bind);
    }
    query
}

// ========== MySQL 实现 ==========

#[cfg(feature = "mysql")]
impl DatabaseInfo for sqlx::MySql {
    fn get_driver() -> DbDriver {
        DbDriver::MySql
    }

    fn bind_value<'q>(
        query: Query<'q, Self, <Self as Database>::Arguments<'q>>,
        value: &BindValue,
    ) -> Query<'q, Self, <Self as Database>::Arguments<'q>> {
        apply_bind_value!(query, value)
    }
}

// ========== PostgreSQL 实现 ==========

#[cfg(feature = "postgres")]
impl DatabaseInfo for sqlx::Postgres {
    fn get_driver() -> DbDriver {
        DbDriver::Postgres
    }

    fn bind_value<'q>(
        query: Query<'q, Self, <Self as Database>::Arguments<'q>>,
        value: &BindValue,
    ) -> Query<'q, Self, <Self as Database>::Arguments<'q>> {
        apply_bind_value!(query, value)
    }
}

// ========== SQLite 实现 ==========

#[cfg(feature = "sqlite")]
impl DatabaseInfo for sqlx::Sqlite {
    fn get_driver() -> DbDriver {
        DbDriver::Sqlite
    }

    fn bind_value<'q>(
        query: Query<'q, Self, <Self as Database>::Arguments<'q>>,
        value: &BindValue,
    ) -> Query<'q, Self, <Self as Database>::Arguments<'q>> {
        apply_bind_value!(query, value)
    }
}
