//! # reportql
//!
//! 为报表 DAO 构建原生 SQL 的轻量 DSL：按片段拼接 SELECT 语句，
//! 参数与占位符同步追加，最后通过 sqlx 在调用方提供的连接上执行。
//!
//! ```rust,ignore
//! use reportql::{DimensionType, Filter, QueryBuilder};
//!
//! let mut filter = Filter::new();
//! filter.restrict(DimensionType::Partner, [1, 2]);
//!
//! let mut builder = QueryBuilder::select(["MAX(Site.Date2)"]);
//! builder.from("Site").filtered_by(&filter);
//!
//! let latest = builder
//!     .single_date_result_or_null(pool.sqlite_pool()?)
//!     .await?;
//! ```

pub mod database_info;
pub mod db_pool;
pub mod error;
pub mod executor;
pub mod filter;
pub mod label;
pub mod query_builder;

pub use database_info::DatabaseInfo;
pub use db_pool::{DbDriver, DbPool};
pub use error::{Error, Result};
pub use executor::{PreparedQuery, ResultHandler};
pub use filter::{DimensionType, Filter, RestrictionTarget};
pub use label::{ArabicNumberSequence, LabelSequence};
pub use query_builder::{BindValue, JoinClause, QueryBuilder, WhereClause};
