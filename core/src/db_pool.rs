#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use sqlx::Pool;
use std::sync::Arc;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    MySql,
    Postgres,
    Sqlite,
}

impl DbDriver {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(DbDriver::MySql)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbDriver::Postgres)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(Error::UnsupportedDatabase(url.to_string()))
        }
    }

    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => "?".to_string(),
            DbDriver::Postgres => format!("${}", index + 1),
        }
    }

    /// 将 `?` 占位符转换为驱动对应的格式
    ///
    /// 单引号字符串字面量（含 `''` 转义）中的 `?` 原样保留，不参与编号。
    pub fn convert_placeholders(&self, sql: &str) -> String {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => sql.to_string(),
            DbDriver::Postgres => {
                let mut result = String::with_capacity(sql.len());
                let mut index = 0;
                let mut in_literal = false;
                for ch in sql.chars() {
                    match ch {
                        // `''` 连续切换两次，仍停留在字面量内
                        '\'' => {
                            in_literal = !in_literal;
                            result.push(ch);
                        }
                        '?' if !in_literal => {
                            result.push_str(&self.placeholder(index));
                            index += 1;
                        }
                        _ => result.push(ch),
                    }
                }
                result
            }
        }
    }
}

/// 按 URL 自动选择驱动的连接池
///
/// 连接池只负责建立连接；builder 执行时借用 `*_pool()` 返回的引用作为 executor。
#[derive(Debug, Clone)]
pub struct DbPool {
    driver: DbDriver,
    #[cfg(feature = "mysql")]
    mysql: Option<Arc<Pool<sqlx::MySql>>>,
    #[cfg(feature = "postgres")]
    pg: Option<Arc<Pool<sqlx::Postgres>>>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<Arc<Pool<sqlx::Sqlite>>>,
}

impl DbPool {
    /// 从数据库 URL 连接并创建 DbPool
    pub async fn connect(url: &str) -> Result<Self> {
        let driver = DbDriver::from_url(url)?;
        tracing::debug!(?driver, "connecting database pool");

        match driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = Pool::<sqlx::MySql>::connect(url).await?;
                Ok(Self::from_mysql_pool(Arc::new(pool)))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = Pool::<sqlx::Postgres>::connect(url).await?;
                Ok(Self::from_postgres_pool(Arc::new(pool)))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = Pool::<sqlx::Sqlite>::connect(url).await?;
                Ok(Self::from_sqlite_pool(Arc::new(pool)))
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::UnsupportedDatabase(format!(
                "driver {:?} is not enabled, rebuild with the matching cargo feature",
                driver
            ))),
        }
    }

    /// 从 MySQL Pool 创建 DbPool
    #[cfg(feature = "mysql")]
    fn from_mysql_pool(pool: Arc<Pool<sqlx::MySql>>) -> Self {
        Self {
            driver: DbDriver::MySql,
            mysql: Some(pool),
            #[cfg(feature = "postgres")]
            pg: None,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 PostgreSQL Pool 创建 DbPool
    #[cfg(feature = "postgres")]
    fn from_postgres_pool(pool: Arc<Pool<sqlx::Postgres>>) -> Self {
        Self {
            driver: DbDriver::Postgres,
            #[cfg(feature = "mysql")]
            mysql: None,
            pg: Some(pool),
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 SQLite Pool 创建 DbPool
    #[cfg(feature = "sqlite")]
    fn from_sqlite_pool(pool: Arc<Pool<sqlx::Sqlite>>) -> Self {
        Self {
            driver: DbDriver::Sqlite,
            #[cfg(feature = "mysql")]
            mysql: None,
            #[cfg(feature = "postgres")]
            pg: None,
            sqlite: Some(pool),
        }
    }

    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    #[cfg(feature = "mysql")]
    pub fn mysql_pool(&self) -> Result<&Pool<sqlx::MySql>> {
        self.mysql.as_deref().ok_or(Error::NoPoolAvailable)
    }

    #[cfg(feature = "postgres")]
    pub fn pg_pool(&self) -> Result<&Pool<sqlx::Postgres>> {
        self.pg.as_deref().ok_or(Error::NoPoolAvailable)
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite_pool(&self) -> Result<&Pool<sqlx::Sqlite>> {
        self.sqlite.as_deref().ok_or(Error::NoPoolAvailable)
    }
}
