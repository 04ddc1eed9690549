use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("No connection pool available for driver")]
    NoPoolAvailable,
    /// 调用方误用，例如 IN 条件传入空集合
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// 执行或解码过程中的数据库错误，携带出错的 SQL
    #[error("Exception thrown while processing SQL: '{sql}'")]
    Query {
        sql: String,
        #[source]
        source: sqlx::Error,
    },
    /// ResultHandler 拒绝处理某一行
    #[error("Result handler failed: {0}")]
    Handler(String),
    /// Filter JSON 无法解析
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn query(sql: &str, source: sqlx::Error) -> Self {
        Error::Query {
            sql: sql.to_string(),
            source,
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Error::Handler(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
