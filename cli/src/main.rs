mod printer;
mod query;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use printer::RowPrinter;
use query::QueryArgs;
use reportql::{DbDriver, DbPool, QueryBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reportql")]
#[command(about = "Render and run report queries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SQL and its parameters without touching a database
    Render {
        #[command(flatten)]
        query: QueryArgs,

        /// Placeholder style of the printed SQL
        #[arg(long, value_enum, default_value_t = Dialect::Generic)]
        dialect: Dialect,
    },
    /// Execute the query and print every row
    Run {
        #[command(flatten)]
        query: QueryArgs,

        /// Database URL (e.g., sqlite://report.db)
        #[arg(short, long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Execute the query and print the first column of the first row
    Scalar {
        #[command(flatten)]
        query: QueryArgs,

        /// Database URL (e.g., sqlite://report.db)
        #[arg(short, long, env = "DATABASE_URL")]
        database_url: String,

        /// How to decode the value
        #[arg(long = "as", value_enum, default_value_t = ScalarKind::Int)]
        kind: ScalarKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dialect {
    /// `?` placeholders (MySQL, SQLite)
    Generic,
    /// `$n` placeholders
    Postgres,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScalarKind {
    Int,
    Float,
    Text,
    Date,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Render { query, dialect } => render(&query.build()?, dialect),
        Command::Run {
            query,
            database_url,
        } => {
            let builder = query.build()?;
            let pool = connect(&database_url).await?;
            run(&builder, &pool).await
        }
        Command::Scalar {
            query,
            database_url,
            kind,
        } => {
            let builder = query.build()?;
            let pool = connect(&database_url).await?;
            scalar(&builder, &pool, kind).await
        }
    }
}

async fn connect(database_url: &str) -> Result<DbPool> {
    let pool = DbPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(driver = ?pool.driver(), "connected");
    Ok(pool)
}

fn render(builder: &QueryBuilder, dialect: Dialect) -> Result<()> {
    let sql = match dialect {
        Dialect::Generic => builder.sql(),
        Dialect::Postgres => DbDriver::Postgres.convert_placeholders(&builder.sql()),
    };
    println!("{}", sql.trim_end());
    println!("{}", serde_json::to_string(&builder.binds())?);
    Ok(())
}

async fn run(builder: &QueryBuilder, pool: &DbPool) -> Result<()> {
    let mut printer = RowPrinter::new();
    match pool.driver() {
        DbDriver::MySql => builder.for_each_result(pool.mysql_pool()?, &mut printer).await?,
        DbDriver::Postgres => builder.for_each_result(pool.pg_pool()?, &mut printer).await?,
        DbDriver::Sqlite => builder.for_each_result(pool.sqlite_pool()?, &mut printer).await?,
    }
    eprintln!("({} row(s))", printer.rows());
    Ok(())
}

macro_rules! scalar_on {
    ($builder:expr, $executor:expr, $kind:expr) => {
        match $kind {
            ScalarKind::Int => display($builder.single_scalar_result_or_null::<_, i64, _>($executor).await?),
            ScalarKind::Float => display($builder.single_scalar_result_or_null::<_, f64, _>($executor).await?),
            ScalarKind::Text => display($builder.single_scalar_result_or_null::<_, String, _>($executor).await?),
            ScalarKind::Date => display($builder.single_date_result_or_null($executor).await?),
        }
    };
}

async fn scalar(builder: &QueryBuilder, pool: &DbPool, kind: ScalarKind) -> Result<()> {
    let value = match pool.driver() {
        DbDriver::MySql => scalar_on!(builder, pool.mysql_pool()?, kind),
        DbDriver::Postgres => scalar_on!(builder, pool.pg_pool()?, kind),
        DbDriver::Sqlite => scalar_on!(builder, pool.sqlite_pool()?, kind),
    };
    println!("{}", value);
    Ok(())
}

fn display<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}
