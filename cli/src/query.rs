use anyhow::{Context, Result};
use clap::Args;
use reportql::{Filter, QueryBuilder};

/// 构造查询所需的参数
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Field expression to select (repeatable)
    #[arg(short, long = "field", required = true)]
    pub fields: Vec<String>,

    /// FROM clause, including any joins
    #[arg(long)]
    pub from: String,

    /// Filter as JSON, e.g. '{"restrictions": {"Partner": [1, 2]}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// Raw predicate ANDed into the WHERE clause (repeatable)
    #[arg(long = "where-true")]
    pub where_true: Vec<String>,

    /// GROUP BY expression (repeatable)
    #[arg(long = "group-by")]
    pub group_by: Vec<String>,

    /// ORDER BY expression (repeatable)
    #[arg(long = "order-by")]
    pub order_by: Vec<String>,

    /// Maximum number of rows
    #[arg(long)]
    pub limit: Option<u64>,
}

impl QueryArgs {
    pub fn build(&self) -> Result<QueryBuilder> {
        let mut builder = QueryBuilder::select(&self.fields);
        builder.from(&self.from);

        if let Some(json) = &self.filter {
            let filter = Filter::from_json(json).context("Failed to parse --filter")?;
            builder.filtered_by(&filter);
        }
        for expr in &self.where_true {
            builder.where_true(expr);
        }
        for expr in &self.group_by {
            builder.group_by(expr);
        }
        for expr in &self.order_by {
            builder.order_by(expr);
        }
        if let Some(limit) = self.limit {
            builder.set_limit_clause(&format!("LIMIT {}", limit));
        }

        Ok(builder)
    }
}
