use crate::database_info::DatabaseInfo;
use crate::error::{Error, Result};
use crate::executor::{PreparedQuery, ResultHandler};
use crate::filter::{Filter, RestrictionTarget};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::{ColumnIndex, Database, Decode, Executor, IntoArguments, Type};

/// 绑定值，用于安全地传递参数
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BindValue {
    String(String),
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Float64(f64),
    Float32(f32),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// SQL NULL，按文本类型绑定
    ///
    /// PostgreSQL 会把参数推断为 TEXT，与非文本列比较（如 `PartnerId = $1`）会报
    /// `operator does not exist`；匹配 NULL 应改用 `where_true("col IS NULL")`。
    /// MySQL 和 SQLite 不受影响。
    Null,
}

/// 原生 SQL 查询构建器
///
/// 按调用顺序累积 SELECT / FROM / WHERE / GROUP BY / ORDER BY 片段，
/// 参数与占位符同步追加：渲染后 SQL 中第 N 个 `?` 对应 [`QueryBuilder::binds`] 的第 N 个值。
///
/// `from`、`where_true`、`and_raw` 以及 JOIN 的 `on` 直接拼接原始 SQL，
/// 只能用于程序内部构造的可信片段；外部输入必须走 `equal_to` / `is_in` 等绑定参数的路径。
///
/// ```rust,ignore
/// let mut builder = QueryBuilder::select(["Site.SiteId", "Site.Date1"]);
/// builder
///     .from("Site")
///     .left_join("Partner")
///     .on("Partner.PartnerId = Site.PartnerId")
///     .where_("Site.ActivityId")
///     .equal_to(3)
///     .order_by("Site.Date1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    field_list: String,
    table_list: String,
    where_clause: String,
    group_by_clause: String,
    order_by_clause: String,
    limit_clause: String,
    // FROM 子句中派生表的参数，渲染顺序上总是位于 WHERE 参数之前
    from_binds: Vec<BindValue>,
    where_binds: Vec<BindValue>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以字段列表创建构建器
    pub fn select<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = Self::new();
        for field in fields {
            builder.append_field(field.as_ref());
        }
        builder
    }

    /// 追加一个字段（或逗号分隔的字段列表）
    pub fn append_field(&mut self, expr: &str) -> &mut Self {
        if !self.field_list.is_empty() {
            self.field_list.push_str(", ");
        }
        self.field_list.push_str(expr);
        self
    }

    /// 追加原始的表列表，可以包含 JOIN
    pub fn from(&mut self, from_clause: &str) -> &mut Self {
        self.table_list.push_str(from_clause);
        self
    }

    /// LEFT JOIN 一张表，必须通过 [`JoinClause::on`] 补全连接条件
    pub fn left_join(&mut self, table_name: &str) -> JoinClause<'_> {
        JoinClause {
            builder: self,
            join: format!(" LEFT JOIN {}", table_name),
            binds: Vec::new(),
        }
    }

    /// LEFT JOIN 一个派生表（子查询），子查询的参数在嵌入位置并入 FROM 参数
    pub fn left_join_derived(&mut self, derived_table: &QueryBuilder, alias: &str) -> JoinClause<'_> {
        JoinClause {
            join: format!(" LEFT JOIN ({}) AS {}", derived_table.sql(), alias),
            binds: derived_table.binds(),
            builder: self,
        }
    }

    /// 开始一个 WHERE 条件，多个条件之间用 AND 连接
    ///
    /// 条件文本在 [`WhereClause`] 完成时才写入，未完成或失败的条件不会留下痕迹。
    pub fn where_(&mut self, expr: &str) -> WhereClause<'_> {
        WhereClause {
            builder: self,
            expr: expr.to_string(),
        }
    }

    /// 追加一个不带参数的原始条件，与其他条件用 AND 连接
    pub fn where_true(&mut self, expr: &str) -> &mut Self {
        self.push_predicate(expr);
        self
    }

    /// 追加 ` AND (expr) `，不绑定任何参数
    ///
    /// 尚无任何条件时只追加 `(expr) `，避免生成以 AND 开头的 WHERE。
    pub fn and_raw(&mut self, expr: &str) -> &mut Self {
        if self.where_clause.is_empty() {
            self.where_clause.push('(');
        } else {
            self.where_clause.push_str(" AND (");
        }
        self.where_clause.push_str(expr);
        self.where_clause.push_str(") ");
        self
    }

    /// 根据 Filter 中受限的维度追加条件
    ///
    /// 没有 SQL 映射的维度会被忽略。
    pub fn filtered_by(&mut self, filter: &Filter) -> &mut Self {
        for (dimension, ids) in filter.restricted_dimensions() {
            let values: Vec<BindValue> = ids.iter().copied().map(BindValue::from).collect();
            match dimension.restriction_target() {
                Some(RestrictionTarget::Column(column)) => {
                    self.where_(column).complete_in(values);
                }
                Some(RestrictionTarget::AdminEntity) => {
                    let mut linked = QueryBuilder::select(["Link.LocationId"]);
                    linked
                        .from("LocationAdminLink Link")
                        .where_("Link.AdminEntityId")
                        .complete_in(values);
                    self.where_("Site.LocationId").in_subquery(&linked);
                }
                None => {
                    tracing::debug!(?dimension, "no SQL mapping for restricted dimension, ignoring");
                }
            }
        }
        self
    }

    /// 追加 GROUP BY 表达式（多次调用以逗号累积）
    pub fn group_by(&mut self, expr: &str) -> &mut Self {
        if !self.group_by_clause.is_empty() {
            self.group_by_clause.push_str(", ");
        }
        self.group_by_clause.push_str(expr);
        self
    }

    /// 追加 ORDER BY 表达式（多次调用以逗号累积）
    pub fn order_by(&mut self, expr: &str) -> &mut Self {
        if !self.order_by_clause.is_empty() {
            self.order_by_clause.push_str(", ");
        }
        self.order_by_clause.push_str(expr);
        self
    }

    /// 设置追加在 SQL 末尾的 LIMIT 片段，例如 `LIMIT 10`
    pub fn set_limit_clause(&mut self, clause: &str) -> &mut Self {
        self.limit_clause = clause.to_string();
        self
    }

    fn push_predicate(&mut self, expr: &str) {
        if !self.where_clause.is_empty() {
            self.where_clause.push_str(" AND ");
        }
        self.where_clause.push_str(expr);
    }

    /// 生成使用 `?` 占位符的 SQL
    pub fn sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.field_list, self.table_list);

        if !self.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clause);
        }
        if !self.group_by_clause.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by_clause);
        }
        if !self.order_by_clause.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by_clause);
        }
        sql.push(' ');
        sql.push_str(&self.limit_clause);

        sql
    }

    /// 返回所有绑定值（FROM 参数 + WHERE 参数），与占位符顺序一致
    pub fn binds(&self) -> Vec<BindValue> {
        let mut all_binds = self.from_binds.clone();
        all_binds.extend_from_slice(&self.where_binds);
        all_binds
    }

    /// 按数据库类型固化 SQL 与参数，得到可执行的查询
    pub fn prepare<DB: DatabaseInfo>(&self) -> PreparedQuery<DB> {
        let sql = DB::get_driver().convert_placeholders(&self.sql());
        PreparedQuery::new(sql, self.binds())
    }

    /// 执行查询，先以列信息调用一次 `init`，再对每一行调用 `handle`
    pub async fn for_each_result<'c, DB, E, H>(&self, executor: E, handler: &mut H) -> Result<()>
    where
        DB: DatabaseInfo,
        for<'a> <DB as Database>::Arguments<'a>: IntoArguments<'a, DB>,
        E: Executor<'c, Database = DB>,
        H: ResultHandler<DB> + ?Sized,
    {
        self.prepare::<DB>().for_each_result(executor, handler).await
    }

    /// 执行查询并返回第一行第一列的值；没有结果或值为 NULL 时返回 `None`
    pub async fn single_scalar_result_or_null<'c, DB, T, E>(&self, executor: E) -> Result<Option<T>>
    where
        DB: DatabaseInfo,
        for<'a> <DB as Database>::Arguments<'a>: IntoArguments<'a, DB>,
        E: Executor<'c, Database = DB>,
        T: for<'r> Decode<'r, DB> + Type<DB>,
        usize: ColumnIndex<<DB as Database>::Row>,
    {
        self.prepare::<DB>()
            .single_scalar_result_or_null(executor)
            .await
    }

    /// [`QueryBuilder::single_scalar_result_or_null`] 的日期版本
    pub async fn single_date_result_or_null<'c, DB, E>(&self, executor: E) -> Result<Option<NaiveDate>>
    where
        DB: DatabaseInfo,
        for<'a> <DB as Database>::Arguments<'a>: IntoArguments<'a, DB>,
        E: Executor<'c, Database = DB>,
        NaiveDate: for<'r> Decode<'r, DB> + Type<DB>,
        usize: ColumnIndex<<DB as Database>::Row>,
    {
        self.single_scalar_result_or_null::<DB, NaiveDate, E>(executor)
            .await
    }
}

/// WHERE 条件的后续步骤，必须以 `equal_to` / `is_in` / `in_subquery` 之一结束
#[must_use = "the predicate is only added once the where clause is completed"]
pub struct WhereClause<'a> {
    builder: &'a mut QueryBuilder,
    expr: String,
}

impl<'a> WhereClause<'a> {
    /// `expr = ?`
    pub fn equal_to(self, value: impl Into<BindValue>) -> &'a mut QueryBuilder {
        let builder = self.builder;
        builder.push_predicate(&self.expr);
        builder.where_clause.push_str(" = ? ");
        builder.where_binds.push(value.into());
        builder
    }

    /// 单个值生成 `expr = ?`，多个值生成 `expr IN (?, ?, ...)`
    ///
    /// 空集合无法匹配任何值，立即返回 [`Error::InvalidArgument`]，构建器保持不变。
    pub fn is_in<I, V>(self, values: I) -> Result<&'a mut QueryBuilder>
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        let values: Vec<BindValue> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "Cannot match '{}' against empty list.",
                self.expr
            )));
        }
        Ok(self.complete_in(values))
    }

    /// `expr IN (子查询)`，子查询的参数按原有顺序并入
    pub fn in_subquery(self, subquery: &QueryBuilder) -> &'a mut QueryBuilder {
        let builder = self.builder;
        builder.push_predicate(&self.expr);
        builder.where_clause.push_str(" IN (");
        builder.where_clause.push_str(&subquery.sql());
        builder.where_clause.push_str(") ");
        builder.where_binds.extend(subquery.binds());
        builder
    }

    // 调用方保证 values 非空
    fn complete_in(self, values: Vec<BindValue>) -> &'a mut QueryBuilder {
        let builder = self.builder;
        builder.push_predicate(&self.expr);
        if values.len() == 1 {
            builder.where_clause.push_str(" = ?");
        } else {
            let placeholders = vec!["?"; values.len()].join(", ");
            builder.where_clause.push_str(" IN (");
            builder.where_clause.push_str(&placeholders);
            builder.where_clause.push(')');
        }
        builder.where_binds.extend(values);
        builder
    }
}

/// LEFT JOIN 的后续步骤，必须以 `on` 结束
#[must_use = "the join is only added once its condition is supplied with `on`"]
pub struct JoinClause<'a> {
    builder: &'a mut QueryBuilder,
    join: String,
    binds: Vec<BindValue>,
}

impl<'a> JoinClause<'a> {
    /// 补全连接条件：`LEFT JOIN table ON (expr)`
    pub fn on(self, expr: &str) -> &'a mut QueryBuilder {
        let builder = self.builder;
        builder.table_list.push_str(&self.join);
        builder.table_list.push_str(" ON (");
        builder.table_list.push_str(expr);
        builder.table_list.push_str(") ");
        builder.from_binds.extend(self.binds);
        builder
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::String(s)
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::String(s.to_string())
    }
}

impl From<i64> for BindValue {
    fn from(i: i64) -> Self {
        BindValue::Int64(i)
    }
}

impl From<i32> for BindValue {
    fn from(i: i32) -> Self {
        BindValue::Int32(i)
    }
}

impl From<i16> for BindValue {
    fn from(i: i16) -> Self {
        BindValue::Int16(i)
    }
}

impl From<f64> for BindValue {
    fn from(f: f64) -> Self {
        BindValue::Float64(f)
    }
}

impl From<f32> for BindValue {
    fn from(f: f32) -> Self {
        BindValue::Float32(f)
    }
}

impl From<bool> for BindValue {
    fn from(b: bool) -> Self {
        BindValue::Bool(b)
    }
}

impl From<NaiveDate> for BindValue {
    fn from(d: NaiveDate) -> Self {
        BindValue::Date(d)
    }
}

impl From<NaiveDateTime> for BindValue {
    fn from(dt: NaiveDateTime) -> Self {
        BindValue::DateTime(dt)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(BindValue::Null, Into::into)
    }
}
