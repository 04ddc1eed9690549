//! 报表过滤条件
//!
//! Filter 记录每个维度被限制到的 id 集合，由 [`QueryBuilder::filtered_by`](crate::QueryBuilder::filtered_by)
//! 翻译成 WHERE 条件。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 报表中可以过滤或聚合的维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DimensionType {
    Activity,
    ActivityCategory,
    AdminLevel,
    Attribute,
    AttributeGroup,
    Database,
    Date,
    Indicator,
    IndicatorCategory,
    Location,
    OrgUnit,
    Partner,
    Project,
    Site,
    Target,
}

/// 维度限制在 SQL 中的落点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionTarget {
    /// 直接对某一列做 IN 匹配
    Column(&'static str),
    /// 通过 LocationAdminLink 把行政单位映射到 Site.LocationId
    AdminEntity,
}

impl DimensionType {
    /// 返回维度对应的限制方式，没有 SQL 映射的维度返回 `None`
    ///
    /// TODO: 未映射的维度目前被 `filtered_by` 忽略（只记录 debug 日志），需要和报表端确认是否应改为报错
    pub fn restriction_target(self) -> Option<RestrictionTarget> {
        match self {
            DimensionType::Activity => Some(RestrictionTarget::Column("Site.ActivityId")),
            DimensionType::Database => Some(RestrictionTarget::Column("Site.DatabaseId")),
            DimensionType::Partner => Some(RestrictionTarget::Column("Site.PartnerId")),
            DimensionType::Site => Some(RestrictionTarget::Column("Site.SiteId")),
            DimensionType::Indicator => Some(RestrictionTarget::Column("Indicator.IndicatorId")),
            DimensionType::AdminLevel => Some(RestrictionTarget::AdminEntity),
            _ => None,
        }
    }
}

/// 维度 → id 集合
///
/// 只有至少包含一个 id 的维度才算受限，因此 `filtered_by` 永远不会生成空的 IN 列表。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    restrictions: BTreeMap<DimensionType, BTreeSet<i32>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 解析，例如 `{"restrictions": {"Partner": [1, 2]}}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 追加一组 id 到维度的限制中
    pub fn restrict<I>(&mut self, dimension: DimensionType, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = i32>,
    {
        let ids: BTreeSet<i32> = ids.into_iter().collect();
        if !ids.is_empty() {
            self.restrictions.entry(dimension).or_default().extend(ids);
        }
        self
    }

    pub fn add_restriction(&mut self, dimension: DimensionType, id: i32) -> &mut Self {
        self.restrict(dimension, [id])
    }

    pub fn clear_restriction(&mut self, dimension: DimensionType) -> &mut Self {
        self.restrictions.remove(&dimension);
        self
    }

    pub fn restrictions(&self, dimension: DimensionType) -> Option<&BTreeSet<i32>> {
        self.restrictions
            .get(&dimension)
            .filter(|ids| !ids.is_empty())
    }

    pub fn is_restricted(&self, dimension: DimensionType) -> bool {
        self.restrictions(dimension).is_some()
    }

    /// 按维度顺序列出受限维度及其 id
    pub fn restricted_dimensions(&self) -> impl Iterator<Item = (DimensionType, &BTreeSet<i32>)> {
        self.restrictions
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(dimension, ids)| (*dimension, ids))
    }

    pub fn is_empty(&self) -> bool {
        self.restricted_dimensions().next().is_none()
    }
}
