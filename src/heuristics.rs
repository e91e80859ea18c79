use crate::document::{DocumentType, FieldMap};
use crate::evidence::Finding;

/// 领域规则：对已抽取字段做的小型合理性检查
///
/// 规则是可插拔的，编排器只认这个 trait，不内联任何具体规则。
pub trait DomainRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// 该规则是否适用于给定的文档类型
    fn applies_to(&self, document_type: DocumentType) -> bool;

    /// 字段缺失时应返回 `None`
    fn evaluate(&self, fields: &FieldMap) -> Option<Finding>;
}

/// 路由号首字符检查，仅对银行流水生效。
///
/// 当前规则：首字符不在允许集合内即报告，空值同样报告。
#[derive(Debug, Clone)]
pub struct RoutingNumberRule {
    field: String,
    allowed_leading: Vec<char>,
}

impl RoutingNumberRule {
    pub const FIELD: &'static str = "routing_number";

    pub fn new(allowed_leading: Vec<char>) -> Self {
        Self {
            field: Self::FIELD.to_string(),
            allowed_leading,
        }
    }
}

impl Default for RoutingNumberRule {
    fn default() -> Self {
        Self::new(vec!['0'])
    }
}

impl DomainRule for RoutingNumberRule {
    fn name(&self) -> &'static str {
        "routing-number"
    }

    fn applies_to(&self, document_type: DocumentType) -> bool {
        document_type.is_bank_statement()
    }

    fn evaluate(&self, fields: &FieldMap) -> Option<Finding> {
        let value = fields.get(&self.field)?;
        match value.trim().chars().next() {
            Some(first) if self.allowed_leading.contains(&first) => None,
            _ => Some(Finding::RoutingNumberUnusual),
        }
    }
}

/// 默认规则集
pub fn default_rules() -> Vec<Box<dyn DomainRule>> {
    vec![Box::new(RoutingNumberRule::default())]
}
