// ==========================================
// 轮胎厂生产 KPI 系统 - 列名归一化
// ==========================================
// 职责: 表头原文 → 标准列名（有序规则表，首个命中生效）
// 规则: 先做 slug（小写、非字母数字折叠为下划线），再对 slug 匹配
//       未命中的列保留 slug，不丢弃
// 红线: 多个表头归一到同一标准列时必须给出告警
// ==========================================

use crate::domain::types::{CanonicalColumn, Column};
use crate::importer::error::ImportResult;
use regex::Regex;
use std::collections::BTreeMap;

/// 默认规则表（顺序即优先级）
///
/// (标准列, 匹配模式, 排除模式)
const DEFAULT_RULES: &[(CanonicalColumn, &str, Option<&str>)] = &[
    (
        CanonicalColumn::AGrade,
        r"^a(_?grade)?$|(^|_)a_?grade|grade_?a($|_)",
        None,
    ),
    (
        CanonicalColumn::BGrade,
        r"^b(_?grade)?$|(^|_)b_?grade|grade_?b($|_)",
        None,
    ),
    (CanonicalColumn::Oee, r"oee|equipment_effectiveness", None),
    (CanonicalColumn::Fpy, r"fpy|first_pass", None),
    (CanonicalColumn::Scrap, r"scrap|reject|defect|waste", None),
    (CanonicalColumn::Rework, r"^r$|rework|repair", None),
    (
        CanonicalColumn::Date,
        r"date|^(day|month|year)($|_)",
        Some(r"update"),
    ),
    (CanonicalColumn::Target, r"target|plan|goal", None),
    (
        CanonicalColumn::Quantity,
        r"qty|quantity|output|production|^pcs$",
        None,
    ),
    (CanonicalColumn::TyreSize, r"tyre|tire|size|pattern", None),
];

/// 表头 slug：小写，非字母数字折叠为单个下划线，去掉首尾下划线
pub fn slugify(header: &str) -> String {
    let mut slug = String::with_capacity(header.len());
    let mut pending_sep = false;
    for ch in header.trim().chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch);
        } else {
            pending_sep = true;
        }
    }
    slug
}

// ==========================================
// ColumnRule - 一条归一化规则
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub target: CanonicalColumn,
    pattern: Regex,
    exclude: Option<Regex>,
}

impl ColumnRule {
    pub fn new(target: CanonicalColumn, pattern: &str, exclude: Option<&str>) -> ImportResult<Self> {
        Ok(Self {
            target,
            pattern: Regex::new(&format!("(?i){}", pattern))?,
            exclude: exclude.map(|e| Regex::new(&format!("(?i){}", e))).transpose()?,
        })
    }

    pub fn matches(&self, slug: &str) -> bool {
        self.pattern.is_match(slug)
            && !self.exclude.as_ref().is_some_and(|e| e.is_match(slug))
    }
}

// ==========================================
// 归一化结果
// ==========================================

/// 多个表头归一到同一标准列（后者覆盖前者）
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMapping {
    pub column: CanonicalColumn,
    pub headers: Vec<String>, // 原始表头文本
    pub positions: Vec<usize>, // 列下标
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedHeader {
    pub columns: Vec<Column>,
    pub duplicates: Vec<DuplicateMapping>,
}

impl NormalizedHeader {
    /// 标准列 → 列下标（同名时取最后一列，后写覆盖）
    pub fn positions(&self) -> BTreeMap<CanonicalColumn, usize> {
        let mut positions = BTreeMap::new();
        for (idx, column) in self.columns.iter().enumerate() {
            if let Some(canonical) = column.canonical() {
                positions.insert(canonical, idx);
            }
        }
        positions
    }

    pub fn has(&self, column: CanonicalColumn) -> bool {
        self.columns
            .iter()
            .any(|c| c.canonical() == Some(column))
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }
}

// ==========================================
// ColumnNormalizer - 列名归一化器
// ==========================================
#[derive(Debug, Clone)]
pub struct ColumnNormalizer {
    rules: Vec<ColumnRule>,
}

impl ColumnNormalizer {
    /// 使用默认规则表
    pub fn standard() -> ImportResult<Self> {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(target, pattern, exclude)| ColumnRule::new(*target, pattern, *exclude))
            .collect::<ImportResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn with_rules(rules: Vec<ColumnRule>) -> Self {
        Self { rules }
    }

    /// 单个表头 → 列名
    ///
    /// 标准列名本身只会命中自己的规则，因此重复归一化结果不变
    pub fn normalize_one(&self, header: &str) -> Column {
        let slug = slugify(header);
        if slug.is_empty() {
            return Column::Other(String::new());
        }
        match self.rules.iter().find(|rule| rule.matches(&slug)) {
            Some(rule) => Column::Canonical(rule.target),
            None => Column::Other(slug),
        }
    }

    /// 整行表头 → 列名，并收集重复映射
    ///
    /// 空表头命名为 `unnamed_{列号}`
    pub fn normalize(&self, headers: &[String]) -> NormalizedHeader {
        let mut columns = Vec::with_capacity(headers.len());
        let mut seen: BTreeMap<CanonicalColumn, Vec<usize>> = BTreeMap::new();

        for (idx, header) in headers.iter().enumerate() {
            let column = match self.normalize_one(header) {
                Column::Other(name) if name.is_empty() => Column::Other(format!("unnamed_{}", idx)),
                other => other,
            };
            if let Some(canonical) = column.canonical() {
                seen.entry(canonical).or_default().push(idx);
            }
            columns.push(column);
        }

        let duplicates = seen
            .into_iter()
            .filter(|(_, positions)| positions.len() > 1)
            .map(|(column, positions)| DuplicateMapping {
                column,
                headers: positions.iter().map(|&p| headers[p].clone()).collect(),
                positions,
            })
            .collect();

        NormalizedHeader {
            columns,
            duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> ColumnNormalizer {
        ColumnNormalizer::standard().unwrap()
    }

    fn canonical(header: &str) -> Option<CanonicalColumn> {
        normalizer().normalize_one(header).canonical()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Tyre Size "), "tyre_size");
        assert_eq!(slugify("A-Grade (pcs)"), "a_grade_pcs");
        assert_eq!(slugify("OEE %"), "oee");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn test_common_header_variants() {
        assert_eq!(canonical("Date"), Some(CanonicalColumn::Date));
        assert_eq!(canonical("Production Date"), Some(CanonicalColumn::Date));
        assert_eq!(canonical("Day"), Some(CanonicalColumn::Date));
        assert_eq!(canonical("Tyre Size"), Some(CanonicalColumn::TyreSize));
        assert_eq!(canonical("TIRE"), Some(CanonicalColumn::TyreSize));
        assert_eq!(canonical("Qty"), Some(CanonicalColumn::Quantity));
        assert_eq!(canonical("Total Output"), Some(CanonicalColumn::Quantity));
        assert_eq!(canonical("Production"), Some(CanonicalColumn::Quantity));
        assert_eq!(canonical("Plan"), Some(CanonicalColumn::Target));
        assert_eq!(canonical("Target Qty"), Some(CanonicalColumn::Target));
        assert_eq!(canonical("A Grade"), Some(CanonicalColumn::AGrade));
        assert_eq!(canonical("A"), Some(CanonicalColumn::AGrade));
        assert_eq!(canonical("Grade B"), Some(CanonicalColumn::BGrade));
        assert_eq!(canonical("R"), Some(CanonicalColumn::Rework));
        assert_eq!(canonical("Reject"), Some(CanonicalColumn::Scrap));
        assert_eq!(canonical("OEE %"), Some(CanonicalColumn::Oee));
        assert_eq!(canonical("First Pass Yield"), Some(CanonicalColumn::Fpy));
    }

    #[test]
    fn test_unmatched_headers_are_preserved() {
        assert_eq!(
            normalizer().normalize_one("Shift Supervisor"),
            Column::Other("shift_supervisor".to_string())
        );
        assert_eq!(
            normalizer().normalize_one("Last Update"),
            Column::Other("last_update".to_string())
        );
        assert_eq!(normalizer().normalize_one("12"), Column::Other("12".to_string()));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let n = normalizer();
        for header in [
            "Date",
            "Tyre Size",
            "Qty",
            "A Grade",
            "b_grade",
            "Scrap Pcs",
            "OEE %",
            "FPY",
            "Remarks / Notes",
        ] {
            let once = n.normalize_one(header);
            let twice = n.normalize_one(once.name());
            assert_eq!(once, twice, "header {:?}", header);
        }
        for column in CanonicalColumn::ALL {
            assert_eq!(n.normalize_one(column.as_str()), Column::Canonical(column));
        }
    }

    #[test]
    fn test_duplicate_mapping_reported() {
        let headers: Vec<String> = ["Date", "Tyre Size", "Output", "Production", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let normalized = normalizer().normalize(&headers);

        assert_eq!(normalized.duplicates.len(), 1);
        assert_eq!(normalized.duplicates[0].column, CanonicalColumn::Quantity);
        assert_eq!(normalized.duplicates[0].positions, vec![2, 3]);
        // 后写覆盖：取最后一列
        assert_eq!(normalized.positions()[&CanonicalColumn::Quantity], 3);
        assert_eq!(normalized.columns[4], Column::Other("unnamed_4".to_string()));
    }
}
