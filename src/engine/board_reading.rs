// ==========================================
// 轮胎厂生产 KPI 系统 - 看板照片读数解析
// ==========================================
// 职责: OCR 文本 → BoardReading（日期 / 产量 / 不良 / 计划）
// 红线: 解析失败的字段为 None，不抛错
// ==========================================

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 一张看板照片的读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardReading {
    pub date: Option<NaiveDate>,
    pub production: Option<f64>,
    pub reject: Option<f64>,
    pub target: Option<f64>,
    pub confidence: f64, // 0-100
    pub source_image: String,
}

impl BoardReading {
    pub fn empty(source_image: impl Into<String>) -> Self {
        Self {
            date: None,
            production: None,
            reject: None,
            target: None,
            confidence: 0.0,
            source_image: source_image.into(),
        }
    }
}

/// 解析 OCR 文本；文本中无日期时尝试从文件名取
pub fn parse_board_text(text: &str, source_image: &str) -> BoardReading {
    let date = text_date(text).or_else(|| date_from_file_name(source_image));
    let production = labelled_number(text, r"(?i)(?:production|output|quantity)\s*[:：]?\s*([0-9][0-9,]*(?:\.[0-9]+)?)");
    let reject = labelled_number(text, r"(?i)(?:reject|defect|scrap)\s*[:：]?\s*([0-9][0-9,]*(?:\.[0-9]+)?)");
    let target = labelled_number(text, r"(?i)(?:target|plan)\s*[:：]?\s*([0-9][0-9,]*(?:\.[0-9]+)?)");

    let found = [date.is_some(), production.is_some(), reject.is_some()]
        .iter()
        .filter(|f| **f)
        .count();

    BoardReading {
        date,
        production,
        reject,
        target,
        confidence: found as f64 / 3.0 * 100.0,
        source_image: source_image.to_string(),
    }
}

fn text_date(text: &str) -> Option<NaiveDate> {
    let re = Regex::new(r"(?i)date\s*[:：]?\s*(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})").ok()?;
    let caps = re.captures(text)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn labelled_number(text: &str, pattern: &str) -> Option<f64> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(text)?;
    caps.get(1)?.as_str().replace(',', "").parse().ok()
}

/// 从图片文件名取日期（YYYY-MM-DD 或 DD-MM-YYYY，分隔符 - _ .）
pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let iso = Regex::new(r"(\d{4})[-_.](\d{1,2})[-_.](\d{1,2})").ok()?;
    if let Some(caps) = iso.captures(name) {
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day = caps.get(3)?.as_str().parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    let dmy = Regex::new(r"(\d{1,2})[-_.](\d{1,2})[-_.](\d{4})").ok()?;
    let caps = dmy.captures(name)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
