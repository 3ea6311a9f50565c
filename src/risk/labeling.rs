//! Human-readable row and column labels for risk alerts.
//!
//! Labels are resolved by a chain: the local [`HeuristicLabeler`] first, then
//! an optional [`LabelSource`] collaborator that only ever sees an anonymized
//! [`Neighborhood`], and finally a coordinate placeholder. Every stage answers
//! with a label or nothing; none of them fail.

use super::alert::{RiskAlert, RiskKind};
use crate::config::LabelingConfig;
use crate::model::{CellAddress, CellIndex, CellValue, ColumnSpan};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// Period patterns accepted as column labels.
static PERIOD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{2}-\d{4}",
        r"\d{4}-\d{2}",
        r"[A-Z][a-z]{2}\s+\d{4}",
        r"Q\d",
        r"FY\s*\d{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static CELL_ADDRESS_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+[0-9]+$").expect("static regex"));

static DIGITS_AND_DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-0-9\s]+$").expect("static regex"));

const STOPWORDS: &[&str] = &[
    "Total", "Sum", "Subtotal", "Check", "Val", "Value", "Amount", "Number", "Item", "Row",
    "Column", "合計", "小計", "計", "チェック", "検証", "値", "金額",
];

const PURE_SYMBOLS: &[&str] = &["-", "=", "/", "\\", "|", "・", "…"];

const NOTE_MARKERS: &[char] = &['※', '*', '注'];

/// Text labels collected to the left for a recovery request.
const NEIGHBORHOOD_LEFT: usize = 30;
const NEIGHBORHOOD_ABOVE: u32 = 5;
const NEIGHBORHOOD_SIDE: u32 = 3;

/// Collapse every whitespace variant (ideographic space included) to single spaces.
#[must_use]
pub fn normalize_label(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a label is too generic or too garbled to show to a reviewer.
#[must_use]
pub fn is_poor_quality_label(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || text.starts_with('=') {
        return true;
    }
    if text.contains(['+', '*', '/']) && !text.contains(' ') {
        return true;
    }
    if CELL_ADDRESS_LIKE.is_match(text)
        || STOPWORDS.contains(&text)
        || DIGITS_AND_DASHES.is_match(text)
    {
        return true;
    }
    let len = text.chars().count();
    !(2..=50).contains(&len)
}

/// Placeholder used when no stage produced a row label.
#[must_use]
pub fn fallback_label(row: u32) -> String {
    format!("[Unknown Row {row}]")
}

/// Whether `label` is the coordinate placeholder rather than a real label.
#[must_use]
pub fn is_fallback_label(label: &str) -> bool {
    label.starts_with("[Unknown Row ")
}

/// Score a row-label candidate by position and shape. Higher is better.
fn candidate_score(text: &str, col: u32) -> i64 {
    let col = i64::from(col);
    let mut score = if col <= 20 {
        300 - (col - 1) * 10
    } else if col <= 30 {
        90 - (col - 21) * 9
    } else {
        -(col - 30) * 10
    };
    if text.contains(['(', ')', '（', '）']) {
        score -= 50;
    }
    if text.starts_with(NOTE_MARKERS) {
        score -= 50;
    }
    if text.chars().count() <= 2 {
        score -= 20;
    }
    if PURE_SYMBOLS.contains(&text) {
        score -= 100;
    }
    score
}

fn is_plausible_year(value: f64) -> bool {
    value.fract() == 0.0 && (1900.0..=2100.0).contains(&value)
}

fn looks_numeric(text: &str) -> bool {
    text.replace(',', "").parse::<f64>().is_ok()
}

/// Text a non-formula cell contributes as a label, if any.
fn label_text(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Text(text) => {
            let text = normalize_label(text);
            if text.is_empty() || text.starts_with('=') {
                return None;
            }
            match text.replace(',', "").parse::<f64>() {
                Ok(n) if !is_plausible_year(n) => None,
                _ => Some(text),
            }
        }
        CellValue::Number(n) if is_plausible_year(*n) => Some(format!("{n}")),
        _ => None,
    }
}

/// Local, index-based label resolution.
#[derive(Debug, Clone, Default)]
pub struct HeuristicLabeler {
    label_columns: Option<ColumnSpan>,
    max_rows_up: u32,
    header_rows: u32,
}

impl HeuristicLabeler {
    /// Build from configuration. An unparsable column range falls back to
    /// scanning every column (validation reports it separately).
    #[must_use]
    pub fn from_config(config: &LabelingConfig) -> Self {
        Self {
            label_columns: config.label_columns.as_deref().and_then(ColumnSpan::parse),
            max_rows_up: config.max_rows_up,
            header_rows: config.header_rows,
        }
    }

    /// Best text label for the row of `address`.
    ///
    /// Scans every text cell left of the target (restricted to the configured
    /// label columns), scores the candidates and keeps the best, leftmost on
    /// ties. Falls back to the first text cell above the target.
    #[must_use]
    pub fn row_label(&self, index: &CellIndex, sheet: &str, address: CellAddress) -> Option<String> {
        let mut best: Option<(i64, String)> = None;
        for cell in index.row(sheet, address.row) {
            let col = cell.address().col;
            if col >= address.col {
                break;
            }
            if cell.has_formula() || !self.label_columns.map_or(true, |span| span.contains(col)) {
                continue;
            }
            let Some(text) = label_text(&cell.value) else {
                continue;
            };
            let score = candidate_score(&text, col);
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, text));
            }
        }
        if let Some((_, text)) = best {
            return Some(text);
        }

        let lowest = address.row.saturating_sub(self.max_rows_up).max(1);
        (lowest..address.row).rev().find_map(|row| {
            index
                .at(sheet, CellAddress::new(row, address.col))
                .filter(|c| !c.has_formula())
                .and_then(|c| label_text(&c.value))
        })
    }

    /// Period header above `address`, e.g. `FY2024` or `2024-04`.
    #[must_use]
    pub fn col_label(&self, index: &CellIndex, sheet: &str, address: CellAddress) -> Option<String> {
        let last = self.header_rows.min(address.row.saturating_sub(1));
        (1..=last).find_map(|row| {
            let cell = index.at(sheet, CellAddress::new(row, address.col))?;
            if cell.has_formula() {
                return None;
            }
            let text = match &cell.value {
                CellValue::DateTime(dt) => dt.format("%Y-%m").to_string(),
                CellValue::Empty | CellValue::Error(_) => return None,
                other => normalize_label(&other.display_string()),
            };
            if text.is_empty() || text.starts_with('=') {
                return None;
            }
            PERIOD_PATTERNS
                .iter()
                .any(|p| p.is_match(&text))
                .then_some(text)
        })
    }
}

/// Anonymized surroundings of a cell: text labels survive, numbers and
/// formulas are masked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighborhood {
    /// Text labels to the left, nearest first
    pub left: Vec<String>,
    pub above: Vec<String>,
    pub right: Vec<String>,
    pub below: Vec<String>,
}

impl Neighborhood {
    /// Collect the neighbourhood of `address`.
    #[must_use]
    pub fn collect(index: &CellIndex, sheet: &str, address: CellAddress) -> Self {
        let mask = |row: u32, col: u32| -> Option<String> {
            let cell = index.at(sheet, CellAddress::new(row, col))?;
            if cell.has_formula() {
                return Some("[FORMULA]".to_string());
            }
            match &cell.value {
                CellValue::Empty => None,
                CellValue::Number(_) | CellValue::DateTime(_) => Some("[NUM]".to_string()),
                CellValue::Text(text) if looks_numeric(text.trim()) => Some("[NUM]".to_string()),
                other => {
                    let text = normalize_label(&other.display_string());
                    (!text.is_empty()).then_some(text)
                }
            }
        };

        let left = (1..address.col)
            .rev()
            .filter_map(|col| index.at(sheet, CellAddress::new(address.row, col)))
            .filter(|cell| !cell.has_formula())
            .filter_map(|cell| match &cell.value {
                CellValue::Text(text) => {
                    let text = normalize_label(text);
                    (!text.is_empty() && !text.starts_with('=') && !looks_numeric(&text))
                        .then_some(text)
                }
                _ => None,
            })
            .take(NEIGHBORHOOD_LEFT)
            .collect();
        let above = (1..=NEIGHBORHOOD_ABOVE)
            .filter_map(|i| address.row.checked_sub(i).filter(|r| *r >= 1))
            .filter_map(|row| mask(row, address.col))
            .collect();
        let right = (1..=NEIGHBORHOOD_SIDE)
            .filter_map(|i| mask(address.row, address.col + i))
            .collect();
        let below = (1..=NEIGHBORHOOD_SIDE)
            .filter_map(|i| mask(address.row + i, address.col))
            .collect();

        Self {
            left,
            above,
            right,
            below,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.above.is_empty() && self.right.is_empty() && self.below.is_empty()
    }

    /// Stable key for memoizing recovery answers.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "left:{}|above:{}|right:{}|below:{}",
            self.left.join(","),
            self.above.join(","),
            self.right.join(","),
            self.below.join(",")
        )
    }
}

/// What a recovery collaborator is told about a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRequest {
    pub kind: RiskKind,
    pub sheet: String,
    pub address: CellAddress,
    pub neighborhood: Neighborhood,
}

/// External label recovery collaborator.
///
/// Returning `None`, a blank string or `NONE` all mean "no answer".
pub trait LabelSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Propose a row label for the request.
    fn label(&self, request: &LabelRequest) -> Option<String>;
}

/// Memoizes a [`LabelSource`] by neighbourhood, negative answers included.
pub struct CachingLabelSource<S> {
    inner: S,
    answers: RwLock<HashMap<String, Option<String>>>,
}

impl<S: LabelSource> CachingLabelSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            answers: RwLock::new(HashMap::new()),
        }
    }

    /// Number of memoized neighbourhoods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.read().map_or(0, |answers| answers.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: LabelSource> LabelSource for CachingLabelSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn label(&self, request: &LabelRequest) -> Option<String> {
        let key = request.neighborhood.cache_key();
        if let Ok(answers) = self.answers.read() {
            if let Some(answer) = answers.get(&key) {
                return answer.clone();
            }
        }
        let answer = self.inner.label(request);
        if let Ok(mut answers) = self.answers.write() {
            answers.insert(key, answer.clone());
        }
        answer
    }
}

/// Clean a collaborator's answer; `NONE` and blanks mean no answer.
fn clean_answer(answer: Option<String>) -> Option<String> {
    let answer = normalize_label(&answer?);
    if answer.is_empty() || answer.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(answer)
    }
}

/// The full labeling chain applied to alerts.
pub struct Labeler<'a> {
    heuristic: HeuristicLabeler,
    recovery: Option<&'a dyn LabelSource>,
    recovery_kinds: Vec<RiskKind>,
}

impl<'a> Labeler<'a> {
    #[must_use]
    pub fn new(config: &LabelingConfig) -> Self {
        Self {
            heuristic: HeuristicLabeler::from_config(config),
            recovery: None,
            recovery_kinds: config.recovery_kinds.clone(),
        }
    }

    /// Attach a recovery collaborator. Ignored when recovery is disabled in `config`.
    #[must_use]
    pub fn with_recovery(mut self, config: &LabelingConfig, source: &'a dyn LabelSource) -> Self {
        if config.recovery_enabled {
            self.recovery = Some(source);
        }
        self
    }

    #[must_use]
    pub const fn heuristic(&self) -> &HeuristicLabeler {
        &self.heuristic
    }

    /// Fill `row_label` and `col_label` on every alert.
    pub fn label_alerts(&self, index: &CellIndex, alerts: &mut [RiskAlert]) {
        let mut recovered = 0usize;
        let mut attempts = 0usize;
        for alert in alerts.iter_mut() {
            match self.label_alert(index, alert) {
                Some(true) => {
                    attempts += 1;
                    recovered += 1;
                }
                Some(false) => attempts += 1,
                None => {}
            }
        }
        if attempts > 0 {
            tracing::info!(attempts, recovered, "label recovery finished");
        }
    }

    /// Label one alert. Returns whether recovery was attempted and succeeded.
    fn label_alert(&self, index: &CellIndex, alert: &mut RiskAlert) -> Option<bool> {
        // leftmost member carries the row's item name
        let address = alert.cells.iter().min_by_key(|a| (a.col, a.row)).copied()?;
        let sheet = alert.sheet.clone();

        let row_label = self.heuristic.row_label(index, &sheet, address);
        alert.col_label = self.heuristic.col_label(index, &sheet, address);

        let needs_recovery = row_label.as_deref().map_or(true, is_poor_quality_label)
            && self.recovery_kinds.contains(&alert.kind);
        if !needs_recovery {
            alert.row_label = row_label;
            return None;
        }

        let mut attempted = None;
        let mut label = row_label;
        if let Some(source) = self.recovery {
            let request = LabelRequest {
                kind: alert.kind,
                sheet: sheet.clone(),
                address,
                neighborhood: Neighborhood::collect(index, &sheet, address),
            };
            let answer = clean_answer(source.label(&request));
            tracing::debug!(
                source = source.name(),
                cell = %format!("{sheet}!{address}"),
                recovered = answer.is_some(),
                "label recovery"
            );
            attempted = Some(answer.is_some());
            if answer.is_some() {
                label = answer;
            }
        }
        alert.row_label = label.or_else(|| Some(fallback_label(address.row)));
        attempted
    }
}
