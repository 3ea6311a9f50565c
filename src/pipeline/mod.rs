//! End-to-end analysis: build → detect → impact → compress → label → triage →
//! score, plus version comparison of two analyses.

mod cache;

pub use cache::{AnalysisCache, AnalysisCacheKey, CacheStats};

use crate::builder::ModelBuilder;
use crate::config::{AuditConfig, MatchingConfig};
use crate::diff::{DiffEngine, DiffResult, DiffSide};
use crate::error::Result;
use crate::model::{SpreadsheetModel, Workbook};
use crate::risk::{HeuristicLabeler, LabelSource, RiskEngine, RiskReport};
use crate::trace::{literal_impacts, DependencyTracer, LiteralImpact};
use std::sync::Arc;

/// Everything produced by analyzing one workbook.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub model: SpreadsheetModel,
    pub report: RiskReport,
    /// Literal impact profiles, highest combined score first
    pub impacts: Vec<LiteralImpact>,
}

impl Analysis {
    /// Tracer over this analysis' model.
    #[must_use]
    pub fn tracer<'a>(&'a self, labels: &'a HeuristicLabeler) -> DependencyTracer<'a> {
        DependencyTracer::new(&self.model, labels)
    }

    #[must_use]
    pub const fn health_score(&self) -> u32 {
        self.report.health_score
    }
}

/// Analyze a workbook with local labeling only.
///
/// # Errors
///
/// Fails when the model cannot be built (empty workbook, cell cap or
/// timeout). Detector failures do not fail the run; they mark the report
/// partial.
pub fn analyze(workbook: &Workbook, config: &AuditConfig) -> Result<Analysis> {
    analyze_with_labeler(workbook, config, None)
}

/// Analyze a workbook, consulting `recovery` for labels local heuristics miss.
pub fn analyze_with_labeler(
    workbook: &Workbook,
    config: &AuditConfig,
    recovery: Option<&dyn LabelSource>,
) -> Result<Analysis> {
    let model = ModelBuilder::new(config.builder.clone()).build(workbook)?;
    let report = RiskEngine::new().analyze(&model, config, recovery);
    let impacts = literal_impacts(&model, &config.detection, &config.impact);
    Ok(Analysis {
        model,
        report,
        impacts,
    })
}

/// Analyze through `cache` when caching is enabled.
///
/// Results are identical to [`analyze`]; the cache only skips repeated work
/// for an unchanged workbook under an unchanged configuration.
pub fn analyze_cached(
    workbook: &Workbook,
    config: &AuditConfig,
    cache: &AnalysisCache,
) -> Result<Arc<Analysis>> {
    if !config.cache.enabled {
        return analyze(workbook, config).map(Arc::new);
    }
    let key = AnalysisCacheKey::new(workbook, config);
    if let Some(hit) = cache.get(&key) {
        tracing::debug!(workbook_hash = key.workbook_hash, "analysis cache hit");
        return Ok(hit);
    }
    let analysis = Arc::new(analyze(workbook, config)?);
    cache.put(key, Arc::clone(&analysis));
    Ok(analysis)
}

/// Compare two analyses of successive versions of a workbook.
///
/// # Errors
///
/// See [`DiffEngine::compare`].
pub fn compare(old: &Analysis, new: &Analysis, config: &MatchingConfig) -> Result<DiffResult> {
    DiffEngine::new(config.clone()).compare(
        &DiffSide::new(&old.model, &old.report),
        &DiffSide::new(&new.model, &new.report),
    )
}
