//! Model builder tests: merged regions, dependency edges and input hygiene.

use sheet_audit::builder::ModelBuilder;
use sheet_audit::config::BuilderConfig;
use sheet_audit::model::{BuildIssueKind, CellAddress, CellKey, CellValue, Workbook};

fn key(text: &str) -> CellKey {
    CellKey::parse(text).expect("valid cell key")
}

#[test]
fn references_into_a_merged_region_reach_the_anchor_content() {
    let mut wb = Workbook::new();
    wb.add_sheet("Plan")
        .value("B2", 500.0)
        .merge("B2:D2")
        .formula("C5", "=D2*2");
    let model = ModelBuilder::default().build(&wb).expect("build");

    let d2 = model.get(&key("Plan!D2")).expect("virtual cell");
    assert!(d2.is_virtual());
    assert!(d2.is_merged);
    assert_eq!(d2.anchor, Some(CellAddress::new(2, 2)));
    assert_eq!(d2.value, CellValue::Number(500.0));

    // the formula resolves to a real dependency, not an empty cell
    assert_eq!(model.graph.dependents(&key("Plan!D2")), vec![&key("Plan!C5")]);
    assert_eq!(model.merged_regions("Plan").len(), 1);
    assert_eq!(model.real_cells().count(), 2);
}

#[test]
fn merged_formula_anchor_is_copied_with_its_dependencies() {
    let mut wb = Workbook::new();
    wb.add_sheet("Plan")
        .value("A1", 3.0)
        .formula("B1", "=A1*4")
        .merge("B1:B3");
    let model = ModelBuilder::default().build(&wb).expect("build");

    let b3 = model.get(&key("Plan!B3")).expect("virtual cell");
    assert_eq!(b3.formula.as_deref(), Some("=A1*4"));
    assert_eq!(b3.dependencies, vec![key("Plan!A1")]);
    assert_eq!(model.graph.dependents(&key("Plan!A1")).len(), 3);
}

#[test]
fn cross_sheet_and_range_references_become_edges() {
    let mut wb = Workbook::new();
    wb.add_sheet("Inputs")
        .value("B1", 1.0)
        .value("B2", 2.0)
        .value("B3", 3.0);
    wb.add_sheet("Plan")
        .formula("A1", "=SUM(Inputs!B1:B3)")
        .formula("A2", "='Inputs'!B2+A1");
    let model = ModelBuilder::default().build(&wb).expect("build");

    let mut precedents: Vec<String> = model
        .graph
        .precedents(&key("Plan!A1"))
        .into_iter()
        .map(ToString::to_string)
        .collect();
    precedents.sort();
    assert_eq!(precedents, vec!["Inputs!B1", "Inputs!B2", "Inputs!B3"]);
    assert_eq!(model.graph.precedents(&key("Plan!A2")).len(), 2);
    assert_eq!(model.sheets, vec!["Inputs", "Plan"]);
}

#[test]
fn dynamic_formulas_are_flagged_without_edges() {
    let mut wb = Workbook::new();
    wb.add_sheet("Plan")
        .value("A1", "B")
        .value("B1", 7.0)
        .formula("C1", "=INDIRECT(A1&\"1\")");
    let model = ModelBuilder::default().build(&wb).expect("build");

    let c1 = model.get(&key("Plan!C1")).expect("formula cell");
    assert!(c1.is_dynamic);
    assert!(c1.dependencies.is_empty());
    assert_eq!(model.graph.in_degree(&key("Plan!C1")), 0);
}

#[test]
fn bad_regions_are_skipped_and_recorded() {
    let mut wb = Workbook::new();
    wb.add_sheet("Plan")
        .value("A1", "Title")
        .merge("A1:C1")
        .merge("B1:B4")
        .merge("nonsense");
    let model = ModelBuilder::default().build(&wb).expect("bad regions are not fatal");

    let kinds: Vec<BuildIssueKind> = model.issues.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![BuildIssueKind::OverlappingRegion, BuildIssueKind::MalformedRegion]
    );
    assert!(model.issues[0].to_string().contains("overlaps A1:C1"));
    assert_eq!(model.merged_regions("Plan").len(), 1);
}

#[test]
fn oversize_ranges_are_kept_whole() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Plan");
    for row in 1..=20 {
        sheet.value(&format!("A{row}"), f64::from(row));
    }
    sheet.formula("B1", "=SUM(A1:A20)");
    let builder = ModelBuilder::new(BuilderConfig {
        max_range_expansion: 10,
        ..BuilderConfig::default()
    });
    let model = builder.build(&wb).expect("build");

    let b1 = model.get(&key("Plan!B1")).expect("formula cell");
    assert!(b1.dependencies.is_empty());
    assert_eq!(b1.oversize_ranges, vec!["Plan!A1:A20"]);
}

#[test]
fn identical_workbooks_share_a_content_hash() {
    let build = || {
        let mut wb = Workbook::new();
        wb.add_sheet("Plan").value("A1", 1.0).formula("B1", "=A1+1");
        ModelBuilder::default().build(&wb).expect("build")
    };
    assert_eq!(build().content_hash, build().content_hash);
}
