//! Integration tests for application lint

use app_canvas::layout::{check, LintCategory};
use app_canvas::AppPayload;

fn load(source: &str) -> AppPayload {
    serde_json::from_str(source).expect("Should parse fixture")
}

#[test]
fn test_true_positives_all_categories() {
    let app = load(include_str!("lint-fixtures/true-positives.json"));
    let warnings = check(&app);

    let categories: Vec<LintCategory> = warnings.iter().map(|w| w.category).collect();
    assert!(categories.contains(&LintCategory::Overlap), "got: {:?}", categories);
    assert!(categories.contains(&LintCategory::DuplicateId), "got: {:?}", categories);
    assert!(
        categories.contains(&LintCategory::DanglingReference),
        "got: {:?}",
        categories
    );

    let rendered = warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    insta::assert_snapshot!(rendered, @r#"
    [overlap] "a" at (0, 0) 4x6 overlaps "b" at (2, 3) 4x6 in page "home"
    [duplicate-id] "b" in globals was already used in page "home"
    [dangling-reference] "c" in page "home" has an event action targeting missing widget "ghost"
    "#);
}

#[test]
fn test_true_negatives_clean() {
    let app = load(include_str!("lint-fixtures/true-negatives.json"));
    let warnings = check(&app);
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
}

#[test]
fn test_global_regions_are_separate_grids() {
    // Header and sidebar both sit at (0, 0) but on different grids
    let app = load(include_str!("lint-fixtures/true-negatives.json"));
    assert!(app.globals.len() >= 2);
    assert!(check(&app)
        .iter()
        .all(|w| w.category != LintCategory::Overlap));
}
