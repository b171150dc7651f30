use std::path::Path;

use pretty_assertions::assert_eq;
use rstest::rstest;
use todo_notes_engine::metadata::keys;
use todo_notes_engine::{
    Completion, CompletionOptions, Detection, DetectionMode, DetectionOptions, MetadataOptions,
    MetadataValue, ParsedDocument, TodoRange, detect_range, detect_todo, extract_metadata,
    plan_completion, split_front_matter,
};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

fn options() -> CompletionOptions {
    let mut options = CompletionOptions::new("/ws", "/ws/journal");
    options.completed_date = Some("2024-05-10".to_string());
    options
}

#[rstest]
#[case(DetectionMode::Strict, 2, Some((2, 10)))]
#[case(DetectionMode::NextTodo, 2, Some((2, 10)))]
#[case(DetectionMode::Strict, 7, Some((2, 10)))]
#[case(DetectionMode::Strict, 11, Some((11, 13)))]
#[case(DetectionMode::NextTodo, 12, Some((11, 13)))]
#[case(DetectionMode::NextTodo, 13, Some((13, 13)))]
#[case(DetectionMode::NextTodo, 14, None)]
#[case(DetectionMode::NextTodo, 0, None)]
fn detects_ranges_in_fixture(
    #[case] mode: DetectionMode,
    #[case] cursor_line: usize,
    #[case] expected: Option<(usize, usize)>,
) {
    let text = fixture("weekly");
    let doc = ParsedDocument::parse(&text).unwrap();
    let range = detect_range(
        doc.flattened(),
        cursor_line + 1,
        doc.source(),
        &DetectionOptions::with_mode(mode),
    );
    assert_eq!(
        range.map(|range| (range.start_line, range.end_line)),
        expected
    );
}

#[test]
fn reports_child_completion_and_checked_todos() {
    let text = fixture("weekly");
    let doc = ParsedDocument::parse(&text).unwrap();
    let options = DetectionOptions::default();

    let report = detect_todo(doc.flattened(), 3, doc.source(), &options)
        .found()
        .unwrap();
    assert!(report.is_child_todo_completed);

    let trip = detect_todo(doc.flattened(), 12, doc.source(), &options)
        .found()
        .unwrap();
    assert!(!trip.is_child_todo_completed);

    assert_eq!(
        detect_todo(doc.flattened(), 15, doc.source(), &options),
        Detection::AlreadyCompleted
    );
}

#[test]
fn extracts_metadata_lines_from_range() {
    let text = fixture("weekly");
    let doc = ParsedDocument::parse(&text).unwrap();
    let range = TodoRange {
        start_line: 2,
        start_char: 0,
        end_line: 10,
        end_char: 21,
    };

    let extracted = extract_metadata(doc.flattened(), &range, &MetadataOptions::default()).unwrap();
    assert_eq!(extracted.consumed_lines, vec![4, 5]);
    assert_eq!(
        extracted.record.get(keys::TAGS),
        Some(&MetadataValue::List(vec![
            "work".to_string(),
            "reporting".to_string()
        ]))
    );
    assert_eq!(extracted.record.text(keys::FOLDER_PATH), Some("reports"));
}

#[test]
fn completes_todo_into_note() {
    let text = fixture("weekly");
    let Completion::Planned(plan) = plan_completion(&text, 2, &options()).unwrap() else {
        panic!("expected a completion plan");
    };

    let note = plan.note.as_ref().unwrap();
    assert_eq!(
        note.path(Path::new("/ws")),
        Path::new("/ws/reports/Quarterly report.md")
    );
    assert_eq!(
        note.body,
        "Numbers are in ![chart](../journal/img/q2.png).\n\n- [x] collect data\n- [x] draft summary"
    );

    // The note's front matter decodes back to the todo's metadata
    let (front, rest) = split_front_matter(&note.text, &MetadataOptions::default().keys).unwrap();
    assert_eq!(front.as_ref(), Some(&note.metadata));
    assert!(rest.starts_with("# Quarterly report\n"));

    insta::assert_snapshot!(plan.apply(&text), @r"
    # Week 19

    - [x] Quarterly report
    - [ ] Plan trip
      - book flights
      - [ ] pick hotel
    - [x] Pay rent
    ");
}

#[test]
fn completing_twice_is_a_no_op() {
    let text = fixture("weekly");
    let Completion::Planned(plan) = plan_completion(&text, 11, &options()).unwrap() else {
        panic!("expected a completion plan");
    };
    let updated = plan.apply(&text);
    assert_eq!(
        plan_completion(&updated, 11, &options()).unwrap(),
        Completion::AlreadyCompleted
    );
}
