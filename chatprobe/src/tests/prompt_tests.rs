use crate::prompts::{load_prompts, parse_delimited_prompts, parse_json_prompts, read_prompts};
use crate::AutomationError;
use std::io::Write;

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_three_prompts_and_a_blank_line() {
    let file = write_temp(
        ".csv",
        "  I feel lonely  \nI can't stop worrying\n\n   Nobody listens to me\n",
    );

    let prompts = read_prompts(file.path()).unwrap();

    let texts: Vec<&str> = prompts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["I feel lonely", "I can't stop worrying", "Nobody listens to me"]
    );
}

#[test]
fn test_only_first_field_is_used_and_quotes_are_honoured() {
    let raw = "text,emotion\n\"Hello, is anyone there?\",sad\n\"She said \"\"hi\"\"\",neutral\r\nplain,x,y\n";

    let prompts = parse_delimited_prompts(raw, b',').unwrap();

    let texts: Vec<&str> = prompts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Hello, is anyone there?", "She said \"hi\"", "plain"]
    );
}

#[test]
fn test_quoted_field_may_span_lines() {
    let prompts = parse_delimited_prompts("\"line one\nline two\"\nnext\n", b',').unwrap();

    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0].text, "line one\nline two");
}

#[test]
fn test_json_prompts_with_metadata() {
    let raw = r#"[
        {"text": "I am scared", "emotion": "fear", "id": 7, "risk_level": "high"},
        {"text": "   "},
        {"text": " Just checking in ", "id": "p-2", "risk_level": 1}
    ]"#;

    let prompts = parse_json_prompts(raw).unwrap();

    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0].emotion.as_deref(), Some("fear"));
    assert_eq!(prompts[0].id.as_deref(), Some("7"));
    assert_eq!(prompts[1].text, "Just checking in");
    assert_eq!(prompts[1].risk_level.as_deref(), Some("1"));
}

#[test]
fn test_json_file_is_detected_by_extension() {
    let file = write_temp(".json", r#"[{"text": "one"}, {"text": "two"}]"#);

    let prompts = read_prompts(file.path()).unwrap();

    assert_eq!(prompts.len(), 2);
}

#[test]
fn test_missing_file_is_lenient_by_default() {
    let prompts = load_prompts("/definitely/not/here.csv", false).unwrap();
    assert!(prompts.is_empty());
}

#[test]
fn test_missing_file_fails_in_strict_mode() {
    let result = load_prompts("/definitely/not/here.csv", true);
    assert!(matches!(result, Err(AutomationError::InputLoadFailed(_))));
}

#[test]
fn test_malformed_json_is_an_input_error() {
    let file = write_temp(".json", "{ not json");

    assert!(matches!(
        read_prompts(file.path()),
        Err(AutomationError::InputLoadFailed(_))
    ));
    assert!(load_prompts(file.path(), false).unwrap().is_empty());
}

#[test]
fn test_stray_quotes_stay_inside_their_record() {
    let prompts = parse_delimited_prompts(
        "I'm 5'10\" tall and hate it\nsecond prompt\nthird prompt\n",
        b',',
    )
    .unwrap();

    let texts: Vec<&str> = prompts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["I'm 5'10\" tall and hate it", "second prompt", "third prompt"]
    );
}

#[test]
fn test_mid_field_quotes_are_kept_literally() {
    let prompts = parse_delimited_prompts("He said \"hi\" to me\n", b',').unwrap();

    assert_eq!(prompts[0].text, "He said \"hi\" to me");
}

#[test]
fn test_single_column_first_row_is_a_prompt_not_a_header() {
    let prompts = parse_delimited_prompts("Prompt\nsecond\n", b',').unwrap();

    let texts: Vec<&str> = prompts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["Prompt", "second"]);
}

#[test]
fn test_known_header_row_is_skipped() {
    let prompts =
        parse_delimited_prompts("text\temotion\trisk_level\nI feel stuck\tsad\tlow\n", b'\t')
            .unwrap();

    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].text, "I feel stuck");
}

#[test]
fn test_first_row_with_free_text_columns_is_kept() {
    let prompts = parse_delimited_prompts("Text,me back please\nnext\n", b',').unwrap();

    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0].text, "Text");
}

#[test]
fn test_tsv_file_is_detected_by_extension() {
    let file = write_temp(".tsv", "a, with comma\tjoy\nb\n");

    let prompts = read_prompts(file.path()).unwrap();

    assert_eq!(prompts[0].text, "a, with comma");
    assert_eq!(prompts.len(), 2);
}
