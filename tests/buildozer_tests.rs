//! Tests for buildozer.spec reading and editing

use libffi_autopatch::buildozer::BuildozerSpec;
use std::fs;
use tempfile::TempDir;

const SPEC: &str = "\
[app]
# (str) Title of your application
title = EchoSoul
package.name = echosoul

# (list) Application requirements
requirements = python3,kivy
# Auto-updated 2024-05-01 12:00:00
requirements = python3,kivy,requests

android.archs = arm64-v8a, armeabi-v7a

[buildozer]
log_level = 2
";

#[test]
fn test_last_occurrence_wins() {
    let spec = BuildozerSpec::parse(SPEC).unwrap();
    assert_eq!(spec.requirements(), vec!["python3", "kivy", "requests"]);
    assert_eq!(spec.archs(), vec!["arm64-v8a", "armeabi-v7a"]);
    assert_eq!(spec.get("buildozer", "log_level").as_deref(), Some("2"));
    assert!(spec.local_recipes().is_none());
}

#[test]
fn test_duplicate_keys_are_reported() {
    let spec = BuildozerSpec::parse(SPEC).unwrap();
    assert_eq!(
        spec.duplicate_keys(),
        vec![("app".to_string(), "requirements".to_string(), 2)]
    );
}

#[test]
fn test_set_collapses_duplicates_and_keeps_comments() {
    let mut spec = BuildozerSpec::parse(SPEC).unwrap();
    spec.set("app", "requirements", "python3,kivy,libffi");

    let text = spec.to_string();
    assert_eq!(text.matches("requirements =").count(), 1);
    assert!(text.contains("# (list) Application requirements\nrequirements = python3,kivy,libffi\n"));
    assert!(text.contains("# Auto-updated 2024-05-01 12:00:00"));
    assert!(spec.duplicate_keys().is_empty());
}

#[test]
fn test_set_new_key_lands_in_its_section() {
    let mut spec = BuildozerSpec::parse(SPEC).unwrap();
    spec.set_local_recipes("./p4a-recipes");

    assert_eq!(spec.local_recipes().as_deref(), Some("./p4a-recipes"));
    let text = spec.to_string();
    let key_at = text.find("p4a.local_recipes").unwrap();
    let buildozer_at = text.find("[buildozer]").unwrap();
    assert!(key_at < buildozer_at);
    assert!(text.ends_with("log_level = 2\n"));
}

#[test]
fn test_set_creates_missing_section() {
    let mut spec = BuildozerSpec::parse("[app]\ntitle = x\n").unwrap();
    spec.set("buildozer", "warn_on_root", "1");

    assert_eq!(
        spec.to_string(),
        "[app]\ntitle = x\n\n[buildozer]\nwarn_on_root = 1\n"
    );
}

#[test]
fn test_continuation_lines() {
    let spec = BuildozerSpec::parse("[app]\nrequirements = python3,\n    kivy,\n    libffi\ntitle = x\n").unwrap();
    assert_eq!(spec.requirements(), vec!["python3", "kivy", "libffi"]);
    assert_eq!(spec.get("app", "title").as_deref(), Some("x"));
}

#[test]
fn test_set_replaces_continuation_block() {
    let mut spec = BuildozerSpec::parse("[app]\nrequirements = python3,\n    kivy\ntitle = x\n").unwrap();
    spec.set("app", "requirements", "python3");
    assert_eq!(spec.to_string(), "[app]\nrequirements = python3\ntitle = x\n");
}

#[test]
fn test_add_requirement_is_idempotent() {
    let mut spec = BuildozerSpec::parse(SPEC).unwrap();
    assert!(spec.add_requirement("libffi"));
    let once = spec.to_string();

    assert!(!spec.add_requirement("libffi"));
    assert_eq!(spec.to_string(), once);
    assert_eq!(spec.requirements().last().map(String::as_str), Some("libffi"));
}

#[test]
fn test_load_and_save_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("buildozer.spec");
    fs::write(&path, SPEC).unwrap();

    let spec = BuildozerSpec::load(&path).unwrap();
    spec.save(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), SPEC);
}

#[test]
fn test_garbage_line_is_rejected() {
    assert!(BuildozerSpec::parse("[app]\nthis is not a key\n").is_err());
}

const LIST_SECTION_SPEC: &str = "\
[app]
title = x
requirements = python3
p4a.url: https://example.org/p4a?ref=develop

[app:source.exclude_patterns]
license
images/*/*.jpg
";

#[test]
fn test_list_section_values() {
    let spec = BuildozerSpec::parse(LIST_SECTION_SPEC).unwrap();
    assert_eq!(
        spec.list_section("app:source.exclude_patterns"),
        vec!["license", "images/*/*.jpg"]
    );
    assert_eq!(spec.requirements(), vec!["python3"]);
}

#[test]
fn test_edits_preserve_list_section() {
    let mut spec = BuildozerSpec::parse(LIST_SECTION_SPEC).unwrap();
    spec.set_local_recipes("./p4a-recipes");
    assert!(spec.add_requirement("libffi"));

    let text = spec.to_string();
    assert!(text.ends_with("[app:source.exclude_patterns]\nlicense\nimages/*/*.jpg\n"));
    let reparsed = BuildozerSpec::parse(&text).unwrap();
    assert_eq!(reparsed.local_recipes().as_deref(), Some("./p4a-recipes"));
    assert_eq!(reparsed.requirements(), vec!["python3", "libffi"]);
}

#[test]
fn test_colon_before_equals_splits_at_colon() {
    let spec = BuildozerSpec::parse(LIST_SECTION_SPEC).unwrap();
    assert_eq!(
        spec.get("app", "p4a.url").as_deref(),
        Some("https://example.org/p4a?ref=develop")
    );
}

#[test]
fn test_multiline_value_is_written_as_continuation() {
    let mut spec = BuildozerSpec::parse("[app]\ntitle = x\n").unwrap();
    spec.set("app", "requirements", "python3,\nkivy");

    assert_eq!(
        spec.to_string(),
        "[app]\ntitle = x\nrequirements = python3,\n    kivy\n"
    );
    assert_eq!(spec.requirements(), vec!["python3", "kivy"]);
    assert_eq!(spec.get("app", "title").as_deref(), Some("x"));
}
