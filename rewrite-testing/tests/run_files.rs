use std::fs;
use std::path::Path;

use rewrite_testing::sources::{run_files, write_changes};
use rewrite_testing::RunConfig;

const ASSERT_EQUALS: &str = r#"package org.example;

import org.junit.jupiter.api.Test;

import static org.junit.jupiter.api.Assertions.assertEquals;

class CalculatorTest {
    @Test
    void adds() {
        int sum = 1 + 2;
        assertEquals(3, sum, "sum");
    }
}
"#;

const CONVERTED: &str = r#"package org.example;

import org.junit.jupiter.api.Test;

import static org.assertj.core.api.Assertions.assertThat;

class CalculatorTest {
    @Test
    void adds() {
        int sum = 1 + 2;
        assertThat(sum).as("sum").isEqualTo(3);
    }
}
"#;

const UNTOUCHED: &str = r#"package org.example;

class Plain {
    int value() {
        return 1;
    }
}
"#;

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn config(yaml: &str) -> RunConfig {
    RunConfig::from_yaml(yaml).unwrap()
}

#[test]
fn dry_run_reports_diff_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/test/java/org/example/CalculatorTest.java", ASSERT_EQUALS);
    write(root, "src/test/java/org/example/Plain.java", UNTOUCHED);

    let outcome = run_files(&config("recipes: [testing.assertj.JUnitToAssertj]"), &[root.to_path_buf()]).unwrap();

    assert!(outcome.parse_errors.is_empty());
    assert_eq!(outcome.run.results.len(), 2);
    let changed: Vec<_> = outcome.run.changed().collect();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].after.print(), CONVERTED);

    let (diff, stats) = changed[0].diff();
    assert!(diff.contains("-        assertEquals(3, sum, \"sum\");"));
    assert!(diff.contains("+        assertThat(sum).as(\"sum\").isEqualTo(3);"));
    assert_eq!(stats.files_changed, 1);

    let on_disk = fs::read_to_string(root.join("src/test/java/org/example/CalculatorTest.java")).unwrap();
    assert_eq!(on_disk, ASSERT_EQUALS);
}

#[test]
fn apply_writes_only_changed_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/test/java/org/example/CalculatorTest.java", ASSERT_EQUALS);
    write(root, "src/test/java/org/example/Plain.java", UNTOUCHED);

    let outcome = run_files(&config("recipes: [testing.assertj.JUnitToAssertj]"), &[root.to_path_buf()]).unwrap();
    assert_eq!(write_changes(&outcome.run).unwrap(), 1);

    let converted = fs::read_to_string(root.join("src/test/java/org/example/CalculatorTest.java")).unwrap();
    assert_eq!(converted, CONVERTED);
    let plain = fs::read_to_string(root.join("src/test/java/org/example/Plain.java")).unwrap();
    assert_eq!(plain, UNTOUCHED);

    let again = run_files(&config("recipes: [testing.assertj.JUnitToAssertj]"), &[root.to_path_buf()]).unwrap();
    assert_eq!(again.run.changed().count(), 0);
}

#[test]
fn options_and_exclusions_come_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let runner = "import org.junit.runner.RunWith;\nimport org.junit.runners.JUnit4;\n\n@RunWith(JUnit4.class)\nclass ATest {}\n";
    write(root, "src/test/java/ATest.java", runner);
    write(root, "generated/BTest.java", runner);

    let yaml = r#"
recipes: [testing.junit5.RemoveObsoleteRunners]
options:
  testing.junit5.RemoveObsoleteRunners:
    obsoleteRunners: [org.junit.runners.JUnit4]
exclude: ["**/generated/**"]
"#;
    let outcome = run_files(&config(yaml), &[root.to_path_buf()]).unwrap();
    assert_eq!(outcome.run.results.len(), 1);
    assert_eq!(outcome.run.results[0].after.print(), "class ATest {}\n");
}

#[test]
fn missing_required_option_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ATest.java", UNTOUCHED);
    let result = run_files(&config("recipes: [testing.junit5.RemoveObsoleteRunners]"), &[dir.path().to_path_buf()]);
    assert!(result.is_err());
}

#[test]
fn unparsable_file_is_reported_and_others_still_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "Broken.java", "class Broken {\n");
    write(root, "CalculatorTest.java", ASSERT_EQUALS);

    let outcome = run_files(&config("recipes: [testing.assertj.JUnitToAssertj]"), &[root.to_path_buf()]).unwrap();
    assert_eq!(outcome.parse_errors.len(), 1);
    assert!(outcome.parse_errors[0].path.ends_with("Broken.java"));
    assert_eq!(outcome.run.changed().count(), 1);
}
