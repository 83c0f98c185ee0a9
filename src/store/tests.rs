// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::thread;
use tempfile::TempDir;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Sample {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    entries: BTreeMap<String, u32>,
}

fn sample_doc(dir: &TempDir) -> YamlDocument<Sample> {
    YamlDocument::open(dir.path().join("nested/sample.yaml"), "\n").unwrap()
}

#[test]
fn test_open_creates_directory_and_placeholder() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);

    assert!(doc.path().exists());
    assert_eq!(fs::read_to_string(doc.path()).unwrap(), "\n");
    assert_eq!(doc.read().unwrap(), Sample::default());
}

#[test]
fn test_open_keeps_existing_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.yaml");
    fs::write(&path, "entries:\n  a: 1\n").unwrap();

    let doc: YamlDocument<Sample> = YamlDocument::open(&path, "").unwrap();
    assert_eq!(doc.read().unwrap().entries.get("a"), Some(&1));
}

#[test]
fn test_read_missing_file_defaults() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);
    fs::remove_file(doc.path()).unwrap();

    assert_eq!(doc.read().unwrap(), Sample::default());
}

#[test]
fn test_read_null_and_comment_only_documents_default() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);

    fs::write(doc.path(), "~\n").unwrap();
    assert_eq!(doc.read().unwrap(), Sample::default());

    fs::write(doc.path(), "# managed by tpm\n").unwrap();
    assert_eq!(doc.read().unwrap(), Sample::default());

    fs::write(doc.path(), "   \n\t\n").unwrap();
    assert_eq!(doc.read().unwrap(), Sample::default());
}

#[test]
fn test_read_malformed_document_is_an_error() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);
    fs::write(doc.path(), "entries: [unterminated\n").unwrap();

    match doc.read() {
        Err(StoreError::Malformed { path, .. }) => assert_eq!(path, doc.path()),
        other => panic!("Expected Malformed error, got {other:?}"),
    }
}

#[test]
fn test_read_wrong_shape_is_an_error() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);
    fs::write(doc.path(), "entries:\n  a: not-a-number\n").unwrap();

    assert!(matches!(doc.read(), Err(StoreError::Malformed { .. })));
}

#[test]
fn test_write_then_read() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);

    let mut value = Sample::default();
    value.entries.insert("b".into(), 2);
    value.entries.insert("a".into(), 1);
    doc.write(&value).unwrap();

    assert_eq!(doc.read().unwrap(), value);
    assert_eq!(fs::read_to_string(doc.path()).unwrap(), "entries:\n  a: 1\n  b: 2\n");
}

#[test]
fn test_write_leaves_no_temporary_files() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);

    for i in 0..5 {
        doc.update(|value| {
            value.entries.insert(format!("k{i}"), i);
        })
        .unwrap();
    }

    let names: Vec<_> = fs::read_dir(doc.path().parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["sample.yaml"]);
}

#[cfg(unix)]
#[test]
fn test_written_documents_are_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);
    doc.write(&Sample::default()).unwrap();

    let mode = fs::metadata(doc.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, DOCUMENT_MODE);
}

#[test]
fn test_update_if_skips_write_when_unchanged() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);

    let changed = doc.update_if(|value| value.entries.remove("missing").is_some()).unwrap();

    assert!(!changed);
    assert_eq!(fs::read_to_string(doc.path()).unwrap(), "\n");
}

#[test]
fn test_update_returns_closure_value() {
    let dir = TempDir::new().unwrap();
    let doc = sample_doc(&dir);

    let previous = doc.update(|value| value.entries.insert("a".into(), 1)).unwrap();
    assert_eq!(previous, None);

    let previous = doc.update(|value| value.entries.insert("a".into(), 2)).unwrap();
    assert_eq!(previous, Some(1));
}

#[test]
fn test_concurrent_updates_from_separate_handles_are_not_lost() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.yaml");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let doc: YamlDocument<Sample> = YamlDocument::open(&path, "").unwrap();
            thread::spawn(move || {
                for j in 0..10 {
                    doc.update(|value| {
                        value.entries.insert(format!("writer{i}-{j}"), j);
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let doc: YamlDocument<Sample> = YamlDocument::open(&path, "").unwrap();
    assert_eq!(doc.read().unwrap().entries.len(), 80);
}

#[test]
fn test_ensure_safe_segment() {
    for name in ["letsencrypt", "le-staging", "resolver_1", "a.b"] {
        assert!(ensure_safe_segment("resolver", name).is_ok(), "{name} should be accepted");
    }

    for name in ["", "..", ".hidden", "a/b", "a\\b", "../../etc/passwd", "name with space"] {
        assert!(
            matches!(ensure_safe_segment("resolver", name), Err(StoreError::InvalidName { .. })),
            "{name:?} should be rejected"
        );
    }
}
