//! Hash domain governance lock tests.
//!
//! Proves:
//! 1. The domain set has the expected size (catches a domain added without review)
//! 2. Domain bytes are unique, null-terminated and named `ARBOR::*::V1\0`
//! 3. The same payload hashed under two domains gives two digests
//! 4. No raw `ARBOR::` domain literal appears in production source outside
//!    `hash_domain.rs`

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use arbor_kernel::audit::hash::canonical_hash;
use arbor_kernel::audit::hash_domain::HashDomain;

#[test]
fn domain_set_count() {
    assert_eq!(
        HashDomain::ALL.len(),
        4,
        "if you added a domain, update this count"
    );
}

#[test]
fn domain_bytes_follow_convention() {
    let mut seen = BTreeSet::new();
    for domain in HashDomain::ALL {
        let bytes = domain.as_bytes();
        assert!(seen.insert(bytes), "duplicate domain bytes: {domain}");
        assert!(bytes.starts_with(b"ARBOR::"), "{domain} lacks the ARBOR:: prefix");
        assert!(bytes.ends_with(b"::V1\0"), "{domain} does not end with ::V1\\0");
        assert_eq!(
            bytes.iter().filter(|&&b| b == 0).count(),
            1,
            "{domain} has an interior null"
        );
    }
}

#[test]
fn domains_separate_identical_payloads() {
    let payload = br#"{"events":[]}"#;
    let digests: BTreeSet<String> = HashDomain::ALL
        .iter()
        .map(|&d| canonical_hash(d, payload).to_string())
        .collect();
    assert_eq!(digests.len(), HashDomain::ALL.len());
    assert!(digests.iter().all(|d| d.starts_with("sha256:") && d.len() == 7 + 64));
}

#[test]
fn no_raw_domain_literals_outside_hash_domain() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let pattern = "b\"ARBOR::";
    let mut violations = Vec::new();
    let mut scanned = 0;

    for dir in ["kernel/src", "search/src", "harness/src"] {
        for file in rust_files(&root.join(dir)) {
            if file.file_name().and_then(|n| n.to_str()) == Some("hash_domain.rs") {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };
            scanned += 1;
            for (i, line) in production_lines(&content) {
                if line.contains(pattern) {
                    violations.push(format!("  {}:{}: {}", file.display(), i + 1, line.trim()));
                }
            }
        }
    }

    assert!(scanned > 10, "source tree not found under {}", root.display());
    assert!(
        violations.is_empty(),
        "raw ARBOR:: domain literals outside hash_domain.rs:\n{}",
        violations.join("\n")
    );
}

/// Lines outside `#[cfg(test)]` blocks and line comments, with their index.
fn production_lines(content: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut depth: usize = 0;
    let mut test_block: Option<usize> = None;
    let mut cfg_test = false;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]") {
            cfg_test = true;
            continue;
        }
        let opens = line.matches('{').count();
        let closes = line.matches('}').count();
        if cfg_test && opens > 0 {
            test_block = Some(depth);
            cfg_test = false;
        }
        depth = (depth + opens).saturating_sub(closes);

        if let Some(outer) = test_block {
            if depth <= outer {
                test_block = None;
            }
            continue;
        }
        if !trimmed.starts_with("//") {
            out.push((i, line));
        }
    }
    out
}

fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().is_some_and(|e| e == "rs") {
            files.push(path);
        }
    }
    files
}
