//! Index manifest parsing tests for `tracker-core` types.
//!
//! Each `#[case]` is isolated: no shared state.

use rstest::rstest;
use tracker_core::types::{Index, PackageKey};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const MINIMAL: &str = "apiVersion: v1\nentries: {}\n";

const TWO_PACKAGES: &str = r#"
apiVersion: v1
generated: "2024-01-02T03:04:05Z"
entries:
  redis:
    - name: redis
      version: 7.2.0
      digest: r2
    - name: redis
      version: 7.1.0
      digest: r1
  nginx:
    - name: nginx
      version: 1.0.0
      digest: n1
      created: "2023-12-01T00:00:00Z"
"#;

const UNICODE: &str = r#"
apiVersion: v1
entries:
  アプリ:
    - name: アプリ
      version: 0.1.0
      digest: "ダイジェスト"
      description: "日本語・한국어・العربية"
"#;

const UNKNOWN_FIELDS: &str = r#"
apiVersion: v1
serverInfo:
  contextPath: /charts
entries:
  app:
    - name: app
      version: 1.0.0
      digest: d
      apiVersion: v2
      type: application
      maintainers:
        - name: someone
"#;

// ---------------------------------------------------------------------------
// Parameterised parsing test
// ---------------------------------------------------------------------------

#[rstest]
#[case("minimal", MINIMAL, 0, 0)]
#[case("two_packages", TWO_PACKAGES, 2, 3)]
#[case("unicode_strings", UNICODE, 1, 1)]
#[case("unknown_fields_ignored", UNKNOWN_FIELDS, 1, 1)]
fn index_parses(
    #[case] label: &str,
    #[case] yaml: &str,
    #[case] packages: usize,
    #[case] versions: usize,
) {
    let index: Index =
        serde_yaml::from_str(yaml).unwrap_or_else(|e| panic!("[{label}] parse failed: {e}"));
    assert_eq!(index.entries.len(), packages, "[{label}] package count");
    assert_eq!(index.version_count(), versions, "[{label}] version count");
}

#[test]
fn version_order_within_package_is_preserved() {
    let index: Index = serde_yaml::from_str(TWO_PACKAGES).expect("parse");
    let versions: Vec<&str> = index.entries["redis"]
        .iter()
        .map(|v| v.version.as_str())
        .collect();
    assert_eq!(versions, vec!["7.2.0", "7.1.0"]);
}

#[test]
fn package_order_is_by_name() {
    let index: Index = serde_yaml::from_str(TWO_PACKAGES).expect("parse");
    let names: Vec<&str> = index.entries.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["nginx", "redis"]);
}

#[test]
fn generated_timestamp_is_parsed() {
    let index: Index = serde_yaml::from_str(TWO_PACKAGES).expect("parse");
    assert!(index.generated.is_some());
    assert_eq!(
        index.entries["nginx"][0].key(),
        PackageKey::new("nginx", "1.0.0")
    );
}
