//! Deterministic report rendering.
//!
//! Output depends only on the [`ReportDocument`]; nothing here reads the clock,
//! so rendering the same records twice yields identical bytes.

#![allow(missing_docs)]

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::ReportFormat;
use crate::core::errors::Result;
use crate::report::record::{ArtifactPayload, TestCaseRecord, TestStatus};

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Totals {
    #[must_use]
    pub fn tally(records: &[TestCaseRecord]) -> Self {
        let mut totals = Self {
            total: records.len(),
            ..Self::default()
        };
        for rec in records {
            match rec.status {
                TestStatus::Passed => totals.passed += 1,
                TestStatus::Failed => totals.failed += 1,
                TestStatus::Skipped => totals.skipped += 1,
                TestStatus::Created => {}
            }
        }
        totals
    }
}

/// Everything persisted for one suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Suite identifier as supplied by the runner.
    pub suite: String,
    /// Sanitised key used for paths.
    pub key: String,
    pub run_started_at: DateTime<Utc>,
    pub totals: Totals,
    /// Sorted by `(started_at, test_id)`.
    pub records: Vec<TestCaseRecord>,
}

impl ReportDocument {
    /// Build a document, sorting records into their stable report order.
    #[must_use]
    pub fn new(
        suite: impl Into<String>,
        key: impl Into<String>,
        run_started_at: DateTime<Utc>,
        mut records: Vec<TestCaseRecord>,
    ) -> Self {
        records.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.test_id.cmp(&b.test_id))
        });
        Self {
            suite: suite.into(),
            key: key.into(),
            run_started_at,
            totals: Totals::tally(&records),
            records,
        }
    }
}

/// Render `doc` in `format`. `base_dir` is the report's directory; file
/// artifacts below it are linked relatively.
pub fn render(doc: &ReportDocument, format: ReportFormat, base_dir: &Path) -> Result<String> {
    match format {
        ReportFormat::Json => {
            let mut out = serde_json::to_string_pretty(doc)?;
            out.push('\n');
            Ok(out)
        }
        ReportFormat::Html => Ok(render_html(doc, base_dir)),
    }
}

fn render_html(doc: &ReportDocument, base_dir: &Path) -> String {
    let mut out = String::with_capacity(4096 + doc.records.len() * 512);
    let title = escape_html(&doc.suite);
    let t = doc.totals;

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>Test report: {title}</title>");
    out.push_str(STYLE);
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{title}</h1>");
    let _ = writeln!(
        out,
        "<p class=\"meta\">run started {} &middot; {} tests: {} passed, {} failed, {} skipped</p>",
        fmt_ts(&doc.run_started_at),
        t.total,
        t.passed,
        t.failed,
        t.skipped
    );

    for rec in &doc.records {
        let _ = writeln!(
            out,
            "<section class=\"test {}\" id=\"{}\">",
            rec.status,
            escape_html(&rec.test_id)
        );
        let _ = writeln!(
            out,
            "<h2>{} <span class=\"status\">{}</span></h2>",
            escape_html(&rec.test_id),
            rec.status.label()
        );
        let _ = writeln!(
            out,
            "<p class=\"desc\">{}</p>",
            escape_html(&rec.description)
        );
        let _ = write!(out, "<p class=\"meta\">started {}", fmt_ts(&rec.started_at));
        if let Some(ms) = rec.duration_ms() {
            let _ = write!(out, " &middot; {ms} ms");
        }
        out.push_str("</p>\n");

        if !rec.logs.is_empty() {
            out.push_str("<table class=\"log\">\n");
            for entry in &rec.logs {
                let _ = writeln!(
                    out,
                    "<tr class=\"{sev}\"><td>{}</td><td>{sev}</td><td>{}</td></tr>",
                    fmt_ts(&entry.ts),
                    escape_html(&entry.message),
                    sev = entry.severity.as_str(),
                );
            }
            out.push_str("</table>\n");
        }

        for artifact in &rec.artifacts {
            let label = escape_html(&artifact.label);
            match &artifact.payload {
                ArtifactPayload::File { path } => {
                    let href = path.strip_prefix(base_dir).unwrap_or(path);
                    let href = escape_html(&href.to_string_lossy().replace('\\', "/"));
                    let _ = writeln!(
                        out,
                        "<figure><a href=\"{href}\"><img src=\"{href}\" alt=\"{label}\"></a><figcaption>{label}</figcaption></figure>"
                    );
                }
                ArtifactPayload::Inline { media_type, base64 } => {
                    let _ = writeln!(
                        out,
                        "<figure><img src=\"data:{};base64,{base64}\" alt=\"{label}\"><figcaption>{label}</figcaption></figure>",
                        escape_html(media_type)
                    );
                }
            }
        }
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

const STYLE: &str = "<style>\n\
body{font-family:sans-serif;margin:2em}\n\
.test{border-left:4px solid #999;padding:0 1em;margin:1em 0}\n\
.passed{border-color:#2e7d32}.failed{border-color:#c62828}.skipped{border-color:#f9a825}\n\
.meta{color:#666;font-size:.9em}\n\
table.log td{padding:2px 8px;vertical-align:top}\n\
tr.fail td,tr.warning td{color:#c62828}\n\
figure img{max-width:480px;border:1px solid #ccc}\n\
</style>\n";

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Escape text for HTML element content and attribute values.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::record::{Artifact, ArtifactKind, Severity};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn rec(id: &str, secs: i64, status: TestStatus) -> TestCaseRecord {
        let mut r = TestCaseRecord::started_at(id, "Cart", format!("UI test: {id}"), at(secs));
        if status.is_terminal() {
            r.finish(status).unwrap();
        }
        r
    }

    #[test]
    fn document_sorts_by_start_then_id() {
        let doc = ReportDocument::new(
            "Cart",
            "Cart",
            at(0),
            vec![
                rec("b", 5, TestStatus::Passed),
                rec("a", 5, TestStatus::Failed),
                rec("z", 1, TestStatus::Skipped),
            ],
        );
        let ids: Vec<&str> = doc.records.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, ["z", "a", "b"]);
        assert_eq!(
            doc.totals,
            Totals {
                total: 3,
                passed: 1,
                failed: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn html_escapes_user_text() {
        let mut r = rec("x<y>", 0, TestStatus::Failed);
        r.log(Severity::Fail, "expected \"a\" & got <b>");
        let doc = ReportDocument::new("S&P", "S_P", at(0), vec![r]);
        let html = render(&doc, ReportFormat::Html, Path::new("/out")).unwrap();
        assert!(html.contains("S&amp;P"));
        assert!(html.contains("x&lt;y&gt;"));
        assert!(html.contains("expected &quot;a&quot; &amp; got &lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn html_links_file_artifacts_relative_to_report() {
        let mut r = rec("Checkout", 0, TestStatus::Failed);
        r.artifacts.push(Artifact {
            kind: ArtifactKind::Screenshot,
            label: "Checkout_FAILED".into(),
            payload: ArtifactPayload::File {
                path: PathBuf::from("/out/screenshots/Cart/Checkout_FAILED_1.png"),
            },
            sha256: String::new(),
            size_bytes: 3,
            captured_at: at(1),
        });
        let doc = ReportDocument::new("Cart", "Cart", at(0), vec![r]);
        let html = render(&doc, ReportFormat::Html, Path::new("/out")).unwrap();
        assert!(html.contains("href=\"screenshots/Cart/Checkout_FAILED_1.png\""));
    }

    #[test]
    fn html_embeds_inline_artifacts() {
        let mut r = rec("Checkout", 0, TestStatus::Failed);
        r.artifacts.push(Artifact {
            kind: ArtifactKind::Screenshot,
            label: "Checkout_FAILED".into(),
            payload: ArtifactPayload::Inline {
                media_type: "image/png".into(),
                base64: "AAEC".into(),
            },
            sha256: String::new(),
            size_bytes: 3,
            captured_at: at(1),
        });
        let doc = ReportDocument::new("Cart", "Cart", at(0), vec![r]);
        let html = render(&doc, ReportFormat::Html, Path::new("/out")).unwrap();
        assert!(html.contains("src=\"data:image/png;base64,AAEC\""));
    }

    #[test]
    fn rendering_is_deterministic() {
        let records = vec![rec("a", 0, TestStatus::Passed), rec("b", 1, TestStatus::Failed)];
        let doc = ReportDocument::new("Cart", "Cart", at(0), records);
        for format in [ReportFormat::Html, ReportFormat::Json] {
            let first = render(&doc, format, Path::new("/out")).unwrap();
            let second = render(&doc, format, Path::new("/out")).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn json_parses_back_into_document() {
        let doc = ReportDocument::new("Cart", "Cart", at(0), vec![rec("a", 0, TestStatus::Passed)]);
        let json = render(&doc, ReportFormat::Json, Path::new("/out")).unwrap();
        let parsed: ReportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.totals.passed, 1);
        assert_eq!(parsed.records[0].test_id, "a");
    }
}
