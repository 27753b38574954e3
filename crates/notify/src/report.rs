//! Alert report content shared by all channels.

use chrono::{DateTime, Utc};

use costwatch_source::WorkflowCostRecord;

/// One batched alert covering every newly-detected high-cost workflow.
///
/// Channels render the same report; only the markup differs. Records are
/// held in descending cost order for presentation.
#[derive(Debug, Clone)]
pub struct AlertReport {
    records: Vec<WorkflowCostRecord>,
    generated_at: DateTime<Utc>,
}

impl AlertReport {
    /// Build a report over the given records.
    #[must_use]
    pub fn new(mut records: Vec<WorkflowCostRecord>, generated_at: DateTime<Utc>) -> Self {
        records.sort_by(|a, b| {
            b.cost
                .partial_cmp(&a.cost)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.workflow_id.cmp(&b.workflow_id))
        });
        Self {
            records,
            generated_at,
        }
    }

    /// The reported records, most expensive first.
    #[must_use]
    pub fn records(&self) -> &[WorkflowCostRecord] {
        &self.records
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// When this report was generated.
    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Highest cost among the reported records.
    #[must_use]
    pub fn max_cost(&self) -> f64 {
        self.records.first().map_or(0.0, |r| r.cost)
    }

    /// Subject line shared by all channels.
    #[must_use]
    pub fn subject(&self) -> String {
        format!(
            "Workflow billing alert: max cost ${:.2} ({} workflow{})",
            self.max_cost(),
            self.len(),
            if self.len() == 1 { "" } else { "s" }
        )
    }

    /// Monospace table of every record.
    #[must_use]
    pub fn text_table(&self) -> String {
        let header = [
            "workspace",
            "submission",
            "workflow id",
            "submitter",
            "status",
            "cost",
            "submitted",
        ];

        let rows: Vec<[String; 7]> = self
            .records
            .iter()
            .map(|r| {
                [
                    r.workspace.clone(),
                    r.submission_name.clone(),
                    r.workflow_id.clone(),
                    r.submitter.clone(),
                    r.status.to_string(),
                    format!("${:.2}", r.cost),
                    format_time(r.submit_time),
                ]
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.len());
            }
        }

        let render = |cells: &[&str]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = render(&header);
        out.push('\n');
        out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            out.push('\n');
            out.push_str(&render(&cells));
        }
        out
    }

    /// Plain-text body for email channels.
    #[must_use]
    pub fn text_body(&self) -> String {
        format!(
            "{}\n\n{}\n\nGenerated at {}\n",
            self.subject(),
            self.text_table(),
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    /// HTML body for email channels, rendering every record field.
    #[must_use]
    pub fn html_body(&self) -> String {
        let mut rows = String::new();
        for r in &self.records {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td>{}</td><td>{}</td><td>${:.2}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&r.namespace),
                escape_html(&r.workspace),
                escape_html(&r.submission_id),
                escape_html(&r.workflow_id),
                escape_html(&r.submission_name),
                escape_html(&r.submitter),
                escape_html(r.status.as_str()),
                r.cost,
                format_time(r.submit_time),
                format_time(r.start_time),
                format_time(r.end_time),
            ));
        }

        format!(
            r#"<html>
<head>
<style>
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; }}
  h2 {{ color: #e74c3c; }}
  table {{ border-collapse: collapse; }}
  th, td {{ border: 1px solid #d1d5db; padding: 4px 8px; text-align: left; font-size: 13px; }}
  th {{ background: #f3f4f6; }}
  .footer {{ color: #6b7280; font-size: 12px; margin-top: 16px; }}
</style>
</head>
<body>
<h2>{subject}</h2>
<table>
<tr><th>namespace</th><th>workspace</th><th>submission id</th><th>workflow id</th>
<th>submission</th><th>submitter</th><th>status</th><th>cost</th>
<th>submitted</th><th>started</th><th>ended</th></tr>
{rows}</table>
<p class="footer">Generated at {generated}</p>
</body>
</html>
"#,
            subject = escape_html(&self.subject()),
            rows = rows,
            generated = self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }
}

/// Render an optional timestamp, `-` when unknown.
fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || "-".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Minimal HTML escaping for table cells.
fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use costwatch_source::WorkflowStatus;

    fn record(workflow_id: &str, cost: f64) -> WorkflowCostRecord {
        WorkflowCostRecord {
            namespace: "billing-ns".to_string(),
            workspace: "alpha".to_string(),
            submission_id: "sub-1".to_string(),
            workflow_id: workflow_id.to_string(),
            submission_name: "align-reads".to_string(),
            submitter: "user@example.org".to_string(),
            cost,
            submit_time: Some(Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap()),
            start_time: None,
            end_time: None,
            status: WorkflowStatus::Running,
        }
    }

    #[test]
    fn test_records_sorted_by_descending_cost() {
        let report = AlertReport::new(
            vec![record("wf-cheap", 12.0), record("wf-big", 99.5)],
            Utc::now(),
        );
        assert_eq!(report.records()[0].workflow_id, "wf-big");
        assert!((report.max_cost() - 99.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_subject_names_max_cost() {
        let report = AlertReport::new(
            vec![record("wf-1", 12.0), record("wf-2", 99.5)],
            Utc::now(),
        );
        assert_eq!(
            report.subject(),
            "Workflow billing alert: max cost $99.50 (2 workflows)"
        );
    }

    #[test]
    fn test_text_table_contains_every_record() {
        let report = AlertReport::new(
            vec![record("wf-1", 12.0), record("wf-2", 99.5)],
            Utc::now(),
        );
        let table = report.text_table();
        assert!(table.contains("wf-1"));
        assert!(table.contains("wf-2"));
        assert!(table.contains("$99.50"));
        assert!(table.contains("2026-08-06 10:00:00"));
    }

    #[test]
    fn test_html_body_escapes_and_includes_fields() {
        let mut odd = record("wf-1", 15.0);
        odd.submission_name = "a<b>&c".to_string();
        let report = AlertReport::new(vec![odd], Utc::now());

        let html = report.html_body();
        assert!(html.contains("a&lt;b&gt;&amp;c"));
        assert!(html.contains("<td>wf-1</td>"));
        assert!(html.contains("billing-ns"));
        assert!(html.contains("Generated at"));
    }
}
