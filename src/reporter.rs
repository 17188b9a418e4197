use crate::analysis::AnalysisResults;
use crate::models::NotGoodItem;
use clap::ValueEnum;
use serde::Serialize;
use snafu::{ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
pub enum ReporterError {
    #[snafu(display("Failed to write output: {}", source))]
    OutputError { source: std::io::Error },

    #[snafu(display("Failed to serialize report: {}", source))]
    SerializeError { source: serde_json::Error },
}

type Result<T, E = ReporterError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    /// One line per problem
    Text,
    /// JSON with items and structured findings
    Json,
    /// Markdown formatted report
    Markdown,
}

#[derive(Serialize)]
struct JsonReport<'r, 'a> {
    items: Vec<NotGoodItem>,
    findings: &'r AnalysisResults<'a>,
}

pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn report(&self, results: &AnalysisResults) -> Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render(results, &mut handle)
    }

    pub fn render<W: Write>(&self, results: &AnalysisResults, out: &mut W) -> Result<()> {
        match self.format {
            ReportFormat::Text => self.render_text(results, out),
            ReportFormat::Json => self.render_json(results, out),
            ReportFormat::Markdown => self.render_markdown(results, out),
        }
    }

    fn render_text<W: Write>(&self, results: &AnalysisResults, out: &mut W) -> Result<()> {
        for item in results.not_good_items() {
            writeln!(out, "{}", item).context(OutputSnafu)?;
        }
        Ok(())
    }

    fn render_json<W: Write>(&self, results: &AnalysisResults, out: &mut W) -> Result<()> {
        let report = JsonReport {
            items: results.not_good_items(),
            findings: results,
        };
        serde_json::to_writer_pretty(&mut *out, &report).context(SerializeSnafu)?;
        writeln!(out).context(OutputSnafu)?;
        Ok(())
    }

    fn render_markdown<W: Write>(&self, results: &AnalysisResults, out: &mut W) -> Result<()> {
        writeln!(out, "# Index Analysis Report\n").context(OutputSnafu)?;

        let sections = [
            ("Covered Indexes", results.overwrap_items()),
            ("Unindexed Foreign Keys", results.foreign_key_items()),
            ("Bad Cardinality Order", results.cardinality_items()),
        ];

        writeln!(out, "## Summary\n").context(OutputSnafu)?;
        for (title, items) in &sections {
            writeln!(out, "- **{}**: {}", title, items.len()).context(OutputSnafu)?;
        }
        writeln!(out).context(OutputSnafu)?;

        for (title, items) in &sections {
            if items.is_empty() {
                continue;
            }

            writeln!(out, "## {}\n", title).context(OutputSnafu)?;
            for item in items {
                let written = match item.detail() {
                    Some(detail) => writeln!(out, "- {} (`{}`)", item.name(), detail),
                    None => writeln!(out, "- {}", item.name()),
                };
                written.context(OutputSnafu)?;
            }
            writeln!(out).context(OutputSnafu)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::analysis::test_support::*;
    use crate::models::Schema;

    fn scenario() -> Schema {
        schema(vec![table(
            "orders",
            &["id", "customer_id", "status", "warehouse_id"],
            vec![
                index("orders", "PRIMARY", &["id"]),
                index("orders", "idx_a", &["customer_id"]),
                index("orders", "idx_b", &["customer_id", "status"]),
            ],
        )])
    }

    fn render(format: ReportFormat, schema: &Schema) -> String {
        let results = analyze(schema).unwrap();
        let mut out = Vec::new();
        Reporter::new(format).render(&results, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_report_prints_one_line_per_item() {
        insta::assert_snapshot!(render(ReportFormat::Text, &scenario()), @r"
        Index db.orders.idx_a is covered by another index db.orders.idx_b: (customer_id) within (customer_id, status)
        Column db.orders.warehouse_id seems foreign key but not indexed.
        ");
    }

    #[test]
    fn text_report_is_empty_without_findings() {
        assert_eq!(render(ReportFormat::Text, &Schema::default()), "");
    }

    #[test]
    fn json_report_contains_items_and_findings() {
        let output = render(ReportFormat::Json, &scenario());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["items"].as_array().unwrap().len(), 2);
        assert_eq!(
            value["items"][1]["name"],
            "Column db.orders.warehouse_id seems foreign key but not indexed."
        );
        assert_eq!(value["findings"]["overwraps"][0]["anchor"]["name"], "idx_b");
        assert_eq!(
            value["findings"]["foreign_keys"][0]["unindexed_columns"][0]["name"],
            "warehouse_id"
        );
    }

    #[test]
    fn markdown_report_skips_empty_sections() {
        let output = render(ReportFormat::Markdown, &scenario());
        assert!(output.contains("- **Bad Cardinality Order**: 0"));
        assert!(output.contains("## Covered Indexes"));
        assert!(output.contains("## Unindexed Foreign Keys"));
        assert!(!output.contains("## Bad Cardinality Order"));
        assert!(output.contains("(`(customer_id) within (customer_id, status)`)"));
    }
}
