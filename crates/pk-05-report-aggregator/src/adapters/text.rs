//! Built-in text renderer.
//!
//! | Format | Output |
//! |--------|--------|
//! | `csv`   | `metric,value` rows, RFC 4180 quoting |
//! | `excel` | tab-separated rows, opens in spreadsheet tools |
//! | `pdf`   | plain-text page layout; a binary PDF backend plugs in behind the same port |

use std::fmt::Write as _;

use shared_types::ReportFormat;

use crate::domain::{ReportBody, ReportError, ReportHeader};
use crate::ports::ReportRenderer;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    fn csv(rows: &[(String, String)]) -> String {
        let mut out = String::from("metric,value\n");
        for (key, value) in rows {
            out.push_str(&csv_field(key));
            out.push(',');
            out.push_str(&csv_field(value));
            out.push('\n');
        }
        out
    }

    fn tsv(header: &ReportHeader<'_>, rows: &[(String, String)]) -> String {
        let mut out = format!("{}\t{}\n", header.title, header.id);
        out.push_str("metric\tvalue\n");
        for (key, value) in rows {
            out.push_str(&key.replace('\t', " "));
            out.push('\t');
            out.push_str(&value.replace('\t', " "));
            out.push('\n');
        }
        out
    }

    fn page(header: &ReportHeader<'_>, rows: &[(String, String)]) -> Result<String, std::fmt::Error> {
        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        let mut out = String::new();
        writeln!(out, "{}", header.title)?;
        writeln!(out, "{}", "=".repeat(header.title.len()))?;
        writeln!(out, "Report:    {}", header.id)?;
        writeln!(
            out,
            "Period:    {} - {}",
            header.range.start.format(DATE_FORMAT),
            header.range.end.format(DATE_FORMAT)
        )?;
        writeln!(out, "Generated: {}", header.generated_at.format(DATE_FORMAT))?;
        writeln!(out)?;
        for (key, value) in rows {
            writeln!(out, "{key:<width$}  {value}")?;
        }
        Ok(out)
    }
}

impl ReportRenderer for TextRenderer {
    fn render(
        &self,
        header: &ReportHeader<'_>,
        body: &ReportBody,
        format: ReportFormat,
    ) -> Result<Vec<u8>, ReportError> {
        let rows = body.rows();
        let text = match format {
            ReportFormat::Csv => Self::csv(&rows),
            ReportFormat::Excel => Self::tsv(header, &rows),
            ReportFormat::Pdf => {
                Self::page(header, &rows).map_err(|e| ReportError::Render(e.to_string()))?
            }
        };
        Ok(text.into_bytes())
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
