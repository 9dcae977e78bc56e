use crate::assembly::{ClassifiedEntry, ReportSummary};
use crate::error::LimsResult;
use crate::store::NewReport;
use log::info;
use std::fs::File;
use std::path::Path;

pub fn save_report<P: AsRef<Path>>(report: &NewReport, classified: &[ClassifiedEntry], output_dir: P) -> LimsResult<()> {
    let output_path = output_dir.as_ref();
    std::fs::create_dir_all(output_path)?;

    save_results(classified, &output_path.join("results.csv"))?;

    let summary = ReportSummary::from_classified(classified);
    save_summary(&summary, &output_path.join("summary.json"))?;

    generate_report(report, classified, &summary, &output_path.join("report.md"))?;

    info!("Report files saved to {:?}", output_path);
    Ok(())
}

fn save_results<P: AsRef<Path>>(classified: &[ClassifiedEntry], path: P) -> LimsResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record([
        "TEST_CODE", "TEST_NAME", "VALUE", "UNIT", "REFERENCE_RANGE", "FLAG", "COMMENTS",
    ])?;

    for item in classified {
        let entry = &item.entry;
        writer.write_record([
            entry.test_code.as_str(),
            entry.test_name.as_str(),
            entry.value.as_str(),
            entry.unit.as_str(),
            entry.reference_range.as_str(),
            item.badge(),
            entry.comments.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn save_summary<P: AsRef<Path>>(summary: &ReportSummary, path: P) -> LimsResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

/// Markdown rendering of a report with Normal/Abnormal badges.
pub fn render_markdown(report: &NewReport, classified: &[ClassifiedEntry], summary: &ReportSummary) -> String {
    let mut rows = String::new();
    let mut current_code = "";

    for item in classified {
        let entry = &item.entry;
        if entry.test_code != current_code {
            current_code = entry.test_code.as_str();
            rows.push_str(&format!("| **{}** | | | | |\n", escape_cell(current_code)));
        }

        let mut value = escape_cell(&entry.value);
        if let Some(comments) = &entry.comments {
            value = format!("{} ({})", value, escape_cell(comments));
        }
        if let Some(hour) = &entry.hour_type {
            value = format!("{} [{}]", value, escape_cell(hour));
        }

        rows.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            escape_cell(&entry.test_name),
            value,
            escape_cell(&entry.unit),
            escape_cell(&entry.reference_range),
            item.badge(),
        ));
    }

    let abnormal = if summary.abnormal_tests.is_empty() {
        "None".to_string()
    } else {
        summary.abnormal_tests.join(", ")
    };

    format!(
        r#"# Laboratory Report

- **Patient**: {}
- **Date**: {}
- **Reviewed by**: {}

| Test | Result | Unit | Reference Range | Flag |
|------|--------|------|-----------------|------|
{}
## Summary
- **Results**: {}
- **Normal**: {}
- **Abnormal**: {}
- **Not classified**: {}
- **Out of range**: {}

## Remarks
{}
"#,
        report.patient_id,
        report.date,
        if report.reviewer.is_empty() { "-" } else { report.reviewer.as_str() },
        rows,
        summary.total,
        summary.normal,
        summary.abnormal,
        summary.indeterminate,
        abnormal,
        if report.remarks.is_empty() { "-" } else { report.remarks.as_str() },
    )
}

/// Table cells cannot contain a bare `|`.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn generate_report<P: AsRef<Path>>(
    report: &NewReport,
    classified: &[ClassifiedEntry],
    summary: &ReportSummary,
    path: P,
) -> LimsResult<()> {
    std::fs::write(path, render_markdown(report, classified, summary))?;
    Ok(())
}
