//! Run summary report generation

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::ImputationRecord;

/// Wall-clock time of one pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed: Duration,
}

/// What a pipeline run did
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub input_file: PathBuf,
    pub rows_loaded: usize,
    pub columns_loaded: usize,
    pub dropped_columns: Vec<String>,
    pub imputations: Vec<ImputationRecord>,
    /// Labels behind the target codes when they were assigned from text
    pub target_classes: Option<Vec<String>>,
    /// Rows per target code before splitting
    pub class_counts: BTreeMap<i64, usize>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Training rows after SMOTE, when it ran
    pub resampled_train_rows: Option<usize>,
    /// Rows per target code in the saved training labels
    pub train_class_counts: BTreeMap<i64, usize>,
    pub n_features: usize,
    pub stage_timings: Vec<StageTiming>,
    pub artifacts: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            ..Default::default()
        }
    }

    pub fn record_stage(&mut self, stage: &str, elapsed: Duration) {
        self.stage_timings.push(StageTiming {
            stage: stage.to_string(),
            elapsed,
        });
    }

    pub fn total_elapsed(&self) -> Duration {
        self.stage_timings.iter().map(|t| t.elapsed).sum()
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Rows Loaded"),
            Cell::new(format!("{} × {}", self.rows_loaded, self.columns_loaded)),
        ]);

        table.add_row(vec![
            Cell::new("🗑️  Dropped Columns"),
            Cell::new(self.dropped_columns.len()).fg(if self.dropped_columns.is_empty() {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);

        let filled: usize = self.imputations.iter().map(|r| r.filled).sum();
        table.add_row(vec![
            Cell::new("🩹 Values Imputed"),
            Cell::new(filled).fg(if filled == 0 { Color::White } else { Color::Yellow }),
        ]);

        table.add_row(vec![
            Cell::new("🎯 Class Counts"),
            Cell::new(format_counts(&self.class_counts)),
        ]);

        if let Some(classes) = &self.target_classes {
            let coded: Vec<String> = classes
                .iter()
                .enumerate()
                .map(|(code, label)| format!("{}={}", code, label))
                .collect();
            table.add_row(vec![
                Cell::new("🔤 Target Labels"),
                Cell::new(coded.join(", ")),
            ]);
        }

        table.add_row(vec![
            Cell::new("✂️  Train / Test"),
            Cell::new(format!("{} / {}", self.train_rows, self.test_rows)),
        ]);

        if let Some(resampled) = self.resampled_train_rows {
            table.add_row(vec![
                Cell::new("⚖️  After SMOTE"),
                Cell::new(format!(
                    "{} ({})",
                    resampled,
                    format_counts(&self.train_class_counts)
                ))
                .fg(Color::Cyan),
            ]);
        }

        table.add_row(vec![
            Cell::new("✅ Features"),
            Cell::new(self.n_features)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("⏱️  Elapsed"),
            Cell::new(format!("{:.2}s", self.total_elapsed().as_secs_f64())),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.imputations.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("📝").cyan(),
                style("IMPUTED COLUMNS").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            for record in &self.imputations {
                println!(
                    "        {} {} {}",
                    style("•").dim(),
                    record.column,
                    style(format!(
                        "({} filled with {:.4})",
                        record.filled, record.fill_value
                    ))
                    .dim()
                );
            }
        }

        if !self.artifacts.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("💾").cyan(),
                style("ARTIFACTS").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            for path in &self.artifacts {
                println!("        {} {}", style("•").dim(), path.display());
            }
        }
    }
}

/// `0: 720, 1: 80`
pub fn format_counts(counts: &BTreeMap<i64, usize>) -> String {
    counts
        .iter()
        .map(|(class, n)| format!("{}: {}", class, n))
        .collect::<Vec<_>>()
        .join(", ")
}
