//! Churnprep: Churn Data Preparation CLI Tool
//!
//! Reads the YAML pipeline configuration, runs every preparation stage and
//! writes the training/test arrays and the fitted preprocessor.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;

use churnprep::cli::Cli;
use churnprep::pipeline::{DataPipeline, StageEvent};
use churnprep::utils::{
    build_subscriber, create_spinner, finish_with_error, finish_with_success,
    finish_with_warning, print_banner, print_completion, print_config, print_info,
    print_step_header, print_success,
};
use churnprep::PipelineConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PipelineConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if !cli.quiet {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_config(&cli.config, &config);
    }

    let subscriber = build_subscriber(&config.logging.file, &config.logging.level)
        .context("Failed to set up logging")?;

    let pipeline = DataPipeline::new(config);
    let quiet = cli.quiet;
    let mut spinner: Option<ProgressBar> = None;

    let result = tracing::subscriber::with_default(subscriber, || {
        pipeline.run_with(|event| {
            if quiet {
                return;
            }
            match event {
                StageEvent::Started(stage) => {
                    print_step_header(stage.number(), stage.title());
                    spinner = Some(create_spinner(&format!("Running {}...", stage.name())));
                }
                StageEvent::Finished(stage, elapsed) => {
                    if let Some(pb) = spinner.take() {
                        finish_with_success(
                            &pb,
                            &format!("{} done in {:.2}s", stage.title(), elapsed.as_secs_f64()),
                        );
                    }
                }
                StageEvent::Skipped(stage) => {
                    print_step_header(stage.number(), stage.title());
                    let pb = create_spinner("");
                    finish_with_warning(&pb, "Skipped (smote disabled in configuration)");
                }
                StageEvent::Failed(stage) => {
                    if let Some(pb) = spinner.take() {
                        finish_with_error(&pb, &format!("{} failed", stage.title()));
                    }
                }
            }
        })
    });

    let summary = result.context("Data pipeline failed")?;

    if !cli.quiet {
        summary.display();
        print_success(&format!("{} artifacts written", summary.artifacts.len()));
        print_info(&format!(
            "Log written to {}",
            pipeline.config().logging.file.display()
        ));
        print_completion();
    }

    Ok(())
}
