use anyhow::{Result, anyhow};
use clap::Parser;
use harvest_common::observability::{LogConfig, LogFormat, init_logging};
use harvest_config::{HarvestConfig, HarvestConfigLoader, LoggingSettings};
use jobs::{run_job, select_jobs};
use std::path::PathBuf;
mod jobs;

/// Harvest social search results into CSV files.
#[derive(Debug, Parser)]
#[command(name = "harvest", version, about)]
struct Args {
    /// Job configuration (YAML).
    #[arg(long, env = "HARVEST_CONFIG", default_value = "harvest.yaml")]
    config: PathBuf,

    /// Run only this job; repeatable. Defaults to every enabled job.
    #[arg(long = "job", value_name = "ID")]
    jobs: Vec<String>,
}

fn log_config(settings: &LoggingSettings) -> Result<LogConfig> {
    let mut log = LogConfig::default();
    if let Some(format) = &settings.format {
        log.format = format.parse::<LogFormat>().map_err(|e| anyhow!(e))?;
    }
    if let Some(emit) = settings.emit_stderr {
        log.emit_stderr = emit;
    }
    if let Some(filter) = &settings.filter {
        log.default_filter = filter.clone();
    }
    log.log_dir = settings.dir.clone();
    Ok(log)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Load config (env wins over the file)
    let cfg: HarvestConfig = HarvestConfigLoader::new().with_file(&args.config).load()?;

    // 2) Logging as configured
    let log_path = init_logging(log_config(&cfg.logging)?)?;
    tracing::info!(
        config = %args.config.display(),
        log_file = %log_path.display(),
        version = cfg.version.as_deref().unwrap_or("-"),
        "harvest.start"
    );

    // 3) Jobs run one after another
    let selected = select_jobs(&cfg, &args.jobs)?;
    if selected.is_empty() {
        tracing::warn!("harvest.no_jobs");
    }
    for job in selected {
        run_job(&cfg, job).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_and_repeated_jobs() {
        let args = Args::try_parse_from(["harvest", "--job", "a", "--job", "b"]).unwrap();
        assert_eq!(args.jobs, ["a", "b"]);

        let args = Args::try_parse_from(["harvest", "--config", "other.yaml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("other.yaml"));
    }

    #[test]
    fn logging_settings_override_defaults() {
        let settings = LoggingSettings {
            format: Some("json".into()),
            emit_stderr: Some(false),
            dir: Some(PathBuf::from("/tmp/harvest-logs")),
            filter: Some("debug,http=trace".into()),
        };
        let log = log_config(&settings).unwrap();
        assert_eq!(log.format, LogFormat::Json);
        assert!(!log.emit_stderr);
        assert_eq!(log.default_filter, "debug,http=trace");

        let bad = LoggingSettings {
            format: Some("xml".into()),
            ..Default::default()
        };
        assert!(log_config(&bad).is_err());
    }
}
