//! Config → job wiring: one driver per job, run to completion, then one CSV write.
use anyhow::{Context, Result};
use harvest_common::HarvestError;
use harvest_config::{BlueskyConfig, HarvestConfig, JobSpec, SourceDetails};
use harvest_pipeline::{CsvSink, Driver, Fetcher, Flattener, RunSettings, SearchWindow};
use harvest_social::bluesky::{
    BlueskyApi, BlueskySearch, PostFlattener, SearchParams, ThreadFlattener,
};
use harvest_social::twitter::{TweetFlattener, TwitterApi, TwitterSearch};
use std::path::{Path, PathBuf};

/// What one finished job produced.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub id: String,
    pub kind: &'static str,
    pub rows: usize,
    pub pages: usize,
    pub windows: usize,
    pub exhausted_windows: usize,
    pub failed_windows: usize,
    pub output: PathBuf,
}

/// Jobs to run: the enabled ones, or exactly the requested ids (enabled or not).
pub fn select_jobs<'a>(cfg: &'a HarvestConfig, requested: &[String]) -> Result<Vec<&'a JobSpec>> {
    if requested.is_empty() {
        return Ok(cfg.enabled_jobs().collect());
    }
    requested
        .iter()
        .map(|id| {
            cfg.jobs.iter().find(|j| &j.id == id).ok_or_else(|| {
                anyhow::Error::from(HarvestError::Config(format!(
                    "no job with id `{id}` in configuration"
                )))
            })
        })
        .collect()
}

fn search_params(config: &BlueskyConfig) -> SearchParams {
    SearchParams {
        sort: config.sort.clone(),
        lang: config.lang.clone(),
        limit: config.limit,
    }
}

pub async fn run_job(cfg: &HarvestConfig, job: &JobSpec) -> Result<JobSummary> {
    let windows = SearchWindow::daily(job.start_date, job.end_date, job.window_days())
        .with_context(|| format!("job `{}`: building search windows", job.id))?;
    let settings = RunSettings {
        query: job.query.clone(),
        windows,
        delay: job.delay(),
    };
    let output = cfg.output_path(job);

    tracing::info!(
        job = %job.id,
        kind = job.source.kind(),
        query = %job.query,
        start = %job.start_date,
        end = %job.end_date,
        windows = settings.windows.len(),
        delay_ms = settings.delay.as_millis() as u64,
        output = %output.display(),
        "harvest.job.start"
    );

    match &job.source {
        SourceDetails::Bluesky { config } => {
            let api = BlueskyApi::new(&config.endpoint)?;
            let fetcher = BlueskySearch::new(api, search_params(config));
            execute(job, Driver::new(fetcher, PostFlattener::new(), settings), &output).await
        }
        SourceDetails::BlueskyThread { config } => {
            let api = BlueskyApi::new(&config.search.endpoint)?;
            let flattener =
                ThreadFlattener::new(api.clone(), config.reply_slots(), config.detail_delay());
            let fetcher = BlueskySearch::new(api, search_params(&config.search));
            execute(job, Driver::new(fetcher, flattener, settings), &output).await
        }
        SourceDetails::Twitter { config } => {
            if !config.has_token() {
                return Err(HarvestError::Config(format!(
                    "job `{}`: twitter auth_token is empty or references an unset variable",
                    job.id
                ))
                .into());
            }
            let api = TwitterApi::new(&config.endpoint, config.auth_token.clone(), config.archive)?;
            let fetcher = TwitterSearch::new(api, config.max_results);
            execute(job, Driver::new(fetcher, TweetFlattener::new(), settings), &output).await
        }
    }
}

async fn execute<F, L>(job: &JobSpec, driver: Driver<F, L>, output: &Path) -> Result<JobSummary>
where
    F: Fetcher,
    F::Record: Sync,
    L: Flattener<F::Record>,
{
    let report = driver.run().await;

    let sink = CsvSink::new(output);
    let rows = sink
        .write(&report.rows, driver.schema())
        .with_context(|| format!("job `{}`: writing {}", job.id, output.display()))?;

    let summary = JobSummary {
        id: job.id.clone(),
        kind: job.source.kind(),
        rows,
        pages: report.pages(),
        windows: report.windows.len(),
        exhausted_windows: report.exhausted_windows(),
        failed_windows: report.failed_windows(),
        output: output.to_path_buf(),
    };

    if summary.failed_windows > 0 {
        tracing::warn!(
            job = %summary.id,
            failed_windows = summary.failed_windows,
            "harvest.job.incomplete"
        );
    }
    tracing::info!(
        job = %summary.id,
        kind = summary.kind,
        rows = summary.rows,
        pages = summary.pages,
        windows_exhausted = summary.exhausted_windows,
        windows_failed = summary.failed_windows,
        output = %summary.output.display(),
        "harvest.job.done"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_config::HarvestConfigLoader;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(yaml: &str) -> HarvestConfig {
        HarvestConfigLoader::new().with_yaml_str(yaml).load().unwrap()
    }

    #[test]
    fn selects_enabled_jobs_or_the_requested_ones() {
        let cfg = config(
            r#"
jobs:
  - { id: a, kind: bluesky, query: q, start_date: "2024-12-04", end_date: "2024-12-05", output: a.csv }
  - { id: b, kind: bluesky, query: q, start_date: "2024-12-04", end_date: "2024-12-05", output: b.csv, enabled: false }
"#,
        );

        let ids = |jobs: Vec<&JobSpec>| jobs.iter().map(|j| j.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(select_jobs(&cfg, &[]).unwrap()), ["a"]);
        assert_eq!(ids(select_jobs(&cfg, &["b".into()]).unwrap()), ["b"]);

        let err = select_jobs(&cfg, &["zzz".into()]).unwrap_err();
        assert!(err.to_string().contains("`zzz`"));
    }

    #[tokio::test]
    async fn bluesky_job_writes_every_window_to_csv() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/xrpc/app.bsky.feed.searchPosts"))
            .and(query_param("since", "2024-12-04T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "posts": [{
                    "uri": "at://did:plc:a/app.bsky.feed.post/1",
                    "author": { "did": "did:plc:a", "handle": "a.bsky.social" },
                    "record": { "text": "hello", "createdAt": "2024-12-04T01:00:00.000Z" },
                    "embed": {
                        "$type": "app.bsky.embed.external#view",
                        "external": { "uri": "https://news.example/a", "title": "A" }
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/xrpc/app.bsky.feed.searchPosts"))
            .and(query_param("since", "2024-12-05T00:00:00Z"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&format!(
            r#"
output_dir: "{dir}"
jobs:
  - id: bsky
    kind: bluesky
    query: UnitedHealthcare
    start_date: "2024-12-04"
    end_date: "2024-12-06"
    delay_ms: 0
    output: nested/posts.csv
    config:
      endpoint: "{endpoint}"
"#,
            dir = tmp.path().display(),
            endpoint = server.uri(),
        ));

        let summary = run_job(&cfg, &cfg.jobs[0]).await.unwrap();

        assert_eq!(summary.rows, 1);
        assert_eq!(summary.windows, 2);
        assert_eq!(summary.failed_windows, 1);
        assert_eq!(summary.output, tmp.path().join("nested/posts.csv"));

        let csv = std::fs::read_to_string(&summary.output).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("DID,Handle,Display Name"));
        let row = lines.next().unwrap();
        assert!(row.contains("https://news.example/a"));
        assert!(lines.next().is_none());
    }
}
