use harvest_config::{HarvestConfigLoader, SourceDetails};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const JOBS_YAML: &str = r#"
version: "1"
output_dir: "out"
logging:
  format: json
  filter: "harvest=debug"
jobs:
  - id: bluesky-posts
    kind: bluesky
    query: "UnitedHealthcare"
    start_date: "2024-12-04"
    end_date: "2024-12-18"
    output: "bluesky_all_posts_with_articles.csv"
  - id: bluesky-threads
    kind: bluesky_thread
    enabled: false
    query: "UnitedHealthcare"
    start_date: "2024-12-04"
    end_date: "2024-12-06"
    window_days: 2
    delay_ms: 1500
    output: "bluesky_threads.csv"
    config:
      max_replies: 5
  - id: x-posts
    kind: twitter
    query: "UnitedHealthcare"
    start_date: "2024-12-04"
    end_date: "2024-12-17"
    output: "x_all_tweets_with_links.csv"
    config:
      auth_token: "${HARVEST_TEST_X_TOKEN}"
      archive: true
"#;

#[test]
#[serial]
fn loads_all_job_kinds_from_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "harvest.yaml", JOBS_YAML);

    let config = temp_env::with_var("HARVEST_TEST_X_TOKEN", Some("token-from-env"), || {
        HarvestConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load harvest config")
    });

    assert_eq!(config.jobs.len(), 3);
    assert_eq!(config.logging.format.as_deref(), Some("json"));
    assert_eq!(
        config.output_path(&config.jobs[0]),
        PathBuf::from("out/bluesky_all_posts_with_articles.csv")
    );

    let enabled: Vec<_> = config.enabled_jobs().map(|j| j.id.as_str()).collect();
    assert_eq!(enabled, ["bluesky-posts", "x-posts"]);

    match &config.jobs[1].source {
        SourceDetails::BlueskyThread { config: thread } => {
            assert_eq!(thread.reply_slots(), 5);
            assert_eq!(thread.search.limit, 100);
        }
        other => panic!("expected bluesky_thread, got {other:?}"),
    }
    assert_eq!(config.jobs[1].delay().as_millis(), 1500);
    assert_eq!(config.jobs[1].window_days(), 2);

    match &config.jobs[2].source {
        SourceDetails::Twitter { config: x } => {
            assert_eq!(x.auth_token, "token-from-env");
            assert!(x.archive);
        }
        other => panic!("expected twitter, got {other:?}"),
    }
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "harvest.yaml", JOBS_YAML);

    let config = temp_env::with_vars(
        [
            ("HARVEST_TEST_X_TOKEN", Some("t")),
            ("HARVEST__OUTPUT_DIR", Some("/data/harvest")),
            ("HARVEST__LOGGING__FILTER", Some("warn")),
        ],
        || HarvestConfigLoader::new().with_file(&p).load().unwrap(),
    );

    assert_eq!(config.output_dir, Some(PathBuf::from("/data/harvest")));
    assert_eq!(config.logging.filter.as_deref(), Some("warn"));
}

#[test]
#[serial]
fn missing_token_variable_fails_validation() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "harvest.yaml", JOBS_YAML);

    let err = temp_env::with_var_unset("HARVEST_TEST_X_TOKEN", || {
        HarvestConfigLoader::new().with_file(&p).load().unwrap_err()
    });
    assert!(err.to_string().contains("auth_token"));
}

#[test]
#[serial]
fn duplicate_job_ids_are_rejected() {
    let yaml = r#"
jobs:
  - { id: dup, kind: bluesky, query: a, start_date: "2024-12-04", end_date: "2024-12-05", output: a.csv }
  - { id: dup, kind: bluesky, query: b, start_date: "2024-12-04", end_date: "2024-12-05", output: b.csv }
"#;
    let err = HarvestConfigLoader::new()
        .with_yaml_str(yaml)
        .load()
        .unwrap_err();
    assert!(err.to_string().contains("duplicate job id"));
}

#[test]
#[serial]
fn optional_file_may_be_absent() {
    let tmp = TempDir::new().unwrap();
    let config = HarvestConfigLoader::new()
        .with_optional_file(tmp.path().join("missing.yaml"))
        .with_yaml_str("jobs: []")
        .load()
        .unwrap();
    assert!(config.jobs.is_empty());
}
