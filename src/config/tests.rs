use super::*;
use figment::Jail;

#[test]
fn test_defaults_are_valid() {
    let config = RunConfig::default();
    assert!(config.validate().is_ok());
    assert!(config.max_workers >= 1 && config.max_workers <= 4);
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.single_batch_threshold, 6);
    assert_eq!(config.backend, Backend::Thread);
    assert!(!config.progress);
}

#[test]
fn test_validation_rejects_bad_values() {
    assert!(RunConfig::default().with_max_workers(0).validate().is_err());
    assert!(RunConfig::default().with_batch_size(0).validate().is_err());

    let missing_command = RunConfig {
        backend: Backend::Process,
        ..RunConfig::default()
    };
    assert!(matches!(
        missing_command.validate(),
        Err(FanoutError::Config(_))
    ));

    let empty_program = RunConfig::default().with_worker_command([""]);
    assert!(empty_program.validate().is_err());
}

#[test]
fn test_with_worker_command_switches_backend() {
    let config = RunConfig::default().with_worker_command(["worker", "--delay-ms", "5"]);
    assert_eq!(config.backend, Backend::Process);
    assert_eq!(config.worker_command, vec!["worker", "--delay-ms", "5"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_toml_file_and_env_override() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "fanout.toml",
            r#"
                max_workers = 3
                batch_size = 8
                progress = true
            "#,
        )?;
        jail.set_env("PAGE_FANOUT_BATCH_SIZE", "2");

        let config = RunConfig::load_from(Some(Path::new("fanout.toml"))).expect("config loads");
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.batch_size, 2);
        assert!(config.progress);
        assert_eq!(config.single_batch_threshold, 6);
        Ok(())
    });
}

#[test]
fn test_load_yaml_process_backend() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "fanout.yml",
            r#"
backend: process
max_workers: 2
worker_command:
  - /usr/local/bin/page-worker
  - --delay-ms
  - "10"
"#,
        )?;

        let config = RunConfig::load_from(Some(Path::new("fanout.yml"))).expect("config loads");
        assert_eq!(config.backend, Backend::Process);
        assert_eq!(config.worker_command.len(), 3);
        Ok(())
    });
}

#[test]
fn test_load_rejects_invalid_env() {
    Jail::expect_with(|jail| {
        jail.set_env("PAGE_FANOUT_MAX_WORKERS", "0");
        assert!(matches!(RunConfig::load(), Err(FanoutError::Config(_))));
        Ok(())
    });
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    Jail::expect_with(|_jail| {
        let config = RunConfig::load_from(Some(Path::new("absent.toml"))).expect("defaults load");
        assert_eq!(config.batch_size, 4);
        Ok(())
    });
}

#[test]
fn test_load_json_file_from_absolute_path() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp config file");
    std::io::Write::write_all(
        &mut file,
        br#"{"max_workers": 2, "batch_size": 5, "progress": true}"#,
    )
    .expect("write config");

    // Jail keeps concurrent env-mutating tests out of the way
    Jail::expect_with(|_jail| {
        let config = RunConfig::load_from(Some(file.path())).expect("config loads");
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.batch_size, 5);
        assert!(config.progress);
        assert_eq!(config.backend, Backend::Thread);
        Ok(())
    });
}
