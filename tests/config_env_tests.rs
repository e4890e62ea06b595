use sdrpipe::config::{StageConfig, ENV_DYNAMIC_BUFSIZE, ENV_FIXED_BUFSIZE, ENV_PRINT_BUFSIZES};
use std::io::Write;

fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn test_dynamic_flag_and_print() {
    let config = StageConfig::from_lookup(lookup(&[(ENV_DYNAMIC_BUFSIZE, "1"), (ENV_PRINT_BUFSIZES, "1")]));
    assert!(config.dynamic_bufsize);
    assert!(config.print_bufsizes);
}

#[test]
fn test_dynamic_zero_means_off() {
    let config = StageConfig::from_lookup(lookup(&[(ENV_DYNAMIC_BUFSIZE, "0")]));
    assert!(!config.dynamic_bufsize);
    assert_eq!(config.fixed_bufsize, 1024);
}

#[test]
fn test_fixed_size_applies_to_big_chunks() {
    let config = StageConfig::from_lookup(lookup(&[(ENV_FIXED_BUFSIZE, "512")]));
    assert_eq!(config.default_chunk_len(false), 512);
    assert_eq!(config.default_chunk_len(true), 512);
}

#[test]
fn test_json_file_fills_missing_fields() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"dynamic_bufsize": true, "fixed_bufsize": 256}}"#).unwrap();

    let config = StageConfig::from_json_file(file.path()).unwrap();
    assert!(config.dynamic_bufsize);
    assert_eq!(config.fixed_bufsize, 256);
    assert_eq!(config.fixed_big_bufsize, StageConfig::default().fixed_big_bufsize);
    assert_eq!(config.tee_slots, 100);
}

#[test]
fn test_json_file_errors_name_the_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    let err = StageConfig::from_json_file(file.path()).unwrap_err();
    assert!(format!("{}", err).contains("Failed to parse config JSON"));
    assert!(StageConfig::from_json_file("/nonexistent/sdrpipe.json").is_err());
}
