//! Tests for `resolve_tokens`, `repositories`, and `since_date`.

use chrono::{TimeZone, Utc};
use rstest::rstest;

use super::helpers::fixed_now;
use crate::SeedConfig;
use crate::github::FetchError;

#[rstest]
fn resolve_tokens_splits_pool_and_drops_blanks() {
    let config = SeedConfig {
        github_tokens: Some(" first , ,second,".to_owned()),
        github_token: Some("ignored".to_owned()),
        ..Default::default()
    };

    let tokens = config.resolve_tokens().expect("pool should resolve");
    let values: Vec<&str> = tokens.iter().map(|token| token.value()).collect();

    assert_eq!(values, vec!["first", "second"]);
}

#[rstest]
fn resolve_tokens_falls_back_to_single_token() {
    let _guard = env_lock::lock_env([("GITHUB_TOKEN", None::<&str>)]);
    let config = SeedConfig {
        github_tokens: Some(" , ".to_owned()),
        github_token: Some("solo".to_owned()),
        ..Default::default()
    };

    let tokens = config.resolve_tokens().expect("single token should resolve");

    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens.first().map(|token| token.value()), Some("solo"));
}

#[rstest]
fn resolve_tokens_falls_back_to_legacy_environment_variable() {
    let _guard = env_lock::lock_env([("GITHUB_TOKEN", Some("from-env"))]);
    let config = SeedConfig::default();

    let tokens = config.resolve_tokens().expect("env token should resolve");

    assert_eq!(tokens.first().map(|token| token.value()), Some("from-env"));
}

#[rstest]
fn resolve_tokens_returns_error_when_none() {
    let _guard = env_lock::lock_env([("GITHUB_TOKEN", None::<&str>)]);
    let config = SeedConfig::default();

    let result = config.resolve_tokens();
    assert!(
        matches!(result, Err(FetchError::MissingToken)),
        "expected MissingToken, got {result:?}"
    );
}

#[rstest]
fn repositories_preserve_configured_order() {
    let config = SeedConfig {
        repos: Some("octo/api, octo/web".to_owned()),
        ..Default::default()
    };

    let repositories = config.repositories().expect("repositories should parse");
    let names: Vec<String> = repositories.iter().map(|repo| repo.full_name()).collect();

    assert_eq!(names, vec!["octo/api", "octo/web"]);
}

#[rstest]
fn repositories_use_configured_api_base() {
    let config = SeedConfig {
        repos: Some("octo/api".to_owned()),
        api_base: Some("https://ghe.example.com/api/v3".to_owned()),
        ..Default::default()
    };

    let repositories = config.repositories().expect("repositories should parse");
    let repository = repositories.first().expect("one repository");

    assert_eq!(
        repository.api_base().host_str(),
        Some("ghe.example.com"),
        "locator should carry the enterprise base"
    );
}

#[rstest]
#[case::missing(None)]
#[case::blank(Some(" , "))]
fn repositories_require_at_least_one_entry(#[case] repos: Option<&str>) {
    let config = SeedConfig {
        repos: repos.map(ToOwned::to_owned),
        ..Default::default()
    };

    let result = config.repositories();
    assert!(
        matches!(result, Err(FetchError::Configuration { .. })),
        "expected Configuration error, got {result:?}"
    );
}

#[rstest]
fn repositories_reject_malformed_entry() {
    let config = SeedConfig {
        repos: Some("octo/api,not-a-repository".to_owned()),
        ..Default::default()
    };

    assert!(config.repositories().is_err(), "malformed entry should fail");
}

#[rstest]
fn since_date_parses_explicit_date_as_utc_midnight() {
    let config = SeedConfig {
        since: Some("2024-03-15".to_owned()),
        days_back: 7,
        ..Default::default()
    };

    let since = config.since_date(fixed_now()).expect("date should parse");
    let expected = Utc
        .with_ymd_and_hms(2024, 3, 15, 0, 0, 0)
        .single()
        .expect("valid timestamp");

    assert_eq!(since, expected, "explicit since should beat days_back");
}

#[rstest]
fn since_date_counts_back_from_now() {
    let config = SeedConfig {
        days_back: 30,
        ..Default::default()
    };

    let since = config.since_date(fixed_now()).expect("window should resolve");
    let expected = Utc
        .with_ymd_and_hms(2024, 5, 31, 12, 0, 0)
        .single()
        .expect("valid timestamp");

    assert_eq!(since, expected);
}

#[rstest]
#[case::wrong_separator("2024/03/15")]
#[case::not_a_date("last week")]
fn since_date_rejects_malformed_input(#[case] raw: &str) {
    let config = SeedConfig {
        since: Some(raw.to_owned()),
        ..Default::default()
    };

    let result = config.since_date(fixed_now());
    assert!(
        matches!(result, Err(FetchError::Configuration { .. })),
        "expected Configuration error, got {result:?}"
    );
}
