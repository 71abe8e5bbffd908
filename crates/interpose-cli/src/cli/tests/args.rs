//! Tests for argument parsing.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_simulate_defaults() {
    match parse(&["interpose", "simulate", "https://a.test/x.gif"]) {
        CliCommand::Simulate {
            urls,
            delay_ms,
            abort_suffixes,
            fail_actions,
        } => {
            assert_eq!(urls, vec!["https://a.test/x.gif".to_string()]);
            assert!(delay_ms.is_none());
            assert!(abort_suffixes.is_empty());
            assert!(!fail_actions);
        }
        _ => panic!("expected Simulate"),
    }
}

#[test]
fn cli_parse_simulate_overrides() {
    match parse(&[
        "interpose",
        "simulate",
        "https://a.test/",
        "https://b.test/logo.png",
        "--delay-ms",
        "0",
        "--abort-suffix",
        ".png",
        "--abort-suffix",
        ".gif",
        "--fail-actions",
    ]) {
        CliCommand::Simulate {
            urls,
            delay_ms,
            abort_suffixes,
            fail_actions,
        } => {
            assert_eq!(urls.len(), 2);
            assert_eq!(delay_ms, Some(0));
            assert_eq!(abort_suffixes, vec![".png".to_string(), ".gif".to_string()]);
            assert!(fail_actions);
        }
        _ => panic!("expected Simulate"),
    }
}

#[test]
fn cli_parse_simulate_requires_a_url() {
    assert!(Cli::try_parse_from(["interpose", "simulate"]).is_err());
}

#[test]
fn cli_parse_config() {
    match parse(&["interpose", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}

#[test]
fn cli_help_is_handled_by_the_parser() {
    let err = Cli::try_parse_from(["interpose", "--help"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[tokio::test]
async fn run_uses_the_config_it_is_given() {
    let cli = Cli::try_parse_from(["interpose", "config"]).unwrap();
    let err = cli
        .run(Err(anyhow::anyhow!("config unavailable")))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "config unavailable");
}
