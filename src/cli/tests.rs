//! Unit tests for CLI argument parsing

use crate::cli::{Cli, Commands};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_serve_defaults() {
    let cli = Cli::try_parse_from(["ultrarender", "serve"]).unwrap();
    assert!(cli.config.is_none());
    match cli.command {
        Commands::Serve {
            app,
            import_map,
            addr,
            watch,
        } => {
            assert_eq!(app, PathBuf::from("index.html"));
            assert!(import_map.is_none());
            assert!(addr.is_none());
            assert!(!watch);
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_serve_with_flags() {
    let cli = Cli::try_parse_from([
        "ultrarender",
        "serve",
        "--app",
        "dist/page.html",
        "--addr",
        "127.0.0.1:9000",
        "--watch",
        "--config",
        "ultra.yaml",
    ])
    .unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("ultra.yaml")));
    match cli.command {
        Commands::Serve { app, addr, watch, .. } => {
            assert_eq!(app, PathBuf::from("dist/page.html"));
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
            assert!(watch);
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_resolve_command() {
    let cli = Cli::try_parse_from([
        "ultrarender",
        "resolve",
        "react",
        "--referrer",
        "http://localhost:8000/src/app.js",
    ])
    .unwrap();
    match cli.command {
        Commands::Resolve {
            specifier, referrer, ..
        } => {
            assert_eq!(specifier, "react");
            assert_eq!(referrer.as_deref(), Some("http://localhost:8000/src/app.js"));
        }
        _ => panic!("Expected Resolve command"),
    }
}

#[test]
fn test_build_and_hash_parse() {
    let cli = Cli::try_parse_from(["ultrarender", "build", "--project", "site", "--plan"]).unwrap();
    assert!(matches!(cli.command, Commands::Build { plan: true, .. }));

    let cli = Cli::try_parse_from(["ultrarender", "hash", "https://esm.sh/react"]).unwrap();
    assert!(matches!(cli.command, Commands::Hash { ref url } if url == "https://esm.sh/react"));
}

#[test]
fn test_missing_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["ultrarender"]).is_err());
    assert!(Cli::try_parse_from(["ultrarender", "hash"]).is_err());
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ultra.yaml");
    std::fs::write(&path, "lang: fr\nchunk_size: 16\n").unwrap();
    let cli = Cli::try_parse_from([
        "ultrarender",
        "--config",
        path.to_str().unwrap(),
        "hash",
        "x",
    ])
    .unwrap();
    let config = cli.load_config().unwrap();
    assert_eq!(config.chunk_size, 16);
}
