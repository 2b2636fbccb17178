//! Command-line interface for stencil
//! This binary expands template invocations in a text file, or dumps the
//! intermediate token/CST forms for inspection.
//!
//! Usage:
//!   stencil `<path>` [--user `<name>`] [--char `<name>`] [--format `<format>`]
//!   stencil - --user Alice              - Read the document from stdin

use clap::{Arg, Command};
use std::io::Read;

use stencil::stencil::engine::Engine;
use stencil::stencil::env::{EnvBuilder, RawEnv};
use stencil::stencil::formats;
use stencil::stencil::registry;
use stencil::stencil::{lexing, parsing};

/// All available output formats.
const AVAILABLE_FORMATS: &[&str] = &["text", "token-json", "cst-json"];

fn main() {
    let matches = Command::new("stencil")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Expand double-brace template invocations in a document")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the document, or '-' for stdin")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .help("User name exposed as {{user}}")
                .default_value("User"),
        )
        .arg(
            Arg::new("char")
                .long("char")
                .help("Character name exposed as {{char}}")
                .default_value("Character"),
        )
        .arg(
            Arg::new("group")
                .long("group")
                .help("Active group name; enables group name semantics"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .help("Model name exposed as {{model}}")
                .default_value(""),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format: text, token-json, or cst-json")
                .default_value("text"),
        )
        .get_matches();

    let path = matches.get_one::<String>("path").expect("path is required");
    let format = matches.get_one::<String>("format").expect("has default");

    let content = match read_input(path) {
        Ok(content) => content,
        Err(error) => {
            eprintln!("error: cannot read '{}': {}", path, error);
            std::process::exit(1);
        }
    };

    match format.as_str() {
        "text" => handle_evaluate_command(&matches, &content),
        "token-json" => handle_tokens_command(&content),
        "cst-json" => handle_cst_command(&content),
        other => {
            eprintln!(
                "error: unknown format '{}' (available: {})",
                other,
                AVAILABLE_FORMATS.join(", ")
            );
            std::process::exit(1);
        }
    }
}

fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
    }
}

/// Handle the default evaluate command.
fn handle_evaluate_command(matches: &clap::ArgMatches, content: &str) {
    let ctx = RawEnv {
        content: content.to_string(),
        name1: matches
            .get_one::<String>("user")
            .expect("has default")
            .clone(),
        name2: matches
            .get_one::<String>("char")
            .expect("has default")
            .clone(),
        group: matches.get_one::<String>("group").cloned(),
        model: matches
            .get_one::<String>("model")
            .expect("has default")
            .clone(),
        ..RawEnv::default()
    };

    let sink = stencil::stencil::diagnostics::ConsoleSink;
    let env = EnvBuilder::new().build(&ctx, &sink);
    let registry = registry::global()
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    print!("{}", Engine::new().evaluate(&registry, content, &env));
}

/// Handle the token dump command.
fn handle_tokens_command(content: &str) {
    let tokens = lexing::lex(content).tokens;
    match formats::tokens_to_json(&tokens) {
        Ok(json) => println!("{}", json),
        Err(error) => {
            eprintln!("error: cannot serialize tokens: {}", error);
            std::process::exit(1);
        }
    }
}

/// Handle the CST dump command.
fn handle_cst_command(content: &str) {
    let output = parsing::parse(content);
    match formats::document_to_json(&output.document) {
        Ok(json) => println!("{}", json),
        Err(error) => {
            eprintln!("error: cannot serialize document: {}", error);
            std::process::exit(1);
        }
    }
}
