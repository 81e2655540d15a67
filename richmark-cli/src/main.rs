// Command-line interface for richmark
//
// Converts Markdown documents to and from the document tree, normalizes Markdown through a
// parse/serialize round trip, and inspects the intermediate stages.
//
// Converting:
//
// The conversion needs a to and from pair. The from is auto-detected from the file extension,
// while being overwrittable by an explicit --from flag.
// Usage:
//  richmark <input> --to <format> [--from <format>] [--output <file>]  - Convert between formats (default)
//  richmark convert <input> --to <format> [--from <format>] [--output <file>]  - Same as above (explicit)
//  richmark normalize <input>                 - Markdown round trip to stdout
//  richmark inspect <path> [<transform>]      - Show tokens or the tree (defaults to "treeviz")
//
// Extra Parameters:
//
// Parser flags can be overridden with --extra-<flag> [value], e.g. --extra-html false.
// Boolean flags may omit the value.

mod transforms;

use clap::{Arg, Command, ValueHint};
use richmark::formats::{JsonFormat, MarkdownFormat};
use richmark::{FormatRegistry, ParseOptions};
use richmark_config::{Loader, RichmarkConfig};
use std::collections::HashMap;
use std::fs;
use transforms::InspectParams;

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        if let Some(key) = arg.strip_prefix("--extra-") {
            let has_value = args
                .get(i + 1)
                .is_some_and(|next| !next.starts_with('-'));

            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn build_cli() -> Command {
    Command::new("richmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert, normalize and inspect Markdown documents")
        .long_about(
            "richmark reads Markdown into a document tree that remembers how every construct \
            was written, and writes it back.\n\n\
            Commands:\n  \
            - convert:   Transform between formats (markdown, json, treeviz)\n  \
            - normalize: Parse and re-serialize Markdown\n  \
            - inspect:   View tokens or the document tree\n\n\
            Extra Parameters:\n  \
            Use --extra-<flag> [value] to override parser flags\n  \
            (html, tables, extra-emphasis, tag-links, linkify) and --extra-pretty.\n\n\
            Examples:\n  \
            richmark doc.md --to json               # Tree as JSON (stdout)\n  \
            richmark tree.json --to markdown        # Back to Markdown\n  \
            richmark inspect doc.md tokens          # Token stream\n  \
            richmark normalize doc.md --extra-html false",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a richmark.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the token stream or document tree of a Markdown file")
                .arg(
                    Arg::new("path")
                        .help("Path to the Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("transform")
                        .help("Transform to apply. Defaults to 'treeviz'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            transforms::AVAILABLE_TRANSFORMS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("normalize")
                .about("Parse a Markdown file and write it back to stdout")
                .arg(
                    Arg::new("input")
                        .help("Input file path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                ),
        )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);

    // Without a subcommand, a leading file argument means "convert"
    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&cleaned_args) {
        Ok(m) => m,
        Err(e) => {
            if cleaned_args.len() > 1
                && !cleaned_args[1].starts_with('-')
                && !["inspect", "convert", "normalize", "help"].contains(&cleaned_args[1].as_str())
            {
                let mut new_args = vec![cleaned_args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&cleaned_args[1..]);

                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    let mut config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));
    apply_config_overrides(&mut config, &mut extra_params);
    for key in extra_params.keys() {
        log::warn!("ignoring unknown parameter --extra-{key}");
    }

    match matches.subcommand() {
        Some(("inspect", sub_matches)) => {
            let path = required_arg(sub_matches, "path");
            let transform = sub_matches
                .get_one::<String>("transform")
                .map(|s| s.as_str())
                .unwrap_or(transforms::DEFAULT_TRANSFORM);
            handle_inspect_command(path, transform, &config);
        }
        Some(("convert", sub_matches)) => {
            let input = required_arg(sub_matches, "input");
            let to = required_arg(sub_matches, "to");
            let registry = build_registry(&config);

            let from = match sub_matches.get_one::<String>("from") {
                Some(from) => from.to_string(),
                None => registry
                    .detect_format_from_filename(input)
                    .unwrap_or_else(|| {
                        eprintln!("Error: Could not detect format from filename '{input}'");
                        eprintln!("Please specify --from explicitly");
                        std::process::exit(1);
                    }),
            };

            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            handle_convert_command(&registry, input, &from, to, output);
        }
        Some(("normalize", sub_matches)) => {
            let input = required_arg(sub_matches, "input");
            let registry = build_registry(&config);
            handle_convert_command(&registry, input, "markdown", "markdown", None);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn required_arg<'a>(matches: &'a clap::ArgMatches, name: &str) -> &'a str {
    match matches.get_one::<String>(name) {
        Some(value) => value,
        None => {
            eprintln!("Error: missing argument '{name}'");
            std::process::exit(1);
        }
    }
}

fn read_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

/// Default formats, with markdown and json configured from `config`
fn build_registry(config: &RichmarkConfig) -> FormatRegistry {
    let mut registry = FormatRegistry::default();
    let options = ParseOptions::from(&config.parser);
    registry.register(MarkdownFormat::new(options).with_references(config.reference_table()));
    registry.register(JsonFormat::new(config.inspect.pretty));
    registry
}

fn handle_inspect_command(path: &str, transform: &str, config: &RichmarkConfig) {
    let source = read_source(path);
    let options = ParseOptions::from(&config.parser);
    let references = config.reference_table();
    let params = InspectParams {
        options: &options,
        references: (!references.is_empty()).then_some(&references),
        pretty: config.inspect.pretty,
    };

    let output = transforms::execute_transform(&source, transform, &params).unwrap_or_else(|e| {
        eprintln!("Execution error: {e}");
        std::process::exit(1);
    });

    print!("{output}");
}

fn handle_convert_command(
    registry: &FormatRegistry,
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
) {
    for name in [from, to] {
        if let Err(e) = registry.get(name) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    let source = read_source(input);

    let mut text = registry.convert(&source, from, to).unwrap_or_else(|e| {
        eprintln!("Conversion error: {e}");
        std::process::exit(1);
    });
    if !text.ends_with('\n') {
        text.push('\n');
    }

    match output {
        Some(path) => fs::write(path, text).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None => print!("{text}"),
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> RichmarkConfig {
    let loader = Loader::new().with_optional_file("richmark.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn apply_config_overrides(config: &mut RichmarkConfig, extra_params: &mut HashMap<String, String>) {
    let parser = &mut config.parser;
    let flags: [(&[&str], &mut bool); 5] = [
        (&["html"], &mut parser.html),
        (&["tables"], &mut parser.tables),
        (&["extra-emphasis", "strikethrough"], &mut parser.extra_emphasis),
        (&["tag-links"], &mut parser.tag_links),
        (&["linkify"], &mut parser.linkify),
    ];
    for (keys, flag) in flags {
        if let Some(raw) = take_override(extra_params, keys) {
            *flag = parse_bool_arg(keys[0], &raw);
        }
    }

    if let Some(raw) = take_override(extra_params, &["pretty"]) {
        config.inspect.pretty = parse_bool_arg("pretty", &raw);
    }
}

fn take_override(map: &mut HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.remove(*key))
}

fn parse_bool_arg(flag: &str, raw: &str) -> bool {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        other => {
            eprintln!("Invalid boolean value '{other}' for --extra-{flag}");
            std::process::exit(1);
        }
    }
}
