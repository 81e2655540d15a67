use clap::{Arg, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the transforms from src/transforms.rs
// We need to duplicate this here since build scripts can't access src/ modules
const AVAILABLE_TRANSFORMS: &[&str] = &["tokens", "tree-json", "treeviz"];

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let input = || {
        Arg::new("input")
            .required(true)
            .index(1)
            .value_hint(ValueHint::FilePath)
    };

    let mut cmd = Command::new("richmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert, normalize and inspect Markdown documents")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("inspect").arg(input()).arg(
                Arg::new("transform")
                    .value_parser(clap::builder::PossibleValuesParser::new(
                        AVAILABLE_TRANSFORMS,
                    ))
                    .index(2),
            ),
        )
        .subcommand(
            Command::new("convert")
                .arg(input())
                .arg(Arg::new("from").long("from"))
                .arg(Arg::new("to").long("to").required(true))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(Command::new("normalize").arg(input()));

    generate_to(Bash, &mut cmd, "richmark", &outdir)?;
    generate_to(Zsh, &mut cmd, "richmark", &outdir)?;
    generate_to(Fish, &mut cmd, "richmark", &outdir)?;

    Ok(())
}
