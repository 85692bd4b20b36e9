//! Punto de entrada ("driver").
//!
//! Este módulo lee el archivo fuente, invoca la compilación y expone
//! una CLI. La salida solo se escribe si la compilación tuvo éxito.

use anyhow::{self, Context};
use clap::{self, crate_version, Arg};
use std20c::{error::Diagnostic, source::Source, Passes};
use tracing_subscriber::EnvFilter;

use std::{fs, process};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parsing de CLI
    let args = clap::Command::new("std20 compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .help("Source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .value_name("FILE")
                .default_value("a.out")
                .help("Output file for the generated IR"),
        )
        .arg(
            Arg::new("opt")
                .short('O')
                .takes_value(true)
                .value_name("LEVEL")
                .default_value("0")
                .possible_values(["0", "1"])
                .help("Optimization level"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").expect("clap requires INPUT");
    let output = args.value_of("output").expect("clap provides a default output");

    let mut passes = Passes::empty();
    if args.value_of("opt") == Some("1") {
        passes |= Passes::OPTIMIZE;
    }

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read source file: {}", input))?;

    let source = Source::new(input, text);
    match std20c::compile(&source, passes) {
        Ok(ir) => {
            fs::write(output, ir.to_string())
                .with_context(|| format!("Failed to write output file: {}", output))?;

            Ok(())
        }

        Err(error) => {
            eprint!("{}", Diagnostic::new(&source, &error));
            process::exit(1);
        }
    }
}
