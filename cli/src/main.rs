use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use spindrift_compiler::Compiler;
use spindrift_sdk::compilation_to_json;
use spindrift_wire::{decode_value_limited, BinaryStreamReader, Envelope, TypeCode};

#[derive(Parser)]
#[command(name = "spindrift")]
#[command(about = "Compile Thrift IDL files and inspect binary-encoded values", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a `.thrift` file (and its includes), reporting any errors
    Check {
        /// Root `.thrift` file
        input: PathBuf,
    },

    /// Compile a `.thrift` file and dump the linked type graph as JSON
    Dump {
        /// Root `.thrift` file
        input: PathBuf,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode one binary-encoded struct value from a file and print it
    Decode {
        /// Input file holding a binary-encoded struct
        input: PathBuf,

        /// Treat the input as an enveloped message
        #[arg(long)]
        enveloped: bool,

        /// Reject binary payloads larger than this many bytes
        #[arg(long)]
        max_value_size: Option<usize>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match run(&cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Commands) -> Result<(), String> {
    match command {
        Commands::Check { input } => {
            let compilation = Compiler::new().compile(input).map_err(|err| err.to_string())?;
            let definitions: usize = compilation
                .modules
                .iter()
                .map(|module| module.defs.len())
                .sum();
            println!(
                "{}: {} module(s), {} definition(s)",
                input.display(),
                compilation.modules.len(),
                definitions
            );
            Ok(())
        }

        Commands::Dump { input, output } => {
            let compilation = Compiler::new().compile(input).map_err(|err| err.to_string())?;
            let json = compilation_to_json(&compilation);
            match output {
                Some(path) => {
                    fs::write(path, json).map_err(|err| err.to_string())?;
                    println!("wrote {}", path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }

        Commands::Decode { input, enveloped, max_value_size } => {
            let data = fs::read(input).map_err(|err| err.to_string())?;
            let mut reader = BinaryStreamReader::new(data.as_slice());
            if *enveloped {
                let envelope = Envelope::decode(&mut reader).map_err(|err| err.to_string())?;
                println!(
                    "{} (type {:?}, seqid {})",
                    envelope.name, envelope.envelope_type, envelope.seq_id
                );
                println!("{:#?}", envelope.value);
            } else {
                let value = decode_value_limited(TypeCode::Struct, &mut reader, *max_value_size)
                    .map_err(|err| err.to_string())?;
                println!("{:#?}", value);
            }
            Ok(())
        }
    }
}
