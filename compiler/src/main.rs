use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    /// Rewritten (guard-injected) source
    Code,
    /// Line-start mapping from rewritten code to original locations
    Map,
    /// Raw dependency tree as JSON
    Tree,
    /// Final dependency list as JSON
    Deps,
}

#[derive(Parser, Debug)]
#[command(
    name = "fcc",
    version,
    about = "Formula Compiler Core — rewrites formula scripts and extracts their data dependencies"
)]
struct Cli {
    /// Input formula source file
    source: PathBuf,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Code)]
    emit: EmitStage,

    /// Name of the sandbox guard function injected into loops
    #[arg(long, default_value = fcc::transpile::DEFAULT_GUARD_NAME)]
    guard_name: String,

    /// Print compiler phases
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        eprintln!("fcc: source = {}", cli.source.display());
        eprintln!("fcc: emit   = {:?}", cli.emit);
    }

    // ── Read source ──
    let raw = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("fcc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    // ── Macro pre-processing ──
    let source = fcc::macros::replace_macros(&raw);
    if cli.verbose && source != raw {
        eprintln!("fcc: macro substitution changed the source");
    }

    match cli.emit {
        EmitStage::Code | EmitStage::Map => {
            let transpiler = fcc::transpile::Transpiler::with_guard_name(&cli.guard_name);
            let result = match transpiler.transpile_with_metadata(&source) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("fcc: {}", e);
                    std::process::exit(1);
                }
            };
            if cli.verbose {
                eprintln!(
                    "fcc: rewrote {} bytes into {} bytes",
                    result.original.len(),
                    result.code.len()
                );
            }
            match cli.emit {
                EmitStage::Code => print!("{}", result.code),
                EmitStage::Map => {
                    for (line, _) in result.code.lines().enumerate() {
                        let original = result.resolve_original_location(
                            fcc::text::CodeLocation { line, column: 0 },
                        );
                        println!("{} -> {},{}", line, original.line, original.column);
                    }
                }
                _ => unreachable!(),
            }
        }
        EmitStage::Tree => {
            let tree = match fcc::pipeline::dependency_tree(&source) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("fcc: {}", e);
                    std::process::exit(1);
                }
            };
            print_json(&tree);
        }
        EmitStage::Deps => {
            let deps = fcc::pipeline::calculate_aux_dependencies(&source);
            if cli.verbose {
                eprintln!("fcc: {} dependencies", deps.len());
            }
            print_json(&deps);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("fcc: error: {}", e);
            std::process::exit(2);
        }
    }
}
