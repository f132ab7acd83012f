//! `ssagen`: compile a small textual IR program through SSA construction
//! and lowering, optionally printing or dumping the resulting static form.
//!
//! This binary is a demonstration driver, not the core: the real
//! input to this system is whatever an embedding parser builds through
//! `ssagen_frontend::FunctionBuilder` directly.

mod text_format;

use clap::Parser;
use ssagen_ir::TypeTable;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "ssagen", about = "SSA construction driver")]
struct Cli {
    /// Path to a `.ssa` textual IR source file.
    input_path: PathBuf,

    /// Print the lowered static function to stdout.
    #[arg(long)]
    print_ir: bool,

    /// Accepted for CLI-surface parity; the core never optimises (§ Non-goals).
    #[arg(long)]
    no_optimise: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.no_optimise {
        log::debug!("--no-optimise has no effect: this core performs no optimisation passes");
    }

    let source = match std::fs::read_to_string(&cli.input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", cli.input_path.display());
            return ExitCode::from(4);
        }
    };

    let types = TypeTable::new();
    let static_fn = match text_format::compile(&source, &types) {
        Ok(f) => f,
        Err(err) => return report(err),
    };

    if cli.print_ir {
        println!("{}", static_fn.pretty(&types));
    }

    if let Ok(dir) = std::env::var("IR_DUMP_DIR") {
        let dump_path = PathBuf::from(&dir).join(format!("{}.ir", static_fn.name));
        if let Err(e) = std::fs::create_dir_all(&dir).and_then(|_| std::fs::write(&dump_path, static_fn.pretty(&types))) {
            eprintln!("error: could not write IR dump to {}: {e}", dump_path.display());
            return ExitCode::from(4);
        }
        log::info!("dumped static IR to {}", dump_path.display());
    }

    ExitCode::from(0)
}

/// Map a `CompileError` onto the §6 exit-code taxonomy. `MalformedInput`
/// covers both textual-grammar failures and the handful of structural
/// lowering checks that reuse the same variant (an unreachable block with
/// no terminator, a fork condition with no resolvable value); both are
/// failures in the input program, so bucketing them under "parse error" is
/// the closer fit of the four codes on offer.
fn report(err: ssagen_ir::CompileError) -> ExitCode {
    use ssagen_ir::CompileError::*;
    eprintln!("error: {err}");
    match err {
        MalformedInput(_) => ExitCode::from(1),
        UnresolvedUse { .. } | TypeMeetFailure { .. } | CapacityExhaustion(_) => ExitCode::from(2),
    }
}
