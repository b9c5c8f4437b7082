use aqa_asm::Assembler;
use aqa_vm::Machine;
use aqa_vm::runtime::disasm;
use clap::Parser as CParser;
use log::{LevelFilter, error, info};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(CParser)]
#[command(name = "aqas")]
#[command(version, about = "AQA assembler and register machine")]
struct Args {
    /// Path to the assembly file
    input: PathBuf,

    /// Run the program after assembling it
    #[arg(short, long)]
    run: bool,

    /// Stop a run after this many steps
    #[arg(long)]
    max_steps: Option<u64>,

    /// Write the assembled program as JSON
    #[arg(long)]
    emit_json: Option<PathBuf>,

    /// Print the disassembled program
    #[arg(short, long)]
    listing: bool,

    /// Print final registers as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Read input file
    let input = fs::read_to_string(&args.input)?;

    // Assemble
    let mut assembler = Assembler::new();
    let program = match assembler.assemble_source(&input) {
        Ok(program) => program,
        Err(err) => {
            error!("{}: {}", args.input.display(), err);
            for diagnostic in err.display() {
                eprintln!("{}", diagnostic);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    info!(
        "assembled {} into {} slots",
        args.input.display(),
        program.len()
    );

    if args.listing {
        print!("{}", disasm::dump_program(&program));
    }

    if let Some(path) = &args.emit_json {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &program)?;
        println!("Program written to {}", path.display());
    }

    if args.run {
        let mut machine = Machine::new();
        if let Some(limit) = args.max_steps {
            machine = machine.with_step_limit(limit);
        }

        let summary = machine.run(&program)?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}", disasm::dump_registers(&summary.registers));
            println!("Halted after {} steps", summary.steps);
        }
    }

    Ok(ExitCode::SUCCESS)
}
