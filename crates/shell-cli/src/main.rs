use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use abi::{MAX_CAPACITY, Machine, MachineConfig, Registry, VmError};
use anyhow::{Context, ensure};
use clap::{ArgAction, Parser};
use vfs::{HostVfs, Vfs};

#[derive(Parser, Debug)]
#[command(name = "shell-cli")]
#[command(about = "Load a bytecode image and run it", long_about = None)]
struct Args {
    /// Program image, relative to the current directory
    #[arg(long, default_value = "resources/test.bin")]
    image: String,

    /// JSON machine configuration (capacity, max_cycles, trace)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the demonstration program to the image path before loading
    #[arg(long, action = ArgAction::SetTrue)]
    write_demo: bool,

    /// Give up after this many instructions
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Log every decoded instruction and operand byte
    #[arg(long, action = ArgAction::SetTrue)]
    trace: bool,

    /// Print a listing of the image before running it
    #[arg(long, action = ArgAction::SetTrue)]
    disassemble: bool,

    /// Only warnings and errors on stderr
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let filter = match (args.quiet, args.trace) {
        (_, true) => "trace",
        (true, false) => "warn",
        (false, false) => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(err) = run(args) {
        match err.downcast_ref::<VmError>() {
            Some(vm_err) => {
                eprintln!("VM CRASH: {vm_err}");
                process::exit(vm_err.exit_code());
            }
            None => {
                eprintln!("error: {err:#}");
                process::exit(1);
            }
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<MachineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => MachineConfig::default(),
    };
    if args.max_cycles.is_some() {
        config.max_cycles = args.max_cycles;
    }
    config.trace |= args.trace;
    ensure!(
        config.capacity <= MAX_CAPACITY,
        "memory capacity {} exceeds the {} byte limit",
        config.capacity,
        MAX_CAPACITY
    );
    Ok(config)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let mut store = HostVfs::new(".");

    if args.write_demo {
        store
            .write(&args.image, &compiler::demo_program())
            .with_context(|| format!("writing demo program to {}", args.image))?;
    }

    let mut vm = Machine::from_config(&config, Arc::new(Registry::with_defaults()));
    let loaded = vfs::load_image(&store, &args.image, &mut vm.memory)
        .with_context(|| format!("loading {}", args.image))?;
    log::info!("{} byte image, {} byte memory", loaded, vm.memory.capacity());

    println!("{}", vm.memory.hexdump());

    if args.disassemble {
        for line in compiler::disassemble(&vm.memory.as_bytes()[..loaded]) {
            println!("{line}");
        }
        println!();
    }

    let on_value = |value: i64| println!("PUSH_INTEGER -> {value} (0x{value:08X})");
    let summary = match config.max_cycles {
        Some(max) => vm.run_bounded(max, on_value)?,
        None => vm.run(on_value)?,
    };

    println!(
        "VM halted normally after {} cycles (cursor {}).",
        summary.cycles, summary.cursor
    );
    Ok(())
}
