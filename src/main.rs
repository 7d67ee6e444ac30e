//! i8080 Emulator - CLI Entry Point
//!
//! Commands:
//! - `i8080-emu run <image>` - Run a raw binary image
//! - `i8080-emu debug <image>` - Interactive debugger
//! - `i8080-emu disasm <image>` - Disassemble an image
//! - `i8080-emu test` - Built-in self-test

use clap::{Args, Parser, Subcommand};
use i8080::{Cpu, CpuState, RunConfig, load_image, parse_address};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "i8080-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An Intel 8080 interpreter with CP/M BDOS console traps")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where and how to load an image.
#[derive(Args)]
struct LoadArgs {
    /// Path to the raw binary image
    image: String,
    /// Load address, decimal or 0x hex (default 0, or 0x100 with --cpm)
    #[arg(short, long, value_parser = parse_address)]
    base: Option<u16>,
    /// Initial PC (default: the load address)
    #[arg(short, long, value_parser = parse_address)]
    entry: Option<u16>,
    /// Install CP/M warm boot and BDOS traps
    #[arg(long)]
    cpm: bool,
    /// JSON run configuration; flags override its values
    #[arg(long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts, stops, or leaves the image
    Run {
        #[command(flatten)]
        load: LoadArgs,
        /// Initial stack pointer
        #[arg(long, value_parser = parse_address)]
        sp: Option<u16>,
        /// Maximum number of instructions to execute
        #[arg(short, long)]
        max_steps: Option<u64>,
        /// Log every executed instruction to stderr
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        dump_state: bool,
    },
    /// Interactive debugger
    Debug {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the raw binary image
        image: String,
        /// Address of the first byte
        #[arg(short, long, value_parser = parse_address, default_value = "0")]
        base: u16,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { load, sp, max_steps, trace, dump_state }) => {
            init_logging(trace);
            let mut config = resolve_config(&load);
            if sp.is_some() {
                config.stack_pointer = sp;
            }
            if max_steps.is_some() {
                config.max_steps = max_steps;
            }
            run_program(&load.image, &config, dump_state);
        }
        Some(Commands::Debug { load }) => {
            let config = resolve_config(&load);
            debug_program(&load.image, config);
        }
        Some(Commands::Disasm { image, base }) => {
            init_logging(false);
            disassemble_file(&image, base);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("i8080 Emulator v0.1.0");
            println!("An Intel 8080 interpreter");
            println!();
            println!("Use --help for available commands");
        }
    }
}

/// Logs go to stderr so program output on stdout stays clean.
fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("i8080=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config file first, then `--cpm` defaults, then explicit flags.
fn resolve_config(load: &LoadArgs) -> RunConfig {
    let mut config = match &load.config {
        Some(path) => match RunConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        None => RunConfig::default(),
    };

    if load.cpm {
        config.cpm = true;
        if config.load_address == 0 {
            config.load_address = i8080::config::CPM_LOAD_ADDRESS;
        }
    }
    if let Some(base) = load.base {
        config.load_address = base;
    }
    if load.entry.is_some() {
        config.entry_point = load.entry;
    }

    config
}

fn load_cpu(path: &str, config: &RunConfig) -> (Cpu, usize) {
    let image = match load_image(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    if image.is_empty() {
        eprintln!("❌ Image is empty");
        std::process::exit(1);
    }

    match config.build_cpu(&image) {
        Ok(cpu) => (cpu, image.len()),
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, config: &RunConfig, dump_state: bool) {
    let (mut cpu, size) = load_cpu(path, config);

    eprintln!("🔧 Running: {} ({} bytes at {:04X}, entry {:04X})",
        path, size, config.load_address, config.entry());

    let mut stdout = std::io::stdout();
    let limit = config.max_steps.unwrap_or(u64::MAX);

    // Run in slices so console output streams while the program runs.
    while cpu.is_running() && (cpu.regs.pc as u32) < cpu.program_end() && cpu.steps < limit {
        let slice = (limit - cpu.steps).min(10_000);
        if let Err(e) = cpu.run_limited(slice) {
            eprintln!("❌ CPU error at PC={:04X}: {}", cpu.regs.pc, e);
            std::process::exit(1);
        }
        if let Err(e) = flush_console(&mut cpu, &mut stdout) {
            eprintln!("❌ Failed to write console output: {}", e);
            std::process::exit(1);
        }
    }

    eprintln!();
    eprintln!("━━━ Result ━━━");
    eprintln!("Steps: {}", cpu.steps);
    eprintln!("State: {:?}", cpu.state);
    eprintln!("PC={:04X} SP={:04X} A={:02X} BC={:04X} DE={:04X} HL={:04X} F={:02X}",
        cpu.regs.pc, cpu.regs.sp, cpu.regs.a,
        cpu.regs.bc(), cpu.regs.de(), cpu.regs.hl(), cpu.regs.flags.to_byte());

    let unimplemented = cpu.unimplemented_count();
    if unimplemented > 0 {
        let first = cpu.take_diagnostics();
        eprintln!("⚠️  {} unimplemented instruction(s) executed", unimplemented);
        if let Some(d) = first.first() {
            eprintln!("   first: {:02X} at {:04X}", d.opcode, d.address);
        }
    }

    if cpu.state == CpuState::Running && cpu.steps >= limit {
        eprintln!("⚠️  Reached step limit ({}). Use --max-steps to increase.", limit);
    }

    if dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Move pending console bytes from the CPU to `out`.
fn flush_console<W: Write>(cpu: &mut Cpu, out: &mut W) -> std::io::Result<()> {
    let bytes = cpu.take_console();
    if bytes.is_empty() {
        return Ok(());
    }
    out.write_all(&bytes)?;
    out.flush()
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config: RunConfig) {
    use i8080::run_debugger;

    let image = match load_image(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("🔍 Loaded {} bytes from {}", image.len(), path);
    println!("🚀 Launching debugger...");

    if let Err(e) = run_debugger(config, image) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config: RunConfig) {
    eprintln!("❌ Built without the `tui` feature");
    std::process::exit(1);
}

fn disassemble_file(path: &str, base: u16) {
    let image = match load_image(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    print!("{}", i8080::disassemble(&image, base));
}

fn run_self_test() {
    use i8080::cpu::alu;
    use i8080::Flags;

    println!("━━━ i8080 Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    let mut flags = Flags { carry: true, ..Flags::default() };
    let r = alu::adc(&mut flags, 0x42, 0x3D);
    check("ADC 42+3D+1 = 80", r == 0x80 && flags.sign && !flags.carry);

    let mut flags = Flags::default();
    let r = alu::sub(&mut flags, 0x3E, 0x3E);
    check("SUB A,A clears A", r == 0 && flags.zero && flags.parity && !flags.carry);

    let mut flags = Flags::default();
    let r = alu::sub(&mut flags, 0x01, 0x02);
    check("SUB 01-02 borrows", r == 0xFF && flags.carry);

    let mut flags = Flags::default();
    let r = alu::daa(&mut flags, 0x9B);
    check("DAA 9B = 01 carry", r == 0x01 && flags.carry && flags.aux_carry);

    let mut flags = Flags::default();
    let r = alu::dad(&mut flags, 0xFFFF, 0x0001);
    check("DAD carry out", r == 0 && flags.carry && !flags.zero);

    let mut cpu = Cpu::new();
    let program = [0x3E, 0x05, 0x06, 0x03, 0x80, 0x76]; // MVI A,5; MVI B,3; ADD B; HLT
    let ran = cpu.load_program(0, &program).is_ok() && cpu.run().is_ok();
    check("CPU MVI/ADD/HLT", ran && cpu.is_halted() && cpu.regs.a == 8);

    let mut cpu = Cpu::with_traps(i8080::TrapTable::cpm());
    let program = [0x0E, 0x02, 0x1E, b'*', 0xCD, 0x05, 0x00, 0xC3, 0x00, 0x00];
    let ran = cpu.load_program(0x0100, &program).is_ok() && {
        cpu.regs.pc = 0x0100;
        cpu.run().is_ok()
    };
    check("CP/M BDOS console output", ran && cpu.state == CpuState::Stopped && cpu.console() == b"*");

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
