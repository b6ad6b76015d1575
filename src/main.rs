use clap::Parser;
use log::info;
use mid2cpp::midi::reader::DEFAULT_VELOCITY_THRESHOLD;
use mid2cpp::midi::ReaderOptions;
use std::path::PathBuf;

/// Where the interpreter expects the generated header
const DEFAULT_OUTPUT: &str = "kernel/src/sound/midi_data.h";

#[derive(Parser, Debug)]
#[command(name = "mid2cpp")]
#[command(version = "0.1.0")]
#[command(about = "MIDI to music bytecode header compiler", long_about = None)]
struct Args {
    /// Input MIDI file (.mid, or .gz compressed)
    input: PathBuf,

    /// Output C++ header
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Drop note-on events quieter than this
    #[arg(short = 't', long, default_value_t = DEFAULT_VELOCITY_THRESHOLD)]
    velocity_threshold: u8,
}

fn main() -> Result<(), mid2cpp::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Processing '{}'...", args.input.display());

    let compiler = mid2cpp::Compiler::with_options(ReaderOptions {
        velocity_threshold: args.velocity_threshold,
    });
    compiler.compile_file(&args.input, &args.output)?;

    Ok(())
}
