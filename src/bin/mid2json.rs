//! MIDI to JSON inspector

use clap::Parser;
use mid2cpp::bytecode::ProgramJson;
use mid2cpp::midi::reader::DEFAULT_VELOCITY_THRESHOLD;
use mid2cpp::midi::{self, ReaderOptions};
use mid2cpp::Compiler;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mid2json")]
#[command(version = "0.1.0")]
#[command(about = "Dump the decoded timeline and compiled bytecode of a MIDI file as JSON", long_about = None)]
struct Args {
    /// Input MIDI file (.mid, or .gz compressed)
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,

    /// Include the note frequency table
    #[arg(short, long)]
    freq_table: bool,

    /// Drop note-on events quieter than this
    #[arg(short = 't', long, default_value_t = DEFAULT_VELOCITY_THRESHOLD)]
    velocity_threshold: u8,
}

fn main() -> Result<(), mid2cpp::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let data = midi::load_file(&args.input)?;

    let compiler = Compiler::with_options(ReaderOptions {
        velocity_threshold: args.velocity_threshold,
    });
    let (decoded, program) = compiler.compile_bytes(&data)?;

    let json = ProgramJson::new(&decoded, &program, args.freq_table)?;

    let json_string = if args.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
