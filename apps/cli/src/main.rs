use std::process;
use std::time::Duration;

use anyhow::Result;
use blkdetect_core::{resolve, DetectString};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "blkdetect",
    version,
    about = "Resolve a detect:<NAME>:<SIZE>:<INDEX> string to a block device path"
)]
struct Args {
    /// Detect string, e.g. detect:SAMSUNG:480GB:0
    detect_string: String,

    /// Seconds an inventory command may run before it is killed
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Usage problems share the failure exit code; --help and
            // --version keep their conventional success exit.
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    let descriptor = DetectString::parse(&args.detect_string)?;
    match resolve(&descriptor, Duration::from_secs(args.timeout)) {
        Some(path) => {
            println!("{}", path);
            Ok(())
        }
        None => process::exit(1),
    }
}
