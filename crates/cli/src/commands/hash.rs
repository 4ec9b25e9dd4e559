use std::io::Write;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use vhash_core::app::{self, RunOptions};

use crate::output::Sink;
use crate::CommonArgs;

pub fn run(opts: RunOptions, args: &CommonArgs) -> Result<()> {
    let progress = if args.no_progress || args.silent {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}").unwrap(),
        );
        bar
    };

    log::info!("hashing {}", args.path.display());
    let results = app::run_hash(&args.path, &opts, &|done, total| {
        progress.set_length(total as u64);
        progress.set_position(done as u64);
    })?;
    progress.finish_and_clear();
    log::info!("hashed {} file(s)", results.len());

    let mut sink = Sink::open(args.output.as_deref())?;
    for file in &results {
        writeln!(sink, "HASH: 0x{:016x}", file.hash)?;
        writeln!(sink, "FILE: {}", file.path.display())?;
        writeln!(sink)?;
    }
    sink.flush()?;

    Ok(())
}
