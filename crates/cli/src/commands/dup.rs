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

    log::info!("scanning {} for duplicates", args.path.display());
    let groups = app::run_dup(&args.path, &opts, &|done, total| {
        progress.set_length(total as u64);
        progress.set_position(done as u64);
    })?;
    progress.finish_and_clear();
    log::info!("found {} duplicate group(s)", groups.len());

    let mut sink = Sink::open(args.output.as_deref())?;
    for (hash, paths) in &groups {
        writeln!(sink, "HASH: 0x{:016x}", hash)?;
        for path in paths {
            writeln!(sink, "FILE: {}", path.display())?;
        }
        writeln!(sink)?;
    }
    sink.flush()?;

    Ok(())
}
