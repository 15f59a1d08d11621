use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rayon::prelude::*;
use tracing::debug;

use crate::input::{mmap_file, open_reader};

#[derive(Args)]
pub struct CountArgs {
    /// Path to the container file
    input: PathBuf,

    /// Number of byte ranges read in parallel (default: one per thread)
    #[arg(short, long)]
    splits: Option<u64>,
}

impl CountArgs {
    pub fn run(self) -> Result<()> {
        let mmap = mmap_file(&self.input)?;
        let data: &[u8] = &mmap;
        let len = data.len() as u64;
        let splits = self
            .splits
            .unwrap_or(rayon::current_num_threads() as u64)
            .clamp(1, len.max(1));
        let split_len = len.div_ceil(splits);

        let total = (0..splits)
            .into_par_iter()
            .map(|i| {
                let start = i * split_len;
                let end = (start + split_len).min(len);
                count_range(data, start, end)
            })
            .sum::<Result<u64>>()?;

        println!("{total}");
        Ok(())
    }
}

/// Records in the blocks whose leading sync marker starts in `start..end`.
fn count_range(data: &[u8], start: u64, end: u64) -> Result<u64> {
    let mut reader = open_reader(data, None)?;
    reader.sync(start)?;
    let mut count = 0;
    while reader.has_next()? && !reader.past_sync(end) {
        reader.next_value()?;
        count += 1;
    }
    debug!(start, end, count, "counted split");
    Ok(count)
}
