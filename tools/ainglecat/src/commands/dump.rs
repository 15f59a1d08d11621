use std::{
    fs,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use aingle::core::value_to_json;
use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::input::{mmap_file, open_reader, read_schema};

#[derive(Args)]
pub struct DumpArgs {
    /// Path to the container file
    input: PathBuf,

    /// Schema file to resolve records into (writer schema if not specified)
    #[arg(long)]
    reader_schema: Option<PathBuf>,

    /// Stop after this many records
    #[arg(short = 'n', long)]
    limit: Option<u64>,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl DumpArgs {
    pub fn run(self) -> Result<()> {
        let reader_schema = self.reader_schema.as_deref().map(read_schema).transpose()?;
        let mmap = mmap_file(&self.input)?;
        let reader = open_reader(&mmap, reader_schema)?;

        let mut dest: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(fs::File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {pos} records ({per_sec})",
        )?);

        let limit = self.limit.unwrap_or(u64::MAX);
        for (index, value) in (0..limit).zip(reader) {
            let value = value.with_context(|| format!("failed to read record {index}"))?;
            serde_json::to_writer(&mut dest, &value_to_json(&value))?;
            dest.write_all(b"\n")?;
            pb.inc(1);
        }

        dest.flush()?;
        pb.finish_with_message("done");
        Ok(())
    }
}
