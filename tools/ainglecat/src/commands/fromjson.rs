use std::{
    fs,
    io::{BufRead, BufReader, BufWriter},
    path::PathBuf,
};

use aingle::{CodecRegistry, DEFAULT_SYNC_INTERVAL, FileWriterBuilder, core::json_to_value};
use anyhow::{Context, Result, anyhow};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::input::read_schema;

#[derive(Args)]
pub struct FromJsonArgs {
    /// Schema file of the records
    schema: PathBuf,

    /// JSON lines input, one record per line
    input: PathBuf,

    /// Output container file
    #[arg(short, long)]
    output: PathBuf,

    /// Block codec
    #[arg(short, long, default_value = "null")]
    codec: String,

    /// Approximate uncompressed block size in bytes
    #[arg(long, default_value_t = DEFAULT_SYNC_INTERVAL)]
    sync_interval: usize,
}

impl FromJsonArgs {
    pub fn run(self) -> Result<()> {
        let schema = read_schema(&self.schema)?;
        let codecs = CodecRegistry::default();
        let codec = codecs.create(&self.codec).ok_or_else(|| {
            anyhow!(
                "unknown codec '{}' (available: {})",
                self.codec,
                codecs.names().join(", ")
            )
        })?;

        let input = BufReader::new(
            fs::File::open(&self.input)
                .with_context(|| format!("failed to open {}", self.input.display()))?,
        );
        let sink = BufWriter::new(fs::File::create(&self.output)?);
        let mut writer = FileWriterBuilder::new(schema.clone())
            .with_codec(codec)
            .with_sync_interval(self.sync_interval)
            .build(sink)?;

        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {pos} records ({per_sec})",
        )?);

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let lineno = index + 1;
            let json: serde_json::Value = serde_json::from_str(&line)
                .with_context(|| format!("line {lineno}: invalid JSON"))?;
            let value = json_to_value(&json, schema.root(), schema.names())
                .with_context(|| format!("line {lineno}: record does not match the schema"))?;
            writer
                .append(&value)
                .with_context(|| format!("line {lineno}: failed to append"))?;
            pb.inc(1);
        }

        writer.close()?;
        pb.finish_with_message("done");
        Ok(())
    }
}
