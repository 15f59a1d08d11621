use std::{fs, path::PathBuf};

use anyhow::Result;
use clap::Args;

use crate::input::{mmap_file, open_reader};

#[derive(Args)]
pub struct SchemaArgs {
    /// Path to the container file
    input: PathBuf,

    /// Print the parsing canonical form instead of the full schema
    #[arg(long)]
    canonical: bool,

    /// Also print the Rabin and SHA-256 fingerprints of the canonical form
    #[arg(long)]
    fingerprint: bool,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl SchemaArgs {
    pub fn run(self) -> Result<()> {
        let mmap = mmap_file(&self.input)?;
        let reader = open_reader(&mmap, None)?;
        let schema = reader.writer_schema();

        let mut text = if self.canonical {
            schema.canonical_form()
        } else {
            serde_json::to_string_pretty(&schema.to_json())?
        };
        if self.fingerprint {
            text.push_str(&format!("\nrabin\t{:016x}", schema.fingerprint64()));
            text.push_str(&format!(
                "\nsha256\t{}",
                hex::encode(schema.fingerprint_sha256())
            ));
        }

        match self.output {
            Some(path) => fs::write(path, format!("{text}\n"))?,
            None => println!("{text}"),
        }
        Ok(())
    }
}
