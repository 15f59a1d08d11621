use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::input::{mmap_file, open_reader};

#[derive(Args)]
pub struct MetaArgs {
    /// Path to the container file
    input: PathBuf,
}

impl MetaArgs {
    pub fn run(self) -> Result<()> {
        let mmap = mmap_file(&self.input)?;
        let reader = open_reader(&mmap, None)?;
        let header = reader.header();

        for (key, value) in header.metadata() {
            match std::str::from_utf8(value) {
                Ok(text) => println!("{key}\t{text}"),
                Err(_) => println!("{key}\t0x{}", hex::encode(value)),
            }
        }
        println!("sync\t0x{}", hex::encode(header.sync_marker()));
        Ok(())
    }
}
