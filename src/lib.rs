// src/lib.rs
pub mod decryptor {
    use std::fs;
    use std::path::PathBuf;

    use anyhow::Context;

    use crate::report::DecryptReport;

    pub struct Options {
        pub input: PathBuf,
        pub output: PathBuf,
        pub pid: u16,
    }

    /// Synchronous entry-point; reads the segment, decrypts it in place,
    /// and writes the output only when the whole run succeeded.
    pub fn run(opts: Options) -> anyhow::Result<DecryptReport> {
        let mut data = fs::read(&opts.input)
            .with_context(|| format!("failed to read {:?}", opts.input))?;

        let report = crate::processor::decrypt_segment(&mut data, opts.pid)?;

        fs::write(&opts.output, &data)
            .with_context(|| format!("failed to write {:?}", opts.output))?;
        Ok(report)
    }
}

pub mod constants;
pub mod nal;
pub mod processor;
pub mod report;
pub mod tea;
pub mod types;

pub use processor::{PacketProcessor, decrypt_segment};
pub use report::DecryptReport;
pub use types::TsError;
