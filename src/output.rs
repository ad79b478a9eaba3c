//! Human-readable rendering and persistence of found keys.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::worker::FoundResult;

/// Renders a found key as a text block.
///
/// The PKCS#8 export is only included when `include_pkcs8` is set.
pub fn format_record(result: &FoundResult, include_pkcs8: bool) -> String {
    let mut record = format!(
        "-------------------\n\
         KEY FOUND :)!\n\
         OpenSSH Private Key:\n{}\n\
         Public Key:\n{}\n\
         -------------------\n",
        result.private_key_openssh.trim_end(),
        result.authorized_key(),
    );
    if include_pkcs8 {
        record.push_str("PKCS#8 Private Key:\n");
        record.push_str(result.private_key_pkcs8.trim_end());
        record.push('\n');
    }
    record
}

/// Appends a found key to `path`, creating the file if needed.
pub fn append_record(path: &Path, result: &FoundResult, include_pkcs8: bool) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file)?;
    file.write_all(format_record(result, include_pkcs8).as_bytes())?;
    file.flush()
}
