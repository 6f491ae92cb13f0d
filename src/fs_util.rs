use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::KiraError;

/// Opens a text input, decompressing it when the name ends in `.gz`.
pub fn open_text(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Writes `dest` through a temporary sibling file that replaces it only once
/// `write` and the final flush both succeeded.
pub fn write_atomic<F>(dest: &Path, write: F) -> Result<(), KiraError>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let write_err = |err: &dyn std::fmt::Display| KiraError::Write {
        path: dest.to_path_buf(),
        message: err.to_string(),
    };
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = tempfile::Builder::new()
        .prefix(".kira-saint")
        .tempfile_in(parent)
        .map_err(|err| write_err(&err))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer).map_err(|err| write_err(&err))?;
        writer.flush().map_err(|err| write_err(&err))?;
    }
    temp.persist(dest).map_err(|err| write_err(&err.error))?;
    Ok(())
}
