use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::Mmap;

/// Threshold in bytes above which we attempt to use mmap for reading.
/// Callers can override via API; this is a reasonable default.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Timestamp layout embedded in report and backup file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Raw input lines without their `\n` / `\r\n` terminator.
pub type LineIter = Box<dyn Iterator<Item = io::Result<Vec<u8>>> + Send + 'static>;

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Iterate lines from a file path using buffered reader (non-mmap).
/// Lines stay as bytes; decoding is the parser's call.
pub fn iter_lines_bufread<P: AsRef<Path>>(path: P) -> Result<LineIter> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let lines = reader
        .split(b'\n')
        .map(|chunk| chunk.map(strip_cr));
    Ok(Box::new(lines))
}

/// Iterate lines from a file path using mmap. This avoids copying but still
/// allocates per-returned line; it scans for '\n' boundaries.
pub fn iter_lines_mmap<P: AsRef<Path>>(path: P) -> Result<LineIter> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.as_ref().display()))?;
    let iter = MmapLines { mmap, pos: 0 };
    Ok(Box::new(iter))
}

struct MmapLines {
    mmap: Mmap,
    pos: usize,
}

impl Iterator for MmapLines {
    type Item = io::Result<Vec<u8>>;
    fn next(&mut self) -> Option<Self::Item> {
        let data: &[u8] = &self.mmap;
        if self.pos >= data.len() {
            return None;
        }
        let start = self.pos;
        if let Some(off) = memchr::memchr(b'\n', &data[self.pos..]) {
            let end = self.pos + off;
            self.pos = end + 1; // skip newline
            Some(Ok(strip_cr(data[start..end].to_vec())))
        } else {
            // Last line without trailing newline
            self.pos = data.len();
            Some(Ok(strip_cr(data[start..].to_vec())))
        }
    }
}

fn strip_cr(mut bytes: Vec<u8>) -> Vec<u8> {
    // Trim a trailing '\r' if present (handle Windows CRLF)
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    bytes
}

/// Choose mmap or bufread and return an iterator over lines.
pub fn iter_lines_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<LineIter> {
    let meta =
        std::fs::metadata(&path).with_context(|| format!("stat {}", path.as_ref().display()))?;
    if meta.is_file() && meta.len() > 0 && should_use_mmap(meta.len(), threshold_bytes) {
        iter_lines_mmap(path)
    } else {
        iter_lines_bufread(path)
    }
}

/// Create `<dir>/<base>.<ext>` without clobbering an existing file. When the
/// name is taken (two runs within the same second) a `-N` suffix is added.
pub fn create_unique_file(dir: &Path, base: &str, ext: &str) -> io::Result<(PathBuf, File)> {
    let mut candidate = dir.join(format!("{base}.{ext}"));
    for n in 1..=1000 {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = dir.join(format!("{base}-{n}.{ext}"));
            }
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {base}.{ext} in {}", dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn bufread_and_mmap_agree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, b"alice:pw1\r\nbob:pw2\n\xffcarol:pw3").unwrap();

        let buffered: Vec<Vec<u8>> = iter_lines_bufread(&path)
            .unwrap()
            .map(|l| l.unwrap())
            .collect();
        let mapped: Vec<Vec<u8>> = iter_lines_mmap(&path).unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(buffered, mapped);
        assert_eq!(buffered.len(), 3);
        assert_eq!(buffered[0], b"alice:pw1");
        // invalid bytes come through untouched
        assert_eq!(buffered[2], b"\xffcarol:pw3");
    }

    #[test]
    fn auto_handles_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"").unwrap();
        assert_eq!(iter_lines_auto(&path, 0).unwrap().count(), 0);
    }

    #[test]
    fn unique_file_does_not_clobber() {
        let dir = tempdir().unwrap();
        let (first, _) = create_unique_file(dir.path(), "report", "txt").unwrap();
        let (second, _) = create_unique_file(dir.path(), "report", "txt").unwrap();
        assert_ne!(first, second);
        assert_eq!(first.file_name().unwrap(), "report.txt");
        assert_eq!(second.file_name().unwrap(), "report-1.txt");
    }
}
