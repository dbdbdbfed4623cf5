//! Content fingerprints for source files.
//!
//! A fingerprint is the lowercase hex SHA-1 of a file's bytes, fed to the
//! hasher in fixed 64 KiB blocks so large media never has to sit in memory.
//! Content-based rather than mtime-based: it survives `git checkout` and
//! copies that reset timestamps.
//!
//! Nothing in the generation pipeline consumes fingerprints yet; the
//! `fingerprint` CLI command exposes them directly.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;

/// Read size used by [`fingerprint`].
pub const BLOCK_SIZE: usize = 64 * 1024;

/// SHA-1 of everything `reader` yields, as lowercase hex.
///
/// Consumes the reader to EOF. Read errors propagate unchanged.
pub fn fingerprint<R: Read>(reader: R) -> io::Result<String> {
    fingerprint_with_block_size(reader, BLOCK_SIZE)
}

/// [`fingerprint`] with an explicit block size. The digest does not depend on it.
pub fn fingerprint_with_block_size<R: Read>(mut reader: R, block_size: usize) -> io::Result<String> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; block_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint the file at `path`.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    fingerprint(File::open(path)?)
}
