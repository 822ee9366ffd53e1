//! Streaming content hashes for secure files.

use std::path::Path;

use tokio::io::AsyncReadExt;

const READ_BUF: usize = 64 * 1024;

/// Lowercase hex MD5 of the file at `path`, read in fixed-size chunks.
pub async fn md5_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut ctx = md5::Context::new();
    let mut buf = vec![0u8; READ_BUF];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(format!("{:x}", ctx.compute()))
}

/// Lowercase hex MD5 of an in-memory buffer.
pub fn md5_bytes(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Compare two hex digests, ignoring case.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
