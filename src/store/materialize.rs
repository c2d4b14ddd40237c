use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{Error, IoResultExt, Result};
use crate::fs::{create_new, fill_or_remove};
use crate::store::BlobMapping;

/// copy newly planned blobs from the source tree into the storage directory
///
/// every blob is created exclusively: a name that appeared since planning is
/// an error, never overwritten. returns the number of bytes copied.
pub fn materialize(added: &[BlobMapping], source_dir: &Path, storage_dir: &Path) -> Result<u64> {
    let mut total = 0;
    for mapping in added {
        let src = source_dir.join(&mapping.install_path);
        let dst = storage_dir.join(&mapping.storage_name);
        total += copy_blob(&src, &dst)?;
        tracing::debug!(blob = %mapping.storage_name, from = %src.display(), "stored blob");
    }
    Ok(total)
}

fn copy_blob(src: &Path, dst: &Path) -> Result<u64> {
    let mut input = File::open(src).for_read(src)?;

    let output = match create_new(dst) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(Error::FileWrite {
                path: dst.to_path_buf(),
                source: e,
            })
        }
        Err(e) => return Err(e).for_write(dst),
    };

    // a truncated blob would be served under a content-derived name
    fill_or_remove(dst, output, |output| copy_contents(&mut input, output, src, dst))
}

fn copy_contents(input: &mut File, output: &mut File, src: &Path, dst: &Path) -> Result<u64> {
    let mut buf = [0u8; 64 * 1024]; // 64KB buffer
    let mut total = 0u64;
    loop {
        let n = input.read(&mut buf).for_read(src)?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n]).for_write(dst)?;
        total += n as u64;
    }
    output.sync_all().for_write(dst)?;
    Ok(total)
}
