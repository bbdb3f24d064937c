use std::fs::File;
use std::io::Read;
use std::path::Path;

use failure::{Error, ResultExt};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::package::ChecksumType;

trait Hash {
    fn update(&mut self, buf: &[u8]);
    fn hexdigest(self) -> String;
}

impl<T> Hash for T where T: Digest {
    fn update(&mut self, buf: &[u8]) {
        self.input(buf);
    }

    fn hexdigest(self) -> String {
        hex::encode(self.result())
    }
}

/// Hex digest of the file at `path`, e.g. the source metadata a store is built from.
pub fn hexdigest_path(path: &Path, hash_type: ChecksumType) -> Result<String, Error> {
    let file = File::open(path).with_context(|_| format!("File::open({:?}) failed", path))?;
    hexdigest_read(file, hash_type)
}

pub fn hexdigest_read<R: Read>(r: R, hash_type: ChecksumType) -> Result<String, Error> {
    match hash_type {
        ChecksumType::Md5 => hexdigest_read_1(r, Md5::new()),
        ChecksumType::Sha1 => hexdigest_read_1(r, Sha1::new()),
        ChecksumType::Sha224 => hexdigest_read_1(r, Sha224::new()),
        ChecksumType::Sha256 => hexdigest_read_1(r, Sha256::new()),
        ChecksumType::Sha384 => hexdigest_read_1(r, Sha384::new()),
        ChecksumType::Sha512 => hexdigest_read_1(r, Sha512::new()),
    }
}

fn hexdigest_read_1<R, H>(mut r: R, mut hash: H) -> Result<String, Error> where
    R: Read,
    H: Hash,
{
    let mut buf = [0 as u8; 8192];
    loop {
        let n = r.read(&mut buf).context("read() failed")?;
        if n == 0 {
            break Ok(hash.hexdigest());
        }
        hash.update(&buf[0..n]);
    }
}
