//! Content hashes of pin files.

use sha2::{Digest, Sha256};

pub(crate) fn sha256_hex_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash of a set of files: the file hash itself for one file, otherwise the
/// hash of the concatenated per-file hex digests.
pub(crate) fn combine_file_hashes(hashes: &[String]) -> String {
    match hashes {
        [single] => single.clone(),
        _ => sha256_hex_bytes(hashes.concat().as_bytes()),
    }
}

/// `pin_hash` of the given file contents, in file order.
pub(crate) fn pin_hash<B: AsRef<[u8]>>(contents: &[B]) -> String {
    let hashes: Vec<String> = contents
        .iter()
        .map(|c| sha256_hex_bytes(c.as_ref()))
        .collect();
    combine_file_hashes(&hashes)
}
