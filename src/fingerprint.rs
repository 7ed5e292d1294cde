//! 元データの指紋
//!
//! 同じ内容のファイルを読み直したときに割当を引き継ぐための SHA-256（16進）。

use sha2::{Digest, Sha256};

pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
