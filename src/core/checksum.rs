//! 校验和 - 本地流式 SHA-256 以及远程原生编码的转换
//!
//! 远程存储的校验和格式为 `sha2:<base64(digest)>`，本地统一使用小写十六进制。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// 流式读取的分块大小
pub const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 在远程存储中的算法标记
const SHA256_TAG: &str = "sha2:";

/// 计算本地文件的 SHA-256（小写十六进制），不会把整个文件读入内存
pub async fn local_digest(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// 把远程原生校验和转换为十六进制摘要
///
/// 没有值、算法不是 SHA-256 或者内容无法解码时返回 `None`，表示无法比较。
pub fn normalize_remote_digest(raw: Option<&str>) -> Option<String> {
    let payload = raw?.strip_prefix(SHA256_TAG)?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some(hex::encode(bytes))
}

/// 生成远程原生格式的校验和
pub fn encode_native_checksum(digest: &[u8]) -> String {
    format!("{}{}", SHA256_TAG, STANDARD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // sha256("hello world")
    const HELLO_HEX: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[tokio::test]
    async fn test_local_digest_spans_chunks() {
        let dir = TempDir::new().unwrap();
        let small = dir.path().join("small.txt");
        std::fs::write(&small, b"hello world").unwrap();
        assert_eq!(local_digest(&small).await.unwrap(), HELLO_HEX);

        let data: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let big = dir.path().join("big.bin");
        std::fs::write(&big, &data).unwrap();
        assert_eq!(
            local_digest(&big).await.unwrap(),
            hex::encode(Sha256::digest(&data))
        );
    }

    #[test]
    fn test_normalize_remote_digest() {
        let native = encode_native_checksum(&hex::decode(HELLO_HEX).unwrap());
        assert_eq!(
            normalize_remote_digest(Some(&native)).as_deref(),
            Some(HELLO_HEX)
        );
    }

    #[test]
    fn test_normalize_rejects_unknown_tags() {
        assert_eq!(normalize_remote_digest(None), None);
        // 未带标记的旧式 MD5
        assert_eq!(
            normalize_remote_digest(Some("5eb63bbbe01eeed093cb22bb8f5acdc3")),
            None
        );
        assert_eq!(normalize_remote_digest(Some("md5:XrY7u+Ae7tCTyyK7j1rNww==")), None);
        assert_eq!(normalize_remote_digest(Some("sha2:@@not-base64@@")), None);
    }
}
