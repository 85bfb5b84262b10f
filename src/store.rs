//! Collaborator seam for raw object retrieval, plus payload decoding.

use std::io::Read;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{ShipperError, ShipperResult};

/// Object storage the raw log files are fetched from.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the raw bytes of one object.
    async fn fetch(&self, bucket: &str, key: &str) -> ShipperResult<Vec<u8>>;
}

/// Gunzip a fetched log object into text.
pub fn gunzip(bytes: &[u8]) -> ShipperResult<String> {
    debug!(compressed_bytes = bytes.len(), "decompressing log object");
    let mut text = String::new();
    GzDecoder::new(bytes)
        .read_to_string(&mut text)
        .map_err(|e| ShipperError::decompress(e.to_string()))?;
    Ok(text)
}

/// Decode an uncompressed log object as UTF-8 text.
pub fn decode_plaintext(bytes: Vec<u8>) -> ShipperResult<String> {
    String::from_utf8(bytes).map_err(|e| ShipperError::decompress(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    pub(crate) fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gunzip_round() {
        let text = "line one\nline two\n";
        assert_eq!(gunzip(&gzip(text)).unwrap(), text);
    }

    #[test]
    fn test_gunzip_rejects_corrupt_data() {
        let err = gunzip(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, ShipperError::Decompress(_)));
    }

    #[test]
    fn test_decode_plaintext() {
        assert_eq!(decode_plaintext(b"plain".to_vec()).unwrap(), "plain");
        assert!(decode_plaintext(vec![0xff, 0xfe]).is_err());
    }
}
