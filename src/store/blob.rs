//! Blob type - the unit of content-addressed storage

use crate::model::Reference;
use serde::{Deserialize, Serialize};

/// Type tag for blobs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobType {
    /// An encoded trie node record
    Node,
    /// Raw file content addressed by a trie entry
    Content,
}

impl BlobType {
    pub fn as_byte(&self) -> u8 {
        match self {
            BlobType::Node => 0,
            BlobType::Content => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(BlobType::Node),
            1 => Some(BlobType::Content),
            _ => None,
        }
    }
}

/// A blob is a typed, compressed chunk of data
#[derive(Clone, Debug)]
pub struct Blob {
    /// Type of content
    pub blob_type: BlobType,
    /// Raw data (uncompressed)
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob
    pub fn new(blob_type: BlobType, data: Vec<u8>) -> Self {
        Blob { blob_type, data }
    }

    /// Compute the content address
    pub fn reference(&self) -> Reference {
        // Include type so a node record and identical raw content never collide
        Reference::digest_many(&[&[self.blob_type.as_byte()], &self.data])
    }

    /// Compress the blob for storage
    pub fn compress(&self) -> crate::Result<Vec<u8>> {
        let mut output = Vec::new();
        output.push(self.blob_type.as_byte());
        let compressed = zstd::encode_all(self.data.as_slice(), 3)?;
        output.extend(compressed);
        Ok(output)
    }

    /// Decompress a blob from storage
    pub fn decompress(data: &[u8]) -> crate::Result<Self> {
        let (&type_byte, payload) = data
            .split_first()
            .ok_or_else(|| crate::Error::Corruption("Empty blob data".into()))?;

        let blob_type = BlobType::from_byte(type_byte)
            .ok_or_else(|| crate::Error::Corruption(format!("Invalid blob type: {}", type_byte)))?;

        Ok(Blob {
            blob_type,
            data: zstd::decode_all(payload)?,
        })
    }

    /// Unwrap the payload, failing if the blob is not of the expected type
    pub fn into_data(self, expected: BlobType) -> crate::Result<Vec<u8>> {
        if self.blob_type != expected {
            return Err(crate::Error::Corruption(format!(
                "Expected {:?}, got {:?}",
                expected, self.blob_type
            )));
        }
        Ok(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_compress_keeps_type_and_data() {
        let original = Blob::new(BlobType::Node, b"hello world".to_vec());
        let compressed = original.compress().unwrap();
        let restored = Blob::decompress(&compressed).unwrap();

        assert_eq!(original.blob_type, restored.blob_type);
        assert_eq!(original.data, restored.data);
    }

    #[test]
    fn test_blob_reference_includes_type() {
        let node = Blob::new(BlobType::Node, b"data".to_vec());
        let content = Blob::new(BlobType::Content, b"data".to_vec());

        assert_ne!(node.reference(), content.reference());
    }

    #[test]
    fn test_into_data_checks_type() {
        let blob = Blob::new(BlobType::Content, b"data".to_vec());
        assert!(matches!(
            blob.clone().into_data(BlobType::Node),
            Err(crate::Error::Corruption(_))
        ));
        assert_eq!(blob.into_data(BlobType::Content).unwrap(), b"data");
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(Blob::decompress(&[]).is_err());
        assert!(Blob::decompress(&[9, 1, 2, 3]).is_err());
    }
}
