use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use thiserror::Error;

use crate::persist::AtomicFileWriter;
use crate::PersistError;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported format: {mime}")]
    Unsupported { mime: String },
    #[error("decode/encode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("write failed: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressOutcome {
    /// The file was replaced with a smaller re-encode.
    Recompressed { original_bytes: u64, new_bytes: u64 },
    /// Re-encoding did not shrink the file; the original was kept.
    AlreadyOptimal { bytes: u64 },
}

/// Image recompression seam. Implementations replace the file in place
/// and must keep the original when the result is not smaller.
pub trait Codec: Send + Sync {
    fn compress(&self, path: &Path, quality: u8) -> Result<CompressOutcome, CodecError>;
}

/// Re-encodes JPEG at the configured quality and PNG at the default
/// compression level. Other formats are reported as unsupported rather
/// than touched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReencodeCodec;

impl Codec for ReencodeCodec {
    fn compress(&self, path: &Path, quality: u8) -> Result<CompressOutcome, CodecError> {
        let original_bytes = fs::metadata(path)?.len();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let decoded = image::open(path)?;
        let mut encoded = Vec::new();
        match extension.as_str() {
            "jpg" | "jpeg" => {
                let encoder =
                    JpegEncoder::new_with_quality(Cursor::new(&mut encoded), quality.clamp(1, 100));
                decoded.write_with_encoder(encoder)?;
            }
            "png" => {
                let encoder = PngEncoder::new(Cursor::new(&mut encoded));
                decoded.write_with_encoder(encoder)?;
            }
            other => {
                return Err(CodecError::Unsupported {
                    mime: other.to_string(),
                })
            }
        }

        let new_bytes = encoded.len() as u64;
        if new_bytes >= original_bytes {
            return Ok(CompressOutcome::AlreadyOptimal {
                bytes: original_bytes,
            });
        }

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| CodecError::Io(io::Error::other("image has no file name")))?;
        AtomicFileWriter::new(parent.to_path_buf()).write(filename, &encoded)?;

        Ok(CompressOutcome::Recompressed {
            original_bytes,
            new_bytes,
        })
    }
}
