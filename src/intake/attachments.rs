//! Attachment decoding.
//!
//! Every attachment is decoded on its own blocking worker; the batch waits
//! for all of them before returning. A failure on one attachment does not
//! stop the others, and every failure is reported.

use futures_util::future::join_all;
use image::{GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::config::TriageConfig;
use crate::triage::types::{AttachmentDecodeFailure, ImageBlob, ImageKind, TriageError};

/// An attachment as received from the UI, before decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawAttachment {
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl RawAttachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Decode a batch of attachments concurrently.
///
/// Count and size limits are checked before any decoding starts. Zero-byte
/// files are skipped. Returns the decoded blobs in submission order, or
/// `AttachmentDecode` listing every attachment that failed.
pub async fn decode_attachments(
    raw: Vec<RawAttachment>,
    config: &TriageConfig,
) -> Result<Vec<ImageBlob>, TriageError> {
    if raw.len() > config.max_attachments {
        return Err(TriageError::TooManyAttachments {
            count: raw.len(),
            max: config.max_attachments,
        });
    }

    let max = config.max_attachment_bytes;
    if let Some((index, oversized)) = raw.iter().enumerate().find(|(_, a)| a.bytes.len() > max) {
        return Err(TriageError::AttachmentTooLarge {
            index,
            filename: oversized.filename.clone(),
            bytes: oversized.bytes.len(),
            max,
        });
    }

    let filenames: Vec<String> = raw.iter().map(|a| a.filename.clone()).collect();

    let tasks = raw.into_iter().enumerate().map(|(index, attachment)| {
        tokio::task::spawn_blocking(move || decode_one(index, attachment))
    });
    let joined = join_all(tasks).await;

    let mut blobs = Vec::new();
    let mut failures = Vec::new();

    for (index, outcome) in joined.into_iter().enumerate() {
        match outcome {
            Ok(Ok(Some(blob))) => blobs.push(blob),
            Ok(Ok(None)) => {
                tracing::debug!(index, "Skipping empty attachment");
            }
            Ok(Err(failure)) => failures.push(failure),
            Err(join_error) => failures.push(AttachmentDecodeFailure {
                index,
                filename: filenames[index].clone(),
                reason: format!("decode task failed: {join_error}"),
            }),
        }
    }

    if !failures.is_empty() {
        for failure in &failures {
            tracing::warn!(
                index = failure.index,
                reason = %failure.reason,
                "Attachment could not be decoded"
            );
        }
        return Err(TriageError::AttachmentDecode(failures));
    }

    Ok(blobs)
}

/// Decode a single attachment. `Ok(None)` for an empty file.
pub fn decode_one(
    index: usize,
    attachment: RawAttachment,
) -> Result<Option<ImageBlob>, AttachmentDecodeFailure> {
    let RawAttachment { filename, bytes } = attachment;

    if bytes.is_empty() {
        return Ok(None);
    }

    let fail = |reason: String| AttachmentDecodeFailure {
        index,
        filename: filename.clone(),
        reason,
    };

    let format = image::guess_format(&bytes)
        .map_err(|e| fail(format!("unrecognized image data: {e}")))?;
    let kind = match format {
        ImageFormat::Jpeg => ImageKind::Jpeg,
        ImageFormat::Png => ImageKind::Png,
        other => return Err(fail(format!("unsupported image format {other:?}"))),
    };

    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| fail(format!("corrupt image: {e}")))?;

    Ok(Some(ImageBlob {
        filename,
        bytes,
        format: Some(kind),
        dimensions: Some(decoded.dimensions()),
    }))
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

    use super::*;

    fn encoded(format: ImageOutputFormat, width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 80, 60])));
        let mut bytes = Vec::new();
        img.write_to(&mut bytes, format).unwrap();
        bytes
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        encoded(ImageOutputFormat::Png, width, height)
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        encoded(ImageOutputFormat::Jpeg(90), width, height)
    }

    #[tokio::test]
    async fn decodes_png_and_jpeg_in_order() {
        let raw = vec![
            RawAttachment::new("rash.png", png(8, 6)),
            RawAttachment::new("eye.jpg", jpeg(4, 4)),
        ];
        let blobs = decode_attachments(raw, &TriageConfig::immediate()).await.unwrap();

        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].filename, "rash.png");
        assert_eq!(blobs[0].format, Some(ImageKind::Png));
        assert_eq!(blobs[0].dimensions, Some((8, 6)));
        assert_eq!(blobs[1].format, Some(ImageKind::Jpeg));
        assert_eq!(blobs[1].dimensions, Some((4, 4)));
    }

    #[tokio::test]
    async fn empty_files_are_skipped() {
        let raw = vec![
            RawAttachment::new("empty.png", vec![]),
            RawAttachment::new("ok.png", png(2, 2)),
        ];
        let blobs = decode_attachments(raw, &TriageConfig::immediate()).await.unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].filename, "ok.png");
    }

    #[tokio::test]
    async fn every_failure_is_reported() {
        let mut truncated = png(16, 16);
        truncated.truncate(truncated.len() / 2);

        let raw = vec![
            RawAttachment::new("notes.txt", b"not an image at all".to_vec()),
            RawAttachment::new("good.png", png(2, 2)),
            RawAttachment::new("half.png", truncated),
        ];
        let err = decode_attachments(raw, &TriageConfig::immediate()).await.unwrap_err();

        match err {
            TriageError::AttachmentDecode(failures) => {
                let names: Vec<&str> = failures.iter().map(|f| f.filename.as_str()).collect();
                assert_eq!(names, vec!["notes.txt", "half.png"]);
                assert_eq!(failures[0].index, 0);
                assert_eq!(failures[1].index, 2);
            }
            other => panic!("expected AttachmentDecode, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn too_many_attachments_rejected() {
        let config = TriageConfig {
            max_attachments: 1,
            ..TriageConfig::immediate()
        };
        let raw = vec![
            RawAttachment::new("a.png", png(1, 1)),
            RawAttachment::new("b.png", png(1, 1)),
        ];
        let err = decode_attachments(raw, &config).await.unwrap_err();
        assert_eq!(err, TriageError::TooManyAttachments { count: 2, max: 1 });
    }

    #[tokio::test]
    async fn oversized_attachment_rejected_before_decoding() {
        let big = png(8, 8);
        let size = big.len();
        let config = TriageConfig {
            max_attachment_bytes: size - 1,
            ..TriageConfig::immediate()
        };
        let raw = vec![
            RawAttachment::new("small.png", vec![0x89]),
            RawAttachment::new("big.png", big),
        ];
        let err = decode_attachments(raw, &config).await.unwrap_err();
        assert_eq!(
            err,
            TriageError::AttachmentTooLarge {
                index: 1,
                filename: "big.png".into(),
                bytes: size,
                max: size - 1,
            }
        );
        assert!(err.user_message().contains("big.png"));
    }

    #[test]
    fn decode_one_reports_unsupported_data() {
        let failure = decode_one(3, RawAttachment::new("notes.txt", b"hello".to_vec())).unwrap_err();
        assert_eq!(failure.index, 3);
        assert_eq!(failure.filename, "notes.txt");
    }

    #[tokio::test]
    async fn no_attachments_is_ok() {
        let blobs = decode_attachments(vec![], &TriageConfig::default()).await.unwrap();
        assert!(blobs.is_empty());
    }
}
