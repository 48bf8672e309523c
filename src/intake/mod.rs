//! Asynchronous intake sources feeding the triage pipeline: image attachment
//! decoding and speech-to-text capture.

pub mod attachments;
pub mod speech;

pub use attachments::{decode_attachments, RawAttachment};
pub use speech::{SpeechCapture, TranscriptEvent, TranscriptSender};
