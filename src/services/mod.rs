//! Services module
//!
//! Collaborators the orchestrator delegates to: image intake, speech output
//! and the specialist directory.

pub mod image;
pub mod specialists;
pub mod speech;

pub use image::ImageReader;
pub use specialists::Specialist;
pub use speech::{BroadcastSpeech, NoSpeech, SpeechOutcome, SpeechOutput};
