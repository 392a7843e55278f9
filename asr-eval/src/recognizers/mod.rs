//! Speech-to-text recognizer implementations

pub mod mock;
pub mod registry;
pub mod replay;
pub mod traits;

pub use mock::MockRecognizer;
pub use registry::RecognizerRegistry;
pub use replay::ReplayRecognizer;
pub use traits::{
    RecognitionError, RecognitionRequest, RecognitionResult, Recognizer, RecognizerResolver,
    Transcript,
};
