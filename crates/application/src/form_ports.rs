mod source;
mod submission;

pub use source::FormStructureSource;
pub use submission::{SubmissionDocument, SubmitOutcome, SubmitSink};
