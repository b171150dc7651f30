pub mod complete;
pub mod error;
pub mod metadata;
pub mod parsing;
pub mod rewrite;
pub mod template;
pub mod todo;

// Re-export key types for easier usage
pub use complete::{
    AppendMode, Completion, CompletionOptions, CompletionPlan, NotePlan, plan_completion,
};
pub use error::CoreError;
pub use metadata::{
    ExtractedMetadata, MergePolicy, MetadataError, MetadataOptions, MetadataRecord, MetadataValue,
    encode_front_matter, extract_metadata, split_front_matter,
};
pub use parsing::{LineSource, ParseError, ParsedDocument, SourceText};
pub use rewrite::rewrite_urls;
pub use template::{todo_template, todo_template_without_metadata};
pub use todo::{
    DetectedTodo, Detection, DetectionMode, DetectionOptions, TodoRange, detect_range, detect_todo,
};
