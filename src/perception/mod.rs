pub mod annotator;
pub mod color;
pub mod marker;
pub mod morphology;
pub mod pipeline;
pub mod refs;
pub mod types;
pub mod validate;
