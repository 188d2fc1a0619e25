// Adapters layer: concrete implementations for external systems
// (spreadsheet codecs, HTML rendering, local artifact storage).

pub mod export;
pub mod reader;
pub mod share;
pub mod storage;

pub use storage::{ArtifactRegistry, LocalStorage};
