/// Error type returned by adapters from `iterate_children`.
pub type AdapterError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("No root has been walked yet")]
    NotWalked,

    #[error("Node at {path} has no offset tables (index computed against a stale walk)")]
    MissingOffsets { path: String },

    #[error("Index {index} out of range ({rows} visible rows)")]
    IndexOutOfRange { index: usize, rows: usize },

    #[error("Unknown path: {path}")]
    UnknownPath { path: String },

    #[error("Adapter error at {path}: {source}")]
    Adapter {
        path: String,
        #[source]
        source: AdapterError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, WalkError>;

/// Renders a key path the way error messages and logs print it.
pub fn display_path<K: std::fmt::Debug>(path: &[K]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter()
        .map(|key| format!("{key:?}"))
        .collect::<Vec<_>>()
        .join("/")
}
