use crate::RowId;

#[derive(Debug, thiserror::Error)]
pub enum SorterError {
    #[error("no rendered row with id `{0}`")]
    UnknownRow(RowId),

    #[error("a drag is already in progress")]
    DragInProgress,

    #[error("no drag is in progress")]
    NotDragging,

    /// Levels must start at 1 and may only grow by one step from one row to the next.
    #[error("row {index} has level {level}, which cannot follow level {previous}")]
    InvalidSequence {
        index: usize,
        level: usize,
        previous: usize,
    },

    #[error("invalid sorter config: {0}")]
    Config(#[from] serde_json::Error),
}
