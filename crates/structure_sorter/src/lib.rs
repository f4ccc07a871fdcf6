mod bounds;
mod commit;
mod config;
mod error;
mod layout;
mod row;
mod sorter;
mod toggles;
mod tracker;
mod view;

pub use bounds::{LevelBounds, level_bounds};
pub use commit::{
    CommitOutcome, CommitSink, LevelDeltaSource, MOVE_SAVED_NOTICE, MoveRequest, MoveResponse,
};
pub use config::SorterConfig;
pub use error::SorterError;
pub use layout::{LayoutProvider, RowBounds, RowLayout};
pub use row::{Draggee, Row, RowId, RowSequence};
pub use sorter::{DragFrame, DragPhase, DropOutcome, StructureSorter};
pub use toggles::{AncestorToggles, ToggleChange};
pub use tracker::{DragTracker, DropTarget, TargetGap, TrackerFrame, magnetize, snap_level};
pub use view::{
    StructureEvent, StructureRowState, StructureTree, StructureTreeState, structure_tree,
};
