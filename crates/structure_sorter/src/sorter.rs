use gpui::{Pixels, Point};

use crate::row::validate_from;
use crate::{
    AncestorToggles, CommitOutcome, DragTracker, Draggee, DropTarget, LayoutProvider, MoveRequest,
    MoveResponse, Row, RowId, RowSequence, SorterConfig, SorterError, ToggleChange,
};

/// Where the sorter is in a drag gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    Committing,
}

/// Result of one pointer move during a drag.
#[derive(Clone, Debug, PartialEq)]
pub struct DragFrame {
    pub target: Option<DropTarget>,
    pub helper_x: Pixels,
    pub changed: bool,
    /// A toggle update was queued and needs a [`StructureSorter::flush_toggles`] next frame.
    pub needs_flush: bool,
}

/// What a drop did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// No legal target; the rows are back where they were.
    Reverted,
    /// Dropped into its original gap at its original level; nothing to save.
    Unchanged,
    /// The rows moved and this request must be sent.
    Commit(MoveRequest),
}

struct DragSession {
    draggee: Draggee,
    tracker: DragTracker,
    toggles: AncestorToggles,
    snapshot: Vec<Row>,
}

struct PendingCommit {
    request: MoveRequest,
    parent_id: Option<RowId>,
}

/// Rows loaded while a gesture was in flight, waiting for the sorter to go idle.
///
/// `anchor` is the last row they were loaded after. If a move changes it, the rows no longer
/// continue the listing and are handed back as stale.
struct DeferredRows {
    anchor: Option<(RowId, usize)>,
    rows: Vec<Row>,
}

enum State {
    Idle,
    Dragging(Box<DragSession>),
    Committing(PendingCommit),
}

/// Drag-to-reorder controller for a hierarchical row listing.
///
/// Owns the row sequence and runs one gesture at a time:
/// `Idle -> Dragging -> (Committing ->) Idle`.
pub struct StructureSorter {
    rows: RowSequence,
    config: SorterConfig,
    state: State,
    deferred: Option<DeferredRows>,
    stale_rows: Vec<Row>,
}

impl StructureSorter {
    pub fn new(rows: RowSequence, config: SorterConfig) -> Self {
        Self {
            rows,
            config,
            state: State::Idle,
            deferred: None,
            stale_rows: Vec::new(),
        }
    }

    #[inline]
    pub fn rows(&self) -> &RowSequence {
        &self.rows
    }

    #[inline]
    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SorterConfig) {
        self.config = config;
    }

    pub fn phase(&self) -> DragPhase {
        match self.state {
            State::Idle => DragPhase::Idle,
            State::Dragging(_) => DragPhase::Dragging,
            State::Committing(_) => DragPhase::Committing,
        }
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, State::Dragging(_))
    }

    pub fn draggee(&self) -> Option<&Draggee> {
        match &self.state {
            State::Dragging(session) => Some(&session.draggee),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&DropTarget> {
        match &self.state {
            State::Dragging(session) => session.tracker.target(),
            _ => None,
        }
    }

    /// Replace all rows. Only allowed while idle.
    pub fn set_rows(&mut self, rows: RowSequence) -> Result<(), SorterError> {
        if !matches!(self.state, State::Idle) {
            return Err(SorterError::DragInProgress);
        }
        self.rows = rows;
        Ok(())
    }

    /// Add rows loaded after the current last one.
    ///
    /// Returns `false` when the rows were deferred because a gesture is in flight; they are
    /// appended once the sorter is idle again, unless the move changed the last row. In that
    /// case they show up in [`StructureSorter::take_stale_rows`] instead.
    pub fn append_rows(&mut self, rows: Vec<Row>) -> Result<bool, SorterError> {
        if matches!(self.state, State::Idle) {
            self.rows.extend(rows)?;
            return Ok(true);
        }

        let deferred = self.deferred.get_or_insert_with(|| DeferredRows {
            anchor: self
                .rows
                .rows()
                .last()
                .map(|row| (row.id.clone(), row.level)),
            rows: Vec::new(),
        });
        let previous = deferred
            .rows
            .last()
            .map(|row| row.level)
            .or_else(|| deferred.anchor.as_ref().map(|(_, level)| *level))
            .unwrap_or(0);
        validate_from(&rows, previous, self.rows.len() + deferred.rows.len())?;
        deferred.rows.extend(rows);
        Ok(false)
    }

    /// Rows loaded during a gesture that no longer fit after the move. The caller should
    /// reload the listing from its source.
    pub fn take_stale_rows(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.stale_rows)
    }

    pub fn set_more_pending(&mut self, more_pending: bool) {
        self.rows.set_more_pending(more_pending);
    }

    /// Flip a row between collapsed and expanded. Returns whether it is now expanded.
    pub fn toggle_expanded(&mut self, id: &RowId) -> Result<bool, SorterError> {
        if self.is_dragging() {
            return Err(SorterError::DragInProgress);
        }
        let row = self
            .rows
            .row_mut(id)
            .ok_or_else(|| SorterError::UnknownRow(id.clone()))?;
        row.collapsed = !row.collapsed;
        Ok(!row.collapsed)
    }

    pub fn start_drag<L: LayoutProvider + ?Sized>(
        &mut self,
        id: &RowId,
        pointer: Point<Pixels>,
        layout: &L,
    ) -> Result<Draggee, SorterError> {
        if !matches!(self.state, State::Idle) {
            return Err(SorterError::DragInProgress);
        }
        let ix = self
            .rows
            .position(id)
            .ok_or_else(|| SorterError::UnknownRow(id.clone()))?;
        let draggee =
            Draggee::capture(&self.rows, ix).ok_or_else(|| SorterError::UnknownRow(id.clone()))?;

        let original = self.chain_ids(&self.rows.ancestor_chain(ix, 0));
        let session = DragSession {
            tracker: DragTracker::new(&draggee, pointer, layout, &self.config),
            toggles: AncestorToggles::new(original, draggee.len()),
            snapshot: self.rows.rows().to_vec(),
            draggee: draggee.clone(),
        };
        log::debug!(
            "structure drag start: {} ({} rows, level delta {:?})",
            id,
            draggee.len(),
            draggee.level_delta()
        );
        self.state = State::Dragging(Box::new(session));
        Ok(draggee)
    }

    /// Record the looked-up subtree depth of the current draggee.
    ///
    /// Returns `false` when `id` is no longer being dragged.
    pub fn resolve_level_delta(&mut self, id: &RowId, level_delta: usize) -> bool {
        match &mut self.state {
            State::Dragging(session) if session.draggee.id() == id => {
                session.draggee.resolve_level_delta(level_delta);
                true
            }
            _ => false,
        }
    }

    /// Track the pointer. Returns `None` when no drag is in progress.
    pub fn drag_move<L: LayoutProvider + ?Sized>(
        &mut self,
        pointer: Point<Pixels>,
        layout: &L,
    ) -> Option<DragFrame> {
        let State::Dragging(session) = &mut self.state else {
            return None;
        };
        let frame = session
            .tracker
            .update(pointer, &self.rows, &session.draggee, layout);

        let mut needs_flush = false;
        if frame.changed {
            let chain = match &frame.target {
                Some(target) => candidate_chain(&self.rows, &session.draggee, target),
                None => self
                    .rows
                    .ancestor_chain(session.draggee.root_ix(), 0)
                    .into_iter()
                    .map(|ix| self.rows.rows()[ix].id.clone())
                    .collect(),
            };
            needs_flush = session.toggles.schedule(chain);
        }

        Some(DragFrame {
            target: frame.target,
            helper_x: frame.helper_x,
            changed: frame.changed,
            needs_flush,
        })
    }

    /// Apply the queued toggle update, if any.
    pub fn flush_toggles(&mut self) -> Vec<ToggleChange> {
        match &mut self.state {
            State::Dragging(session) => session.toggles.flush(&mut self.rows),
            _ => Vec::new(),
        }
    }

    /// Abort the drag and put every row back exactly as it was.
    pub fn cancel(&mut self) -> Result<(), SorterError> {
        let session = self.take_session()?;
        log::debug!("structure drag cancelled: {}", session.draggee.id());
        self.rows.restore(session.snapshot);
        self.apply_deferred_rows();
        Ok(())
    }

    /// Finish the drag at the current target.
    pub fn drop_draggee(&mut self) -> Result<DropOutcome, SorterError> {
        let session = self.take_session()?;
        let DragSession {
            draggee,
            tracker,
            mut toggles,
            snapshot,
        } = *session;

        let Some(target) = tracker.target().cloned() else {
            log::debug!("structure drop without target: {}", draggee.id());
            self.rows.restore(snapshot);
            self.apply_deferred_rows();
            return Ok(DropOutcome::Reverted);
        };

        let range = draggee.range();
        let insert_at = match target.gap.next {
            Some(next) if next >= range.end => next - range.len(),
            Some(next) => next,
            None => self.rows.len() - range.len(),
        };
        if insert_at == range.start && target.level == draggee.level() {
            self.rows.restore(snapshot);
            self.apply_deferred_rows();
            return Ok(DropOutcome::Unchanged);
        }

        let level_delta = target.level as isize - draggee.level() as isize;
        let rows = self.rows.rows_mut();
        let mut block: Vec<Row> = rows.drain(range).collect();
        for row in &mut block {
            row.level = row.level.saturating_add_signed(level_delta);
        }
        rows.splice(insert_at..insert_at, block);

        let chain = self.rows.ancestor_chain(insert_at, 0);
        let parent_id = chain.last().map(|ix| self.rows.rows()[*ix].id.clone());
        toggles.apply(self.chain_ids(&chain), &mut self.rows);

        let previous_sibling_id = self.rows.rows()[..insert_at]
            .iter()
            .rev()
            .find(|row| row.level <= target.level)
            .filter(|row| row.level == target.level)
            .map(|row| row.id.to_string());

        let subject = &self.rows.rows()[insert_at];
        let request = MoveRequest {
            subject_id: subject.id.to_string(),
            previous_sibling_id,
            parent_id: parent_id.as_ref().map(|id| id.to_string()),
            site: subject.site.as_ref().map(|site| site.to_string()),
        };
        log::debug!("structure drop: {request:?}");

        self.state = State::Committing(PendingCommit {
            request: request.clone(),
            parent_id,
        });
        Ok(DropOutcome::Commit(request))
    }

    /// Settle the in-flight move request.
    ///
    /// A failed request leaves the rows in their new position. A collapsed new parent is
    /// expanded once the move is saved.
    pub fn finish_commit(
        &mut self,
        result: anyhow::Result<MoveResponse>,
    ) -> Result<CommitOutcome, SorterError> {
        let PendingCommit { request, parent_id } =
            match std::mem::replace(&mut self.state, State::Idle) {
                State::Committing(pending) => pending,
                state => {
                    self.state = state;
                    return Err(SorterError::NotDragging);
                }
            };

        let outcome = match result.and_then(MoveResponse::into_result) {
            Ok(()) => {
                log::info!("structure move saved: {}", request.subject_id);
                let expand = parent_id
                    .filter(|id| self.rows.row(id).is_some_and(|row| row.collapsed))
                    .filter(|id| self.toggle_expanded(id).unwrap_or(false));
                CommitOutcome::Saved { request, expand }
            }
            Err(err) => {
                log::warn!("structure move of {} failed: {err:#}", request.subject_id);
                CommitOutcome::Failed {
                    request,
                    error: format!("{err:#}"),
                }
            }
        };

        self.apply_deferred_rows();
        Ok(outcome)
    }

    fn take_session(&mut self) -> Result<Box<DragSession>, SorterError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Dragging(session) => Ok(session),
            state => {
                self.state = state;
                Err(SorterError::NotDragging)
            }
        }
    }

    fn apply_deferred_rows(&mut self) {
        let Some(DeferredRows { anchor, rows }) = self.deferred.take() else {
            return;
        };
        let last = self
            .rows
            .rows()
            .last()
            .map(|row| (row.id.clone(), row.level));
        if last != anchor {
            log::warn!(
                "{} rows loaded during a drag no longer follow the last row",
                rows.len()
            );
            self.stale_rows.extend(rows);
            return;
        }
        let previous = last.map_or(0, |(_, level)| level);
        if let Err(err) = validate_from(&rows, previous, self.rows.len()) {
            log::warn!("rows loaded during a drag no longer fit: {err}");
            self.stale_rows.extend(rows);
            return;
        }
        self.rows.rows_mut().extend(rows);
    }

    fn chain_ids(&self, chain: &[usize]) -> Vec<RowId> {
        chain
            .iter()
            .filter_map(|ix| self.rows.get(*ix).map(|row| row.id.clone()))
            .collect()
    }
}

/// Ancestors the draggee would have at `target`, by id.
fn candidate_chain(rows: &RowSequence, draggee: &Draggee, target: &DropTarget) -> Vec<RowId> {
    let gap = target.gap.next.unwrap_or(rows.len());
    rows.ancestors_at(gap, target.level, draggee.range())
        .into_iter()
        .filter_map(|ix| rows.get(ix).map(|row| row.id.clone()))
        .collect()
}
