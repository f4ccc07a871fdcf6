use std::{ops::Range, rc::Rc};

use gpui::{
    App, AppContext as _, Context, ElementId, Entity, EntityId, EventEmitter, FocusHandle,
    InteractiveElement as _, IntoElement, ListSizingBehavior, MouseButton, ParentElement as _,
    Pixels, Point,
    Render, RenderOnce, SharedString, StatefulInteractiveElement as _, StyleRefinement, Styled,
    UniformListScrollHandle, Window, div, point, prelude::FluentBuilder as _, px, uniform_list,
};
use gpui_component::list::ListItem;
use gpui_component::notification::Notification;
use gpui_component::scroll::{Scrollbar, ScrollbarState};
use gpui_component::{ActiveTheme as _, StyledExt as _, WindowExt as _};

use crate::{
    CommitOutcome, CommitSink, DragFrame, DragPhase, DropOutcome, LevelDeltaSource,
    MOVE_SAVED_NOTICE, MoveRequest, MoveResponse, Row, RowId, RowLayout, RowSequence,
    SorterConfig, SorterError, StructureSorter,
};

const CONTEXT: &str = "StructureTree";

/// Create a [`StructureTree`].
pub fn structure_tree<R>(state: &Entity<StructureTreeState>, render_item: R) -> StructureTree
where
    R: Fn(usize, &Row, StructureRowState, &mut Window, &mut App) -> ListItem + 'static,
{
    StructureTree::new(state, render_item)
}

/// Events emitted by [`StructureTreeState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructureEvent {
    /// A move was saved by the [`CommitSink`].
    Moved(MoveRequest),
    /// A move could not be saved. The rows keep their new position.
    MoveFailed(String),
    /// A collapsed parent was expanded after a move and its children may need loading.
    ExpandRequested(RowId),
    /// Rows loaded during a drag no longer follow the moved listing and were not added.
    /// The listing should be reloaded from its source.
    ReloadNeeded(Vec<RowId>),
}

#[derive(Clone)]
struct StructureDrag {
    tree_id: EntityId,
    row_id: RowId,
    label: SharedString,
}

struct DragGhost {
    label: SharedString,
}

impl DragGhost {
    fn new(label: SharedString) -> Self {
        Self { label }
    }
}

impl Render for DragGhost {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        div()
            .px(px(10.))
            .py(px(6.))
            .rounded(px(8.))
            .bg(theme.popover)
            .border_1()
            .border_color(theme.border)
            .shadow_md()
            .text_color(theme.popover_foreground)
            .text_sm()
            .child(self.label.clone())
    }
}

/// Per-row render hints passed to the row renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructureRowState {
    /// The row is part of the subtree being dragged.
    pub dragging: bool,
    /// The draggee would become a child of this row.
    pub nest_target: bool,
    pub has_toggle: bool,
    pub expanded: bool,
}

/// A drag that was started but has not seen its first move event yet.
///
/// The list bounds are only known once a move event arrives.
#[derive(Clone)]
struct PendingStart {
    row_id: RowId,
    mouse_position: Point<Pixels>,
}

type RenderItem = Rc<dyn Fn(usize, &Row, StructureRowState, &mut Window, &mut App) -> ListItem>;

/// State of a reorderable structure listing.
pub struct StructureTreeState {
    focus_handle: FocusHandle,
    sorter: StructureSorter,
    scrollbar_state: ScrollbarState,
    scroll_handle: UniformListScrollHandle,
    commit_sink: Rc<dyn CommitSink>,
    level_delta_source: Option<Rc<dyn LevelDeltaSource>>,
    pending_start: Option<PendingStart>,
    drag_frame: Option<DragFrame>,
    render_item: RenderItem,
}

impl EventEmitter<StructureEvent> for StructureTreeState {}

impl StructureTreeState {
    pub fn new(commit_sink: impl CommitSink + 'static, cx: &mut App) -> Self {
        Self {
            focus_handle: cx.focus_handle(),
            sorter: StructureSorter::new(RowSequence::default(), SorterConfig::default()),
            scrollbar_state: ScrollbarState::default(),
            scroll_handle: UniformListScrollHandle::default(),
            commit_sink: Rc::new(commit_sink),
            level_delta_source: None,
            pending_start: None,
            drag_frame: None,
            render_item: Rc::new(|ix, _, _, _, _| ListItem::new(ix)),
        }
    }

    pub fn rows(mut self, rows: RowSequence) -> Self {
        self.sorter = StructureSorter::new(rows, self.sorter.config().clone());
        self
    }

    pub fn config(mut self, config: SorterConfig) -> Self {
        self.sorter.set_config(config);
        self
    }

    /// Deepest level any row may reach. `0` means unlimited.
    pub fn max_levels(mut self, max_levels: usize) -> Self {
        let mut config = self.sorter.config().clone();
        config.max_levels = Some(max_levels);
        self.sorter.set_config(config);
        self
    }

    /// Set the indentation step (in pixels) between two levels.
    ///
    /// This should match the indentation used by your row renderer.
    pub fn indent_width(mut self, indent_width: Pixels) -> Self {
        let mut config = self.sorter.config().clone();
        config.indent_width = indent_width.into();
        self.sorter.set_config(config);
        self
    }

    /// Set the left edge (in pixels) of top-level rows.
    pub fn indent_offset(mut self, indent_offset: Pixels) -> Self {
        let mut config = self.sorter.config().clone();
        config.indent_offset = indent_offset.into();
        self.sorter.set_config(config);
        self
    }

    /// Look up subtree depths of rows whose descendants may not all be loaded.
    pub fn level_delta_source(mut self, source: impl LevelDeltaSource + 'static) -> Self {
        self.level_delta_source = Some(Rc::new(source));
        self
    }

    pub fn sorter(&self) -> &StructureSorter {
        &self.sorter
    }

    pub fn row_sequence(&self) -> &RowSequence {
        self.sorter.rows()
    }

    pub fn set_rows(
        &mut self,
        rows: RowSequence,
        cx: &mut Context<Self>,
    ) -> Result<(), SorterError> {
        self.sorter.set_rows(rows)?;
        cx.notify();
        Ok(())
    }

    /// Append rows loaded after the last one. Deferred while a drag or commit is in flight.
    pub fn append_rows(
        &mut self,
        rows: Vec<Row>,
        cx: &mut Context<Self>,
    ) -> Result<(), SorterError> {
        if self.sorter.append_rows(rows)? {
            cx.notify();
        }
        Ok(())
    }

    pub fn set_more_pending(&mut self, more_pending: bool, cx: &mut Context<Self>) {
        self.sorter.set_more_pending(more_pending);
        cx.notify();
    }

    pub fn toggle_expanded(
        &mut self,
        id: &RowId,
        cx: &mut Context<Self>,
    ) -> Result<bool, SorterError> {
        let expanded = self.sorter.toggle_expanded(id)?;
        cx.notify();
        Ok(expanded)
    }

    fn row_height(&self) -> Pixels {
        self.scroll_handle
            .0
            .borrow()
            .last_item_size
            .map(|s| s.item.height)
            .unwrap_or(self.sorter.config().row_height_px())
    }

    fn layout(&self) -> RowLayout {
        let config = self.sorter.config();
        RowLayout::for_sequence(self.sorter.rows(), self.row_height())
            .indent_width(config.indent_width_px())
            .indent_offset(config.indent_offset_px())
    }

    /// Mouse position in list content coordinates.
    fn content_position(
        &self,
        mouse_position: Point<Pixels>,
        list_origin: Point<Pixels>,
    ) -> Point<Pixels> {
        let scroll_y = self.scroll_handle.0.borrow().base_handle.offset().y;
        point(
            mouse_position.x - list_origin.x,
            mouse_position.y - list_origin.y - scroll_y,
        )
    }

    fn reset_drag(&mut self) {
        self.pending_start = None;
        self.drag_frame = None;
    }

    fn report_stale_rows(&mut self, cx: &mut Context<Self>) {
        let stale = self.sorter.take_stale_rows();
        if stale.is_empty() {
            return;
        }
        log::warn!("structure listing needs a reload: {} loaded rows dropped", stale.len());
        cx.emit(StructureEvent::ReloadNeeded(
            stale.into_iter().map(|row| row.id).collect(),
        ));
    }

    fn on_row_click(&mut self, row_id: &RowId, cx: &mut Context<Self>) {
        if self.sorter.phase() != DragPhase::Idle {
            return;
        }
        let has_toggle = self.sorter.rows().row(row_id).is_some_and(|row| row.has_toggle());
        if has_toggle && self.sorter.toggle_expanded(row_id).is_ok() {
            cx.notify();
        }
    }

    fn on_drag_start(
        &mut self,
        drag: &StructureDrag,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if self.sorter.phase() != DragPhase::Idle {
            return;
        }
        window.focus(&self.focus_handle);
        self.pending_start = Some(PendingStart {
            row_id: drag.row_id.clone(),
            mouse_position: window.mouse_position(),
        });
        self.drag_frame = None;
        cx.notify();
    }

    fn begin_drag(
        &mut self,
        start: PendingStart,
        list_origin: Point<Pixels>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        let pointer = self.content_position(start.mouse_position, list_origin);
        let layout = self.layout();
        let draggee = match self.sorter.start_drag(&start.row_id, pointer, &layout) {
            Ok(draggee) => draggee,
            Err(err) => {
                log::debug!("structure drag not started: {err}");
                return;
            }
        };

        if draggee.level_delta().is_some() {
            return;
        }
        let Some(source) = self.level_delta_source.clone() else {
            return;
        };

        let row_id = draggee.id().clone();
        let task = source.level_delta(row_id.clone(), cx);
        let this = cx.entity();
        cx.spawn_in(window, async move |_, window| {
            let result = task.await;
            window
                .update(|_, cx| {
                    this.update(cx, |this, cx| match result {
                        Ok(level_delta) => {
                            if this.sorter.resolve_level_delta(&row_id, level_delta) {
                                cx.notify();
                            }
                        }
                        Err(err) => {
                            log::warn!("level delta lookup for {row_id} failed: {err:#}");
                        }
                    });
                })
                .ok();
        })
        .detach();
    }

    fn on_drag_move(
        &mut self,
        event: &gpui::DragMoveEvent<StructureDrag>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if !cx.has_active_drag() {
            return;
        }

        let drag = event.drag(cx);
        if drag.tree_id != cx.entity_id() {
            return;
        }

        let mouse_position = event.event.position;
        let list_bounds = event.bounds;
        if !list_bounds.contains(&mouse_position) {
            return;
        }

        if let Some(start) = self.pending_start.take() {
            self.begin_drag(start, list_bounds.origin, window, cx);
        }

        let pointer = self.content_position(mouse_position, list_bounds.origin);
        let layout = self.layout();
        let Some(frame) = self.sorter.drag_move(pointer, &layout) else {
            return;
        };

        if frame.needs_flush {
            cx.on_next_frame(window, |this, _, cx| {
                if !this.sorter.flush_toggles().is_empty() {
                    cx.notify();
                }
            });
        }

        let redraw = frame.changed
            || self
                .drag_frame
                .as_ref()
                .is_none_or(|last| last.helper_x != frame.helper_x);
        self.drag_frame = Some(frame);
        if redraw {
            cx.notify();
        }
    }

    fn on_drop(&mut self, drag: &StructureDrag, window: &mut Window, cx: &mut Context<Self>) {
        self.reset_drag();
        if drag.tree_id != cx.entity_id() || !self.sorter.is_dragging() {
            cx.notify();
            return;
        }

        let request = match self.sorter.drop_draggee() {
            Ok(DropOutcome::Commit(request)) => request,
            Ok(DropOutcome::Reverted | DropOutcome::Unchanged) => {
                self.report_stale_rows(cx);
                cx.notify();
                return;
            }
            Err(err) => {
                log::warn!("structure drop failed: {err}");
                cx.notify();
                return;
            }
        };

        let task = self.commit_sink.clone().submit(request, cx);
        let this = cx.entity();
        cx.spawn_in(window, async move |_, window| {
            let result = task.await;
            window
                .update(|window, cx| {
                    this.update(cx, |this, cx| this.finish_commit(result, window, cx));
                })
                .ok();
        })
        .detach();
        cx.notify();
    }

    fn finish_commit(
        &mut self,
        result: anyhow::Result<MoveResponse>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        match self.sorter.finish_commit(result) {
            Ok(CommitOutcome::Saved { request, expand }) => {
                window.push_notification(Notification::new().message(MOVE_SAVED_NOTICE), cx);
                cx.emit(StructureEvent::Moved(request));
                if let Some(id) = expand {
                    cx.emit(StructureEvent::ExpandRequested(id));
                }
            }
            Ok(CommitOutcome::Failed { error, .. }) => {
                cx.emit(StructureEvent::MoveFailed(error));
            }
            Err(err) => log::warn!("structure commit settled twice: {err}"),
        }
        self.report_stale_rows(cx);
        cx.notify();
    }

    fn cancel_drag(&mut self, cx: &mut Context<Self>) -> bool {
        let had_pending = self.pending_start.is_some();
        self.reset_drag();
        if self.sorter.is_dragging() {
            if let Err(err) = self.sorter.cancel() {
                log::warn!("structure drag cancel failed: {err}");
            }
            self.report_stale_rows(cx);
        } else if !had_pending {
            return false;
        }
        cx.notify();
        true
    }

    fn on_key_down(&mut self, event: &gpui::KeyDownEvent, cx: &mut Context<Self>) -> bool {
        match event.keystroke.key.as_str() {
            "escape" => self.cancel_drag(cx),
            _ => false,
        }
    }
}

impl Render for StructureTreeState {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        // The drag ended somewhere that did not take the drop.
        if !cx.has_active_drag() {
            self.reset_drag();
            if self.sorter.is_dragging() {
                log::debug!("structure drag ended without a drop");
                self.sorter.cancel().ok();
                self.report_stale_rows(cx);
            }
        }

        let render_item = Rc::clone(&self.render_item);
        let state_entity = cx.entity();
        let visible = Rc::new(self.sorter.rows().visible_indices());
        let dragging_range = self.sorter.draggee().map(|draggee| draggee.range());
        let nest_under = self.sorter.target().and_then(|target| target.nest_under);
        let idle = self.sorter.phase() == DragPhase::Idle;

        let scroll_y = self.scroll_handle.0.borrow().base_handle.offset().y;
        let line = self
            .drag_frame
            .as_ref()
            .and_then(|frame| {
                let target = frame.target.as_ref()?;
                Some((frame.helper_x, target.marker_y))
            })
            .filter(|_| self.sorter.is_dragging())
            .map(|(x, y)| {
                let theme = cx.theme();
                div()
                    .absolute()
                    .left(x)
                    .right_0()
                    .top(y + scroll_y)
                    .h(px(2.))
                    .bg(theme.drag_border)
            });

        div()
            .id("structure-tree-state")
            .size_full()
            .relative()
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|this, _, window, _| window.focus(&this.focus_handle)),
            )
            .child(
                uniform_list("structure-rows", visible.len(), {
                    let visible = Rc::clone(&visible);
                    cx.processor(move |state, visible_range: Range<usize>, window, cx| {
                        let drop_target_bg = cx.theme().drop_target;
                        let mut items = Vec::with_capacity(visible_range.len());
                        for list_ix in visible_range {
                            let Some(ix) = visible.get(list_ix).copied() else {
                                continue;
                            };
                            let Some(row) = state.sorter.rows().get(ix) else {
                                continue;
                            };
                            let row_state = StructureRowState {
                                dragging: dragging_range
                                    .as_ref()
                                    .is_some_and(|range| range.contains(&ix)),
                                nest_target: nest_under == Some(ix),
                                has_toggle: row.has_toggle(),
                                expanded: !row.collapsed,
                            };

                            let item = (render_item)(ix, row, row_state, window, cx);
                            let drag_value = StructureDrag {
                                tree_id: cx.entity_id(),
                                row_id: row.id.clone(),
                                label: row.label.clone(),
                            };
                            let row_id = row.id.clone();

                            let element = div()
                                .id(ElementId::Name(row.id.clone()))
                                .when(row_state.nest_target, |this| this.bg(drop_target_bg))
                                .child(item)
                                .when(idle, |this| {
                                    this.on_click(cx.listener(move |this, _, _, cx| {
                                        this.on_row_click(&row_id, cx);
                                    }))
                                })
                                .when(idle, |this| {
                                    let state_entity = state_entity.clone();
                                    this.on_drag(drag_value, move |drag, _, window, cx| {
                                        state_entity.update(cx, |state, cx| {
                                            state.on_drag_start(drag, window, cx);
                                        });
                                        let label = drag.label.clone();
                                        cx.new(|_| DragGhost::new(label))
                                    })
                                });

                            items.push(element);
                        }
                        items
                    })
                })
                .on_drag_move::<StructureDrag>(cx.listener(Self::on_drag_move))
                .on_drop::<StructureDrag>(cx.listener(Self::on_drop))
                .flex_grow()
                .size_full()
                .track_scroll(self.scroll_handle.clone())
                .with_sizing_behavior(ListSizingBehavior::Auto)
                .into_any_element(),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .right_0()
                    .bottom_0()
                    .w(px(12.))
                    .child(Scrollbar::uniform_scroll(
                        &self.scrollbar_state,
                        &self.scroll_handle,
                    )),
            )
            .when_some(line, |this, line| this.child(line))
    }
}

/// A reorderable structure listing element.
#[derive(IntoElement)]
pub struct StructureTree {
    id: ElementId,
    state: Entity<StructureTreeState>,
    style: StyleRefinement,
    render_item: RenderItem,
}

impl StructureTree {
    pub fn new<R>(state: &Entity<StructureTreeState>, render_item: R) -> Self
    where
        R: Fn(usize, &Row, StructureRowState, &mut Window, &mut App) -> ListItem + 'static,
    {
        Self {
            id: ElementId::Name(format!("structure-tree-{}", state.entity_id()).into()),
            state: state.clone(),
            style: StyleRefinement::default(),
            render_item: Rc::new(render_item),
        }
    }
}

impl Styled for StructureTree {
    fn style(&mut self) -> &mut StyleRefinement {
        &mut self.style
    }
}

impl RenderOnce for StructureTree {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let focus_handle = self.state.read(cx).focus_handle.clone();
        let state_entity = self.state.clone();
        self.state
            .update(cx, |state, _| state.render_item = self.render_item);

        div()
            .id(self.id)
            .key_context(CONTEXT)
            .track_focus(&focus_handle)
            .on_key_down(move |event, window, cx| {
                let handled = state_entity.update(cx, |state, cx| state.on_key_down(event, cx));
                if handled {
                    window.prevent_default();
                    cx.stop_propagation();
                }
            })
            .size_full()
            .child(self.state)
            .refine_style(&self.style)
    }
}
