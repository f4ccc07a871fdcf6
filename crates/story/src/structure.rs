use std::time::Duration;

use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::button::{Button, ButtonVariants as _};
use gpui_component::list::ListItem;
use gpui_component::{ActiveTheme as _, Icon, IconName, Sizable as _, h_flex, v_flex};
use gpui_structure_sorter::{
    MoveRequest, MoveResponse, Row, RowId, RowSequence, SorterConfig, StructureEvent,
    StructureRowState, StructureTreeState, structure_tree,
};

/// Rows the demo server refuses to move, to show the failure path.
const LOCKED_ID: &str = "legal";

const DEMO_CONFIG: &str = r#"{ "maxLevels": 4, "indentWidth": 16, "indentOffset": 12 }"#;

pub struct StructureExample {
    tree: Entity<StructureTreeState>,
    log: Vec<String>,
    next_page: usize,
}

impl StructureExample {
    pub fn view(window: &mut Window, cx: &mut App) -> Entity<Self> {
        cx.new(|cx| Self::new(window, cx))
    }

    fn new(_window: &mut Window, cx: &mut Context<Self>) -> Self {
        let config = SorterConfig::from_json(DEMO_CONFIG).unwrap_or_else(|err| {
            log::warn!("falling back to the default sorter config: {err}");
            SorterConfig::default()
        });
        let tree = cx.new(|cx| {
            let mut state = StructureTreeState::new(submit_move, cx)
                .config(config)
                .level_delta_source(lookup_level_delta)
                .rows(demo_rows());
            state.set_more_pending(true, cx);
            state
        });

        cx.subscribe(&tree, |this, _, event: &StructureEvent, cx| {
            let line = match event {
                StructureEvent::Moved(request) => format!("saved {:?}", request.form_fields()),
                StructureEvent::MoveFailed(error) => format!("failed: {error}"),
                StructureEvent::ExpandRequested(id) => format!("expanded {id}"),
                StructureEvent::ReloadNeeded(ids) => {
                    format!("reload needed, {} loaded rows did not fit", ids.len())
                }
            };
            this.log.push(line);
            cx.notify();
        })
        .detach();

        Self {
            tree,
            log: Vec::new(),
            next_page: 0,
        }
    }

    fn load_more(&mut self, cx: &mut Context<Self>) {
        let page = self.next_page;
        self.next_page += 1;
        let rows = vec![
            Row::new(format!("archive-{page}"), 1).label(format!("Archive {}", page + 1)),
            Row::new(format!("archive-{page}-a"), 2).label("Spring"),
            Row::new(format!("archive-{page}-b"), 2).label("Autumn"),
        ];
        let last_page = page >= 2;
        self.tree.update(cx, |tree, cx| {
            if let Err(err) = tree.append_rows(rows, cx) {
                log::warn!("could not load more rows: {err}");
            }
            tree.set_more_pending(!last_page, cx);
        });
        cx.notify();
    }
}

impl Render for StructureExample {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let tree = self.tree.read(cx);
        let dump: Vec<String> = tree
            .row_sequence()
            .dump()
            .lines()
            .map(str::to_string)
            .collect();
        let events: Vec<String> = self.log.iter().rev().take(8).cloned().collect();
        let more_pending = tree.row_sequence().has_more_pending();
        let indent_width = tree.sorter().config().indent_width_px();
        let indent_offset = tree.sorter().config().indent_offset_px();

        v_flex()
            .size_full()
            .p(px(16.))
            .gap_y_3()
            .child(
                v_flex()
                    .gap_y_1()
                    .child(div().text_xl().font_weight(FontWeight::BOLD).child("Structure"))
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child("Drag a row up or down to pick a gap, left or right to pick its level. Hover a row body to nest under it. Escape cancels. Click a row with children to collapse it. Moving \"Legal\" is rejected by the demo server."),
                    ),
            )
            .child(
                h_flex()
                    .flex_1()
                    .min_h(px(0.))
                    .gap_x_3()
                    .child(
                        v_flex()
                            .w(px(420.))
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(
                                h_flex()
                                    .justify_between()
                                    .child(
                                        div()
                                            .text_sm()
                                            .font_weight(FontWeight::MEDIUM)
                                            .child("Pages"),
                                    )
                                    .when(more_pending, |this| {
                                        this.child(
                                            Button::new("structure-load-more")
                                                .label("Load more")
                                                .ghost()
                                                .on_click(cx.listener(|this, _, _window, cx| {
                                                    this.load_more(cx);
                                                })),
                                        )
                                    }),
                            )
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .child(structure_tree(
                                        &self.tree,
                                        move |ix, row, row_state, _window, cx| {
                                            let indent = indent_offset
                                                + indent_width * row.level.saturating_sub(1);
                                            render_row(ix, row, row_state, indent, cx)
                                        },
                                    )),
                            ),
                    )
                    .child(
                        v_flex()
                            .flex_1()
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(
                                div()
                                    .text_sm()
                                    .font_weight(FontWeight::MEDIUM)
                                    .child("Debug (rows and events)"),
                            )
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .p(px(12.))
                                    .child(render_lines(dump))
                                    .child(div().h(px(12.)))
                                    .child(render_lines(events)),
                            ),
                    ),
            )
    }
}

fn render_row(
    ix: usize,
    row: &Row,
    row_state: StructureRowState,
    indent: Pixels,
    cx: &mut App,
) -> ListItem {
    let theme = cx.theme();
    let icon = match (row_state.has_toggle, row_state.expanded) {
        (true, true) => IconName::ChevronDown,
        (true, false) => IconName::ChevronRight,
        (false, _) => IconName::Minus,
    };

    ListItem::new(ix)
        .pl(indent)
        .when(row_state.dragging, |this| this.opacity(0.4))
        .when(row_state.nest_target, |this| {
            this.border_1().border_color(theme.drag_border)
        })
        .child(
            h_flex()
                .gap_x_2()
                .items_center()
                .child(Icon::new(icon).small().text_color(theme.muted_foreground))
                .child(row.label.clone()),
        )
}

fn render_lines(lines: Vec<String>) -> impl IntoElement {
    v_flex()
        .gap_y_0p5()
        .children(lines.into_iter().map(|line| div().text_sm().child(line)))
}

fn submit_move(request: MoveRequest, cx: &mut App) -> Task<anyhow::Result<MoveResponse>> {
    let timer = cx.background_executor().timer(Duration::from_millis(300));
    cx.background_spawn(async move {
        timer.await;
        log::info!("demo server received {:?}", request.form_fields());
        if request.subject_id == LOCKED_ID {
            return Ok(MoveResponse {
                success: false,
                message: Some("this page is locked".to_string()),
            });
        }
        Ok(MoveResponse::ok())
    })
}

/// The demo archive pages are always two levels deep.
fn lookup_level_delta(id: RowId, cx: &mut App) -> Task<anyhow::Result<usize>> {
    let timer = cx.background_executor().timer(Duration::from_millis(150));
    cx.background_spawn(async move {
        timer.await;
        log::debug!("demo server looked up the depth of {id}");
        Ok(1)
    })
}

fn demo_rows() -> RowSequence {
    let rows = vec![
        Row::new("home", 1).label("Home").descendant_count(3),
        Row::new("about", 2).label("About us").descendant_count(1),
        Row::new("team", 3).label("Team"),
        Row::new("contact", 2).label("Contact"),
        Row::new("news", 1).label("News").descendant_count(2).collapsed(true),
        Row::new("news-2025", 2).label("2025"),
        Row::new("news-2026", 2).label("2026"),
        Row::new("legal", 1).label("Legal").site("en-us"),
        Row::new("blog", 1).label("Blog").site("en-us"),
    ];
    RowSequence::new(rows).unwrap_or_default()
}
