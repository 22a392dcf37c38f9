//! Goal map page: the four rink boxes, the time grid and the filters.

use dioxus::prelude::*;
use rinkmap_core::ledger::BUCKETS_PER_PERIOD;
use rinkmap_core::{
    BoxId, BucketAction, BucketKey, GoalMap, GoalieFilter, MarkerId, Page, Row, ScorerFilter,
    WorkflowStatus, WorkflowStep, WorkflowType,
};
use rinkmap_io::{
    BoxPointer, FilterBar, LocalStorage, MarkerDot, RinkBox, StatusBar, TimeGrid, layout, raster,
};

use crate::effects::{self, Clock, SharedMap};

const FIELD: Asset = asset!("/assets/field.svg");
const NET: Asset = asset!("/assets/net.svg");

/// Image shown in `box_id`.
#[must_use]
pub fn image_src(box_id: BoxId) -> String {
    if box_id.is_goal() {
        NET.to_string()
    } else {
        FIELD.to_string()
    }
}

/// CSS classes of a box: goal graphics are shorter, the box the
/// workflow waits for is highlighted.
#[must_use]
pub fn box_class(box_id: BoxId, awaiting: Option<BoxId>) -> String {
    let mut class = String::new();
    if box_id.is_goal() {
        class.push_str("goal");
    }
    if awaiting == Some(box_id) {
        class.push_str(" awaiting");
    }
    class
}

fn awaiting_box(status: &WorkflowStatus) -> Option<BoxId> {
    match status.step {
        WorkflowStep::AwaitingField => Some(BoxId::OffenseField),
        WorkflowStep::AwaitingGoal => status.workflow_type.map(WorkflowType::goal_box),
        WorkflowStep::Idle | WorkflowStep::AwaitingTime => None,
    }
}

fn awaiting_row(status: &WorkflowStatus) -> Option<Row> {
    match status.step {
        WorkflowStep::AwaitingTime => status.workflow_type.map(WorkflowType::row),
        _ => None,
    }
}

fn period_counts(map: &GoalMap<LocalStorage>, period: &str) -> [u32; BUCKETS_PER_PERIOD as usize] {
    let mut counts = [0; BUCKETS_PER_PERIOD as usize];
    for (index, count) in (0..BUCKETS_PER_PERIOD).zip(counts.iter_mut()) {
        if let Ok(key) = BucketKey::new(period, index) {
            *count = map.bucket_display(&key);
        }
    }
    counts
}

/// Measure a box after its image loaded and, for the nets, build the
/// colour sampler.
fn refresh_box(mut map: SharedMap, box_id: BoxId) {
    match layout::measure(box_id) {
        Ok(measured) => map.write().set_layout(box_id, measured),
        Err(e) => {
            log::warn!("could not measure {box_id}: {e}");
            return;
        }
    }
    if !box_id.is_goal() {
        return;
    }
    match layout::find_image(box_id) {
        Ok(image) => {
            let key = raster::image_key(&image);
            map.write()
                .register_image(box_id, key, || raster::sampler_for(&image));
        }
        Err(e) => log::warn!("no image for {box_id}: {e}"),
    }
}

/// Props for the [`GoalMapPage`] component.
#[derive(Props, Clone, PartialEq)]
pub struct GoalMapPageProps {
    map: SharedMap,
    page: Signal<Page>,
    clock: Clock,
}

/// Rink boxes, time buckets, filters and the workflow status.
#[component]
pub fn GoalMapPage(props: GoalMapPageProps) -> Element {
    let mut map = props.map;
    let page = props.page;
    let clock = props.clock;
    let mut resize_generation = use_signal(|| 0u64);

    let on_pointer = move |(box_id, pointer): (BoxId, BoxPointer)| {
        let now = clock.now();
        // The page scrolls, so the rect stored at load or resize may be stale.
        let measured = match pointer {
            BoxPointer::Press(..) | BoxPointer::Release(..) => layout::measure(box_id)
                .map_err(|e| log::warn!("could not measure {box_id}: {e}"))
                .ok(),
            BoxPointer::Leave => None,
        };
        let outcome = {
            let mut current = map.write();
            if let Some(measured) = measured {
                current.set_layout(box_id, measured);
            }
            match pointer {
                BoxPointer::Press(x, y) => current.press(now, box_id, x, y),
                BoxPointer::Release(x, y) => current.release(now, box_id, x, y),
                BoxPointer::Leave => current.leave(now),
            }
        };
        effects::perform(outcome, page);
        effects::schedule_tick(map, clock, page);
    };

    let on_marker = move |id: MarkerId| {
        let outcome = map.write().click_marker(id);
        effects::perform(outcome, page);
    };

    let on_bucket = move |(key, action): (BucketKey, BucketAction)| {
        let outcome = map.write().click_bucket(&key, action);
        effects::perform(outcome, page);
    };

    let on_scorer = move |filter: ScorerFilter| {
        if let Err(e) = map.write().set_scorer_filter(filter) {
            effects::alert(&format!("Could not save the filter: {e}"));
        }
    };

    let on_goalie = move |filter: GoalieFilter| {
        if let Err(e) = map.write().set_goalie_filter(filter) {
            effects::alert(&format!("Could not save the filter: {e}"));
        }
    };

    let on_cancel = move |()| {
        let outcome = map.write().cancel_workflow();
        effects::perform(outcome, page);
    };

    // Debounced: only the last resize in a burst re-measures.
    let on_resize = move |_| {
        resize_generation += 1;
        let generation = *resize_generation.peek();
        let wait = map.peek().config().timing.resize_debounce_ms;
        spawn(async move {
            gloo_timers::future::TimeoutFuture::new(u32::try_from(wait).unwrap_or(u32::MAX)).await;
            if *resize_generation.peek() != generation {
                return;
            }
            let measured = layout::measure_all();
            let mut current = map.write();
            for (box_id, box_layout) in measured {
                current.set_layout(box_id, box_layout);
            }
        });
    };

    let export = move |_| match map.write().export_to_season() {
        Ok(Some(report)) => effects::alert(&format!(
            "Season updated: {} markers added, {} duplicates skipped, {} counts added.",
            report.added, report.duplicates, report.tallies
        )),
        Ok(None) => log::warn!("season update already running"),
        Err(e) => effects::alert(&format!("Could not update the season: {e}")),
    };

    let reset = move |_| {
        if effects::confirm("Clear every marker and count of this game?") {
            let outcome = map.write().reset_game();
            effects::perform(outcome, page);
        }
    };

    let current = map.read();
    let status = current.status();
    let awaiting = awaiting_box(&status);
    let row = awaiting_row(&status);
    let roster = current.roster();
    let skaters: Vec<String> = roster.skaters().map(str::to_owned).collect();
    let goalies: Vec<String> = roster.goalies().map(str::to_owned).collect();
    let filters = current.filters().clone();
    let periods: Vec<(String, [u32; BUCKETS_PER_PERIOD as usize])> = current
        .config()
        .periods
        .iter()
        .map(|period| (period.clone(), period_counts(&current, period)))
        .collect();
    let boxes: Vec<(BoxId, Vec<MarkerDot>)> = BoxId::ALL
        .into_iter()
        .map(|box_id| {
            let dots = current
                .visible_markers(box_id)
                .filter_map(MarkerDot::from_placed)
                .collect();
            (box_id, dots)
        })
        .collect();
    drop(current);

    rsx! {
        StatusBar { status, on_cancel }

        FilterBar {
            skaters,
            goalies,
            scorer: filters.scorer,
            goalie: filters.goalie,
            on_scorer,
            on_goalie,
        }

        div { class: "rink", onresize: on_resize,
            for (box_id, markers) in boxes {
                RinkBox {
                    key: "{box_id}",
                    box_id,
                    src: image_src(box_id),
                    markers,
                    class: box_class(box_id, awaiting),
                    on_pointer,
                    on_marker,
                    on_load: move |loaded: BoxId| refresh_box(map, loaded),
                }
            }
        }

        div { class: "panel",
            TimeGrid {
                periods,
                awaiting: row,
                on_bucket,
            }
        }

        div { class: "actions",
            button { onclick: export, "Export to season" }
            button { onclick: reset, "Reset game" }
        }
    }
}
