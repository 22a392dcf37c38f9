//! Time-bucket grid: one scored row and one conceded row per period.
//!
//! Click adds one; right-click removes one.

use dioxus::prelude::*;
use rinkmap_core::ledger::{BUCKETS_PER_PERIOD, BUCKETS_PER_ROW};
use rinkmap_core::{BucketAction, BucketKey, Row};

/// Props for the [`TimeGrid`] component.
#[derive(Props, Clone, PartialEq)]
pub struct TimeGridProps {
    /// Periods in display order, each with its eight displayed counts.
    periods: Vec<(String, [u32; BUCKETS_PER_PERIOD as usize])>,
    /// Row the workflow is waiting for, highlighted.
    #[props(default)]
    awaiting: Option<Row>,
    /// Bucket clicked.
    on_bucket: EventHandler<(BucketKey, BucketAction)>,
}

/// Grid of per-period time buckets.
#[component]
pub fn TimeGrid(props: TimeGridProps) -> Element {
    rsx! {
        table { class: "time-grid",
            thead {
                tr {
                    th {}
                    th { "Row" }
                    for slot in 0..BUCKETS_PER_ROW {
                        th { "{slot + 1}" }
                    }
                }
            }
            tbody {
                for (period, counts) in props.periods.iter() {
                    for row in [Row::Scored, Row::Conceded] {
                        {render_row(period, row, counts, props.awaiting == Some(row), props.on_bucket)}
                    }
                }
            }
        }
    }
}

fn render_row(
    period: &str,
    row: Row,
    counts: &[u32; BUCKETS_PER_PERIOD as usize],
    highlighted: bool,
    on_bucket: EventHandler<(BucketKey, BucketAction)>,
) -> Element {
    let (label, offset, row_class) = match row {
        Row::Scored => ("For", 0, "row-scored"),
        Row::Conceded => ("Against", BUCKETS_PER_ROW, "row-conceded"),
    };
    let highlight = if highlighted { "awaiting" } else { "" };
    let first = row == Row::Scored;

    rsx! {
        tr { class: "{row_class} {highlight}",
            if first {
                th { rowspan: "2", class: "period", "{period.to_uppercase()}" }
            }
            td { class: "row-label", "{label}" }
            for index in offset..offset + BUCKETS_PER_ROW {
                {render_cell(period, index, counts[usize::from(index)], on_bucket)}
            }
        }
    }
}

fn render_cell(
    period: &str,
    index: u8,
    count: u32,
    on_bucket: EventHandler<(BucketKey, BucketAction)>,
) -> Element {
    let key = match BucketKey::new(period, index) {
        Ok(key) => key,
        Err(e) => {
            log::warn!("not rendering bucket: {e}");
            return rsx! { td {} };
        }
    };
    let decrement_key = key.clone();

    rsx! {
        td {
            class: "bucket",
            title: "{key}",
            onclick: move |_| on_bucket.call((key.clone(), BucketAction::Increment)),
            oncontextmenu: move |evt| {
                evt.prevent_default();
                on_bucket.call((decrement_key.clone(), BucketAction::Decrement));
            },
            "{count}"
        }
    }
}
