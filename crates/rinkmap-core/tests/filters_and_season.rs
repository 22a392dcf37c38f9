//! Integration tests: filtering, persistence migration, geometry and
//! season export across the public API.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use rinkmap_core::geometry::container_percent_to_image_percent;
use rinkmap_core::store::NewMarker;
use rinkmap_core::{
    BoxId, BoxLayout, BucketAction, BucketKey, GoalMap, GoalMapConfig, GoalieFilter, Gesture,
    ImagePoint, MarkerColor, MarkerStore, MemoryStorage, Rect, ScorerFilter, Size, Storage, Zone,
};

fn key(s: &str) -> BucketKey {
    s.parse().unwrap()
}

/// A game with green markers for two scorers and red markers for two
/// goalies.
fn populated() -> GoalMap<MemoryStorage> {
    let mut map = GoalMap::new(GoalMapConfig::default(), MemoryStorage::new());
    for (scorer, x) in [("Diego Warth", 20.0), ("Sam", 30.0)] {
        map.set_scorer_filter(ScorerFilter::Player(scorer.into())).unwrap();
        map.click_box(BoxId::OffenseField, ImagePoint::new(x, 20.0), Gesture::Single);
        map.click_bucket(&key("p1_0"), BucketAction::Increment);
    }
    for (goalie, x) in [("Kim", 20.0), ("Lee", 30.0)] {
        map.set_goalie_filter(GoalieFilter::single(goalie)).unwrap();
        map.click_box(BoxId::OffenseField, ImagePoint::new(x, 80.0), Gesture::Single);
        map.click_bucket(&key("p1_4"), BucketAction::Increment);
    }
    map.set_scorer_filter(ScorerFilter::All).unwrap();
    map.set_goalie_filter(GoalieFilter::All).unwrap();
    map
}

fn visible(map: &GoalMap<MemoryStorage>, zone: Zone) -> Vec<String> {
    map.visible_markers(BoxId::OffenseField)
        .filter(|m| m.marker.zone == zone)
        .filter_map(|m| m.marker.player.clone())
        .collect()
}

#[test]
fn filters_are_independent() {
    let mut map = populated();
    assert_eq!(visible(&map, Zone::Green).len(), 2);
    assert_eq!(visible(&map, Zone::Red).len(), 2);

    map.set_scorer_filter(ScorerFilter::Player("Sam".into())).unwrap();
    assert_eq!(visible(&map, Zone::Green), ["Sam"]);
    assert_eq!(visible(&map, Zone::Red), ["Kim", "Lee"]);
    assert_eq!(map.bucket_display(&key("p1_0")), 1);
    assert_eq!(map.bucket_display(&key("p1_4")), 2);

    map.set_scorer_filter(ScorerFilter::All).unwrap();
    map.set_goalie_filter(GoalieFilter::single("Lee")).unwrap();
    assert_eq!(visible(&map, Zone::Green), ["Diego Warth", "Sam"]);
    assert_eq!(visible(&map, Zone::Red), ["Lee"]);
    assert_eq!(map.bucket_display(&key("p1_0")), 2);
    assert_eq!(map.bucket_display(&key("p1_4")), 1);

    // Stored data is untouched by filtering.
    assert_eq!(map.markers().len(), 4);
    assert_eq!(map.ledger().grand_total(), 4);
}

#[test]
fn filters_persist_across_reload() {
    let mut map = populated();
    map.set_goalie_filter(GoalieFilter::single("Kim")).unwrap();
    let mut reloaded = GoalMap::new(GoalMapConfig::default(), map.storage().clone());
    reloaded.load().unwrap();
    assert_eq!(reloaded.filters().active_goalie(), Some("Kim"));
}

#[test]
fn legacy_markers_get_zones_by_fallback() {
    let mut storage = MemoryStorage::new();
    storage
        .set(
            "goalMapMarkers",
            r##"[
                [
                    {"xPct": 40, "yPct": 70, "color": "grey"},
                    {"xPct": 40, "yPct": 30, "color": "grey"},
                    {"xPct": 40, "yPct": 30, "color": "#ff0000"},
                    {"xPct": 0, "yPct": 0, "color": "grey"},
                    {"xPct": "oops"}
                ],
                [],
                [{"xPct": 50, "yPct": 90, "color": "rgb(128, 128, 128)"}],
                []
            ]"##,
        )
        .unwrap();

    let mut map = GoalMap::new(GoalMapConfig::default(), storage);
    let report = map.load().unwrap();
    assert_eq!(report.restored, 4);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.migrated, 4);

    let zones: Vec<Zone> = map
        .markers()
        .markers(BoxId::OffenseField)
        .iter()
        .map(|m| m.marker.zone)
        .collect();
    assert_eq!(zones, [Zone::Red, Zone::Green, Zone::Red]);
    assert_eq!(map.markers().markers(BoxId::OffenseGoal)[0].marker.zone, Zone::Green);

    // The migration was written back.
    let raw = map.storage().get("goalMapMarkers").unwrap();
    assert!(raw.contains(r#""zone":"red""#));
    assert!(!raw.contains("#ff0000"));
}

#[test]
fn markers_track_layout_changes() {
    let wide = BoxLayout {
        natural: Some(Size::new(400.0, 200.0)),
        image_rect: Rect::new(0.0, 0.0, 800.0, 800.0),
        container_rect: Rect::new(0.0, 0.0, 800.0, 800.0),
    };
    let tall = BoxLayout {
        natural: Some(Size::new(400.0, 200.0)),
        image_rect: Rect::new(10.0, 10.0, 300.0, 900.0),
        container_rect: Rect::new(0.0, 0.0, 320.0, 920.0),
    };

    let mut store = MarkerStore::new();
    let points = [(0.0, 0.0), (12.5, 87.5), (40.0, 30.0), (100.0, 100.0)];
    for (x, y) in points {
        store.create(
            NewMarker {
                box_id: BoxId::OffenseField,
                position: ImagePoint::new(x, y),
                color: MarkerColor::Scored,
                player: None,
                zone: Zone::Green,
                interactive: true,
            },
            Some(&wide),
        );
    }

    store.reposition(&HashMap::from([(BoxId::OffenseField, tall)]));
    for (placed, (x, y)) in store.markers(BoxId::OffenseField).iter().zip(points) {
        let back = container_percent_to_image_percent(placed.placement.unwrap(), &tall);
        assert!((back.x - x).abs() <= 0.5, "x {x} came back as {}", back.x);
        assert!((back.y - y).abs() <= 0.5, "y {y} came back as {}", back.y);
    }

    store.create(
        NewMarker {
            box_id: BoxId::DefenseField,
            position: ImagePoint::new(-5.0, 150.0),
            color: MarkerColor::Conceded,
            player: None,
            zone: Zone::Red,
            interactive: true,
        },
        None,
    );
    let clamped = store.markers(BoxId::DefenseField)[0].marker.position;
    assert_eq!(clamped, ImagePoint::new(0.0, 100.0));
}

#[test]
fn season_export_dedups_markers_and_adds_counts() {
    let mut map = populated();
    let first = map.export_to_season().unwrap().unwrap();
    assert_eq!((first.added, first.duplicates, first.tallies), (4, 0, 4));

    let second = map.export_to_season().unwrap().unwrap();
    assert_eq!((second.added, second.duplicates), (0, 4));

    let season = map.season_data().unwrap().unwrap();
    assert_eq!(season.markers.len(), 4);
    assert_eq!(season.ledger.total(&key("p1_0")), 4);
    assert_eq!(season.momentum["p1"], [4, 0, 0, 0, 4, 0, 0, 0]);

    // A new game adds only what is new.
    map.reset_game();
    map.set_scorer_filter(ScorerFilter::Player("Sam".into())).unwrap();
    map.click_box(BoxId::OffenseField, ImagePoint::new(30.0, 20.0), Gesture::Single);
    map.click_box(BoxId::OffenseField, ImagePoint::new(35.0, 20.0), Gesture::Single);
    let third = map.export_to_season().unwrap().unwrap();
    assert_eq!((third.added, third.duplicates), (1, 1));

    map.reset_season();
    assert!(map.season_data().unwrap().unwrap().markers.is_empty());
}

#[test]
fn reset_game_clears_live_keys_only() {
    let mut map = populated();
    map.export_to_season().unwrap();
    map.reset_game();
    assert!(map.markers().is_empty());
    assert!(map.ledger().is_empty());
    assert_eq!(map.storage().get("goalMapMarkers").unwrap(), "[[],[],[],[]]");
    assert_eq!(map.storage().get("timeData").unwrap(), "{}");
    assert!(map.storage().get("seasonMapMarkers").is_some());
}
