// Integration tests for the scoring engine.
//
// These exercise the public API end-to-end on small hand-built tables and
// check the behavioural guarantees callers rely on: bounded normalization,
// percentile tie handling, weight rescaling, similarity self-exclusion and
// shape matching, stable ordering, and the metric-count guards.

use scoutlens_core::table::{PlayerRecord, PlayerTable};
use scoutlens_engine::compare::compare_players;
use scoutlens_engine::error::{EngineError, ErrorKind};
use scoutlens_engine::normalize::{normalize_minmax, normalize_percentile, Scale};
use scoutlens_engine::population::{resolve_population, PopulationScope};
use scoutlens_engine::ranking::{rank_by_metric, rank_composite, SortOrder};
use scoutlens_engine::scorer::composite_score;
use scoutlens_engine::selection::{MetricSelection, WeightVector};
use scoutlens_engine::similarity::{most_similar, DEFAULT_TOP_K};

// ===========================================================================
// Test helpers
// ===========================================================================

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

fn selection(keys: &[&str]) -> MetricSelection {
    MetricSelection::new(keys).unwrap()
}

/// The three-player scenario: A and B lean on goals, C on expected goals.
fn abc_table() -> PlayerTable {
    PlayerTable::builder(&["gls_per90", "xg_per90"])
        .row(PlayerRecord::new("A", "Alpha", "2024"), &[Some(0.8), Some(0.6)])
        .row(PlayerRecord::new("B", "Beta", "2024"), &[Some(0.4), Some(0.3)])
        .row(PlayerRecord::new("C", "Gamma", "2024"), &[Some(0.1), Some(0.9)])
        .build()
        .unwrap()
}

/// A larger pool with several seasons per player and some gaps.
fn league_table() -> PlayerTable {
    let metrics = ["gls_per90", "ast_per90", "xg_per90", "cmp%", "tkl_per90"];
    let rows: [(&str, &str, &str, &str, [Option<f64>; 5]); 8] = [
        ("Ruiz", "Sevilla", "2023", "Forward", [Some(0.62), Some(0.10), Some(0.55), Some(71.0), Some(0.4)]),
        ("Ruiz", "Sevilla", "2024", "Forward", [Some(0.70), Some(0.12), Some(0.60), Some(73.0), Some(0.5)]),
        ("Ortega", "Betis", "2024", "Forward", [Some(0.48), Some(0.20), Some(0.41), Some(75.0), Some(0.6)]),
        ("Lima", "Girona", "2024", "Midfielder", [Some(0.10), Some(0.31), Some(0.08), Some(88.0), Some(2.1)]),
        ("Vidal", "Getafe", "2024", "Midfielder", [Some(0.05), Some(0.22), None, Some(84.0), Some(2.8)]),
        ("Navas", "Valencia", "2024", "Defender", [Some(0.02), Some(0.05), Some(0.03), Some(81.0), Some(1.9)]),
        ("Costa", "Betis", "2024", "Forward", [Some(0.31), Some(0.06), Some(0.35), None, Some(0.7)]),
        ("Pardo", "Girona", "2024", "Midfielder", [Some(0.12), Some(0.30), Some(0.09), Some(87.5), Some(2.0)]),
    ];
    rows.iter()
        .fold(PlayerTable::builder(&metrics), |b, (player, squad, season, role, values)| {
            b.row(
                PlayerRecord::new(player, squad, season)
                    .with_role(role)
                    .with_league("La Liga"),
                values,
            )
        })
        .build()
        .unwrap()
}

// ===========================================================================
// Normalization
// ===========================================================================

#[test]
fn minmax_output_bounded_and_zero_range_is_zero() {
    let table = league_table();
    let sel = selection(&["gls_per90", "ast_per90", "xg_per90", "cmp%", "tkl_per90"]);
    let frame = normalize_minmax(&table, &table, &sel, Scale::Percent).unwrap();
    for m in 0..sel.len() {
        for &v in frame.column_at(m) {
            assert!((0.0..=100.0).contains(&v), "value {v} outside [0, 100]");
        }
    }

    let flat = PlayerTable::builder(&["x"])
        .row(PlayerRecord::new("P", "S", "2024"), &[Some(7.0)])
        .row(PlayerRecord::new("Q", "S", "2024"), &[Some(7.0)])
        .build()
        .unwrap();
    let frame = normalize_minmax(&flat, &flat, &selection(&["x"]), Scale::Unit).unwrap();
    assert_eq!(frame.column("x").unwrap(), &[0.0, 0.0]);
}

#[test]
fn percentile_ties_share_average_rank() {
    let table = PlayerTable::builder(&["x"])
        .row(PlayerRecord::new("P", "S", "2024"), &[Some(10.0)])
        .row(PlayerRecord::new("Q", "S", "2024"), &[Some(10.0)])
        .row(PlayerRecord::new("R", "S", "2024"), &[Some(20.0)])
        .build()
        .unwrap();
    let frame = normalize_percentile(&table, &selection(&["x"])).unwrap();
    assert_eq!(frame.column("x").unwrap(), &[Some(50.0), Some(50.0), Some(100.0)]);
}

// ===========================================================================
// Composite scoring and ranking
// ===========================================================================

#[test]
fn composite_invariant_under_weight_rescaling() {
    let table = league_table();
    let sel = selection(&["gls_per90", "ast_per90", "tkl_per90"]);
    let frame = normalize_minmax(&table, &table, &sel, Scale::Unit).unwrap();

    let base = WeightVector::uniform()
        .with("gls_per90", 2.0)
        .unwrap()
        .with("ast_per90", 0.5)
        .unwrap()
        .with("tkl_per90", 1.0)
        .unwrap();
    let scaled = WeightVector::uniform()
        .with("gls_per90", 0.2)
        .unwrap()
        .with("ast_per90", 0.05)
        .unwrap()
        .with("tkl_per90", 0.1)
        .unwrap();

    let a = composite_score(&frame, &base).unwrap();
    let b = composite_score(&frame, &scaled).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert!(approx_eq(*x, *y, 1e-6));
    }

    let ra = rank_composite(&table, &sel, &base).unwrap();
    let rb = rank_composite(&table, &sel, &scaled).unwrap();
    let keys_a: Vec<&str> = ra.rows.iter().map(|r| r.record.row_key.as_str()).collect();
    let keys_b: Vec<&str> = rb.rows.iter().map(|r| r.record.row_key.as_str()).collect();
    assert_eq!(keys_a, keys_b);
}

#[test]
fn composite_with_two_metrics_is_input_shape_error() {
    let table = league_table();
    let err = rank_composite(
        &table,
        &selection(&["gls_per90", "xg_per90"]),
        &WeightVector::uniform(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputShape);
    assert_eq!(err, EngineError::InsufficientMetrics { required: 3, got: 2 });
}

#[test]
fn rankings_are_stable_across_reruns() {
    let table = league_table();
    let sel = selection(&["gls_per90", "xg_per90", "ast_per90", "cmp%"]);
    let first = rank_composite(&table, &sel, &WeightVector::uniform()).unwrap();
    let second = rank_composite(&table, &sel, &WeightVector::uniform()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let single = rank_by_metric(&table, "cmp%", SortOrder::Descending).unwrap();
    assert_eq!(single, rank_by_metric(&table, "cmp%", SortOrder::Descending).unwrap());
    // Costa has no cmp% value and sorts last.
    assert_eq!(single.rows.last().unwrap().record.player, "Costa");
}

// ===========================================================================
// Similarity
// ===========================================================================

#[test]
fn abc_scenario_ranks_b_above_c() {
    let table = abc_table();
    let out = most_similar(
        "A",
        &table,
        &selection(&["gls_per90", "xg_per90"]),
        &WeightVector::uniform(),
        &table,
        DEFAULT_TOP_K,
    )
    .unwrap();
    let names: Vec<&str> = out.iter().map(|s| s.record.player.as_str()).collect();
    assert_eq!(names, vec!["B", "C"]);
    assert!(out[0].similarity > out[1].similarity);
}

#[test]
fn reference_rows_never_returned() {
    let table = league_table();
    let sel = selection(&["gls_per90", "ast_per90", "xg_per90", "tkl_per90"]);
    let out = most_similar("Ruiz", &table, &sel, &WeightVector::uniform(), &table, DEFAULT_TOP_K).unwrap();
    assert_eq!(out.len(), table.len() - 2);
    assert!(out.iter().all(|s| s.record.player != "Ruiz"));
    for s in &out {
        assert!(s.similarity >= -1e-9 && s.similarity <= 1.0 + 1e-9);
    }
    // The other forwards are the closest profiles.
    let mut top: Vec<&str> = out[..2].iter().map(|s| s.record.player.as_str()).collect();
    top.sort();
    assert_eq!(top, vec!["Costa", "Ortega"]);
}

#[test]
fn proportional_profiles_score_one() {
    // Z pins every minimum at zero so scaling preserves proportions.
    let table = PlayerTable::builder(&["a", "b", "c"])
        .row(PlayerRecord::new("Z", "S", "2024"), &[Some(0.0), Some(0.0), Some(0.0)])
        .row(PlayerRecord::new("R", "S", "2024"), &[Some(1.0), Some(2.0), Some(3.0)])
        .row(PlayerRecord::new("S", "S", "2024"), &[Some(2.0), Some(4.0), Some(6.0)])
        .row(PlayerRecord::new("T", "S", "2024"), &[Some(3.0), Some(1.0), Some(2.0)])
        .build()
        .unwrap();
    let out = most_similar(
        "R",
        &table,
        &selection(&["a", "b", "c"]),
        &WeightVector::uniform(),
        &table,
        DEFAULT_TOP_K,
    )
    .unwrap();
    assert_eq!(out[0].record.player, "S");
    assert!(approx_eq(out[0].similarity, 1.0, 1e-6));
}

#[test]
fn similarity_stable_across_reruns() {
    let table = league_table();
    let sel = selection(&["gls_per90", "ast_per90", "tkl_per90", "cmp%"]);
    let pool = table.filter_records(|r| r.role != "Defender");
    let run = || most_similar("Lima", &pool, &sel, &WeightVector::uniform(), &table, 5).unwrap();
    assert_eq!(run(), run());
    assert_eq!(run()[0].record.player, "Pardo");
}

#[test]
fn missing_reference_is_distinct_from_empty_result() {
    let table = league_table();
    let sel = selection(&["gls_per90", "ast_per90"]);
    let err = most_similar("Nobody", &table, &sel, &WeightVector::uniform(), &table, 5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);

    let only_lima = table.filter_records(|r| r.player == "Lima");
    let out = most_similar("Lima", &only_lima, &sel, &WeightVector::uniform(), &table, 5).unwrap();
    assert!(out.is_empty());
}

// ===========================================================================
// Comparison over a resolved population
// ===========================================================================

#[test]
fn comparison_within_same_role_group() {
    let table = league_table();
    let group = resolve_population(PopulationScope::SameRole, &table, &table, "Lima").unwrap();
    assert_eq!(group.len(), 3);

    let sel = selection(&["ast_per90", "tkl_per90", "cmp%", "gls_per90"]);
    let cmp = compare_players(&table, &group, &["Lima", "Vidal", "Ruiz"], "Lima", &sel).unwrap();
    // Ruiz is a forward and not in the midfield group.
    assert_eq!(cmp.players.len(), 2);
    assert_eq!(cmp.table.len(), 4);
    assert_eq!(cmp.table[0].deltas.len(), 1);
    for profile in &cmp.players {
        for v in &profile.radar {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
