// Subcommand handlers: load config and dataset, apply the analyst's filters,
// call the engine and render the result.

use crate::render::{delta, num, opt, print_json, OutputFormat, TextTable};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::ArgMatches;
use scoutlens_core::catalog::{label, MetricCatalog, MetricPool};
use scoutlens_core::config::{self, Config, NormalizeOver};
use scoutlens_core::dataset::DatasetProvider;
use scoutlens_core::filter::{AgeCap, PlayerFilter, Range};
use scoutlens_core::shortlist::{parse_tags, EntryDetails, Priority, Shortlist, Status};
use scoutlens_core::table::{PlayerRecord, PlayerTable};
use scoutlens_engine::compare::compare_players;
use scoutlens_engine::overview::{
    maturity_curve, role_distribution, squad_evolution, MaturityPoint, RoleShare, SquadEvolution,
    DEFAULT_EVOLUTION_TOP_N,
};
use scoutlens_engine::population::{resolve_population, PopulationScope};
use scoutlens_engine::ranking::{rank_by_metric, rank_composite, SortOrder};
use scoutlens_engine::selection::{MetricSelection, SelectionBounds, WeightVector};
use scoutlens_engine::similarity::most_similar;
use scoutlens_engine::strengths::strengths_and_weaknesses;
use scoutlens_engine::teams::team_averages;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Dispatch one subcommand.
pub fn run(command: &str, matches: &ArgMatches) -> anyhow::Result<()> {
    let session = Session::open(matches)?;
    match command {
        "catalog" => catalog(&session, matches),
        "rank" => rank(&session, matches),
        "similar" => similar(&session, matches),
        "compare" => compare(&session, matches),
        "strengths" => strengths(&session, matches),
        "teams" => teams(&session, matches),
        "overview" => overview(&session, matches),
        "shortlist" => shortlist(&session, matches),
        other => bail!("unknown command `{other}`"),
    }
}

// ---------------------------------------------------------------------------
// Session: config + dataset + filters for one invocation
// ---------------------------------------------------------------------------

struct Session {
    config: Config,
    provider: DatasetProvider,
    catalog: MetricCatalog,
    filter: PlayerFilter,
    format: OutputFormat,
}

impl Session {
    fn open(matches: &ArgMatches) -> anyhow::Result<Self> {
        let base_dir = match matches.get_one::<PathBuf>("base_dir") {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("failed to read current directory")?,
        };
        let mut config =
            config::load_config_in(&base_dir).context("failed to load configuration")?;

        config.dataset.dir = match matches.get_one::<PathBuf>("data_dir") {
            Some(dir) => dir.display().to_string(),
            None => base_dir.join(&config.dataset.dir).display().to_string(),
        };
        let provider = DatasetProvider::open(&config.dataset)
            .with_context(|| format!("failed to load dataset from {}", config.dataset.dir))?;

        let catalog = provider.catalog().clone().with_presets(&config.presets);
        let filter = parse_filter(matches);
        let format = OutputFormat::from_arg(
            matches
                .get_one::<String>("format")
                .map(String::as_str)
                .unwrap_or("table"),
        );

        Ok(Self {
            config,
            provider,
            catalog,
            filter,
            format,
        })
    }

    fn table(&self) -> &PlayerTable {
        self.provider.table()
    }

    /// Rows passing the analyst's filters.
    fn pool(&self) -> PlayerTable {
        let pool = self.filter.apply(self.table());
        info!("Filtered pool: {} of {} rows", pool.len(), self.table().len());
        pool
    }

    fn decimals(&self) -> usize {
        self.config.display.decimals
    }

    /// Metrics from `--preset` or `--metrics`, or `None` when neither is given.
    fn requested_metrics(&self, matches: &ArgMatches) -> anyhow::Result<Option<Vec<String>>> {
        if let Some(role) = matches.get_one::<String>("preset") {
            let Some(keys) = self.catalog.preset(role) else {
                bail!(
                    "unknown preset `{role}`; available: {}",
                    self.catalog.preset_names().join(", ")
                );
            };
            return Ok(Some(keys));
        }
        Ok(matches.get_many::<String>("metrics").map(|values| {
            values
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect()
        }))
    }

    fn selection(&self, matches: &ArgMatches) -> anyhow::Result<MetricSelection> {
        let keys = self.requested_metrics(matches)?.unwrap_or_default();
        Ok(MetricSelection::new(&keys)?)
    }

    /// Configured default for every selected metric, then `--weight` overrides,
    /// capped at `weights.max`.
    fn weights(
        &self,
        matches: &ArgMatches,
        selection: &MetricSelection,
    ) -> anyhow::Result<WeightVector> {
        let mut weights = WeightVector::uniform();
        for metric in selection.iter() {
            weights.set(metric, self.config.weights.default)?;
        }
        for raw in matches.get_many::<String>("weight").into_iter().flatten() {
            let (metric, value) = parse_weight(raw)?;
            if !selection.iter().any(|m| m == metric) {
                bail!("weight given for `{metric}`, which is not a selected metric");
            }
            weights.set(&metric, value)?;
        }
        weights.check_ceiling(self.config.weights.max)?;
        Ok(weights)
    }
}

fn parse_filter(matches: &ArgMatches) -> PlayerFilter {
    let list = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|values| values.map(|v| v.trim().to_string()).collect())
            .unwrap_or_default()
    };
    let number = |id: &str| matches.get_one::<f64>(id).copied();

    PlayerFilter {
        leagues: list("league"),
        seasons: list("season"),
        teams: list("team"),
        roles: list("role"),
        age: Range::new(number("min_age"), number("max_age")),
        minutes: Range::new(number("min_minutes"), number("max_minutes")),
        age_cap: matches
            .get_one::<String>("age_cap")
            .and_then(|s| AgeCap::from_str_cap(s)),
    }
}

/// Parse `KEY=VALUE`.
fn parse_weight(raw: &str) -> anyhow::Result<(String, f64)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("weight `{raw}` must look like KEY=VALUE");
    };
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("weight `{raw}` has a non-numeric value"))?;
    Ok((key.trim().to_lowercase(), value))
}

fn profile_bounds(min: usize, max: usize) -> SelectionBounds {
    min..=max
}

fn identity_cells(record: &PlayerRecord) -> Vec<String> {
    vec![
        record.player.clone(),
        record.squad.clone(),
        record.season.clone(),
    ]
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CatalogView<'a> {
    dataset: String,
    rows: usize,
    pool: scoutlens_core::table::PoolSummary,
    quality: &'a scoutlens_core::dataset::DataQualityReport,
    metrics: Vec<&'a scoutlens_core::catalog::MetricInfo>,
    presets: BTreeMap<String, Vec<String>>,
}

fn catalog(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let pool_filter = matches.get_one::<String>("pool").map(|p| match p.as_str() {
        "per90" => MetricPool::Per90,
        "rate" => MetricPool::Rate,
        "ranking" => MetricPool::Ranking,
        _ => MetricPool::Profile,
    });
    let metrics: Vec<_> = session
        .catalog
        .metrics()
        .iter()
        .filter(|m| pool_filter.map_or(true, |p| m.pools.contains(&p)))
        .collect();
    let presets: BTreeMap<String, Vec<String>> = session
        .catalog
        .preset_names()
        .into_iter()
        .filter_map(|name| Some((name.to_string(), session.catalog.preset(name)?)))
        .collect();

    let dataset = session.provider.dataset();
    let view = CatalogView {
        dataset: dataset.path.display().to_string(),
        rows: dataset.table.len(),
        pool: session.pool().summary(),
        quality: &dataset.quality,
        metrics,
        presets,
    };
    if session.format == OutputFormat::Json {
        return print_json(&view);
    }

    println!("Dataset: {} ({} rows)", view.dataset, view.rows);
    println!(
        "Pool: {} rows, {} squads, mean age {}, mean minutes {}, median minutes {}",
        view.pool.players,
        view.pool.squads,
        opt(view.pool.mean_age, 1),
        opt(view.pool.mean_minutes, 0),
        opt(view.pool.median_minutes, 0)
    );
    if !view.quality.is_clean() {
        println!(
            "Data quality: {} out-of-range row(s) in [{}], {} coerced cell(s), {} skipped row(s)",
            view.quality.out_of_range_rows,
            view.quality.out_of_range_columns.join(", "),
            view.quality.coerced_cells,
            view.quality.skipped_rows
        );
    }
    println!();

    let mut table = TextTable::new(["Key", "Label", "Pools"]);
    for m in &view.metrics {
        let pools: Vec<String> = m.pools.iter().map(|p| format!("{p:?}")).collect();
        table.push(vec![m.key.clone(), m.label.clone(), pools.join(",")]);
    }
    print!("{}", table.render());
    println!();
    for (name, keys) in &view.presets {
        println!("preset {name}: {}", keys.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// rank
// ---------------------------------------------------------------------------

fn rank(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let top = matches.get_one::<usize>("top").copied().unwrap_or(25);
    let pool = session.pool();
    let d = session.decimals();

    if let Some(metric) = matches.get_one::<String>("metric") {
        let metric = metric.trim().to_lowercase();
        let order = if matches.get_flag("ascending") {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        };
        let mut ranking = rank_by_metric(&pool, &metric, order)?;
        ranking.rows.truncate(top);
        if session.format == OutputFormat::Json {
            return print_json(&ranking);
        }

        let mut table = TextTable::new(
            ["#", "Player", "Squad", "Season", "Role", "Age", "Min"]
                .into_iter()
                .map(String::from)
                .chain([label(&metric), "Index".to_string()]),
        );
        for row in &ranking.rows {
            let mut cells = vec![row.rank.to_string()];
            cells.extend(identity_cells(&row.record));
            cells.push(row.record.role.clone());
            cells.push(opt(row.record.age, 0));
            cells.push(opt(row.record.minutes, 0));
            cells.push(opt(row.value, d));
            cells.push(opt(row.index, 1));
            table.push(cells);
        }
        print!("{}", table.render());
        return Ok(());
    }

    let selection = session.selection(matches)?;
    let weights = session.weights(matches, &selection)?;
    let mut ranking = rank_composite(&pool, &selection, &weights)?;
    ranking.rows.truncate(top);
    if session.format == OutputFormat::Json {
        return print_json(&ranking);
    }

    let weighted_headers = ranking
        .metrics
        .iter()
        .zip(&ranking.weights)
        .map(|(m, w)| format!("{m} x{w}"));
    let mut table = TextTable::new(
        ["#", "Player", "Squad", "Season", "Score"]
            .into_iter()
            .map(String::from)
            .chain(weighted_headers),
    );
    for row in &ranking.rows {
        let mut cells = vec![row.rank.to_string()];
        cells.extend(identity_cells(&row.record));
        cells.push(num(row.score, 1));
        cells.extend(row.weighted_values.iter().map(|v| opt(*v, d)));
        table.push(cells);
    }
    print!("{}", table.render());
    Ok(())
}

// ---------------------------------------------------------------------------
// similar
// ---------------------------------------------------------------------------

fn similar(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let player = matches
        .get_one::<String>("player")
        .context("a reference player is required")?;
    let cfg = &session.config.similarity;
    let selection = session.selection(matches)?;
    selection.require_len(&profile_bounds(cfg.min_metrics, cfg.max_metrics))?;
    let weights = session.weights(matches, &selection)?;
    let top_k = matches.get_one::<usize>("top").copied().unwrap_or(cfg.top_k);
    let normalize_over = match matches.get_one::<String>("normalize_over").map(String::as_str) {
        Some("filtered") => NormalizeOver::Filtered,
        Some(_) => NormalizeOver::Global,
        None => cfg.normalize_over,
    };

    let pool = session.pool();
    let population = match normalize_over {
        NormalizeOver::Global => session.table(),
        NormalizeOver::Filtered => &pool,
    };
    let results = most_similar(player, &pool, &selection, &weights, population, top_k)?;
    if session.format == OutputFormat::Json {
        return print_json(&results);
    }

    println!(
        "Players most similar to {player} over {} ({:?} normalization)",
        selection.keys().join(", "),
        normalize_over
    );
    let mut table = TextTable::new(["#", "Player", "Squad", "Season", "Role", "League", "Similarity"]);
    for s in &results {
        let mut cells = vec![s.rank.to_string()];
        cells.extend(identity_cells(&s.record));
        cells.push(s.record.role.clone());
        cells.push(s.record.league.clone());
        cells.push(num(s.similarity, session.decimals()));
        table.push(cells);
    }
    if table.is_empty() {
        println!("No other players in the pool.");
    } else {
        print!("{}", table.render());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

fn compare(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let players: Vec<&str> = matches
        .get_many::<String>("players")
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    let reference = match matches.get_one::<String>("reference") {
        Some(r) => r.as_str(),
        None => players.first().copied().context("no players given")?,
    };
    let cfg = &session.config.comparison;
    let selection = session.selection(matches)?;
    selection.require_len(&profile_bounds(cfg.min_metrics, cfg.max_metrics))?;

    let context = matches
        .get_one::<String>("context")
        .map(String::as_str)
        .unwrap_or("filtered");
    let scope = PopulationScope::from_str_scope(context)
        .with_context(|| format!("unknown comparison context `{context}`"))?;

    let pool = session.pool();
    let group = resolve_population(scope, session.table(), &pool, reference)?;
    let comparison = compare_players(session.table(), &group, &players, reference, &selection)?;
    if session.format == OutputFormat::Json {
        return print_json(&comparison);
    }

    let d = session.decimals();
    println!("Comparison group: {} rows ({context})", group.len());
    let mut summary = TextTable::new(["Player", "Rows", "Index", "Delta"]);
    for p in &comparison.players {
        summary.push(vec![
            p.player.clone(),
            p.rows.to_string(),
            num(p.aggregate_index, 1),
            delta(p.delta, 1),
        ]);
    }
    print!("{}", summary.render());
    println!();

    let names: Vec<&str> = comparison.players.iter().map(|p| p.player.as_str()).collect();
    let mut radar = TextTable::new(
        std::iter::once("Metric")
            .chain(names.iter().copied())
            .chain(std::iter::once("Baseline"))
            .map(String::from),
    );
    for (i, metric) in comparison.metrics.iter().enumerate() {
        let mut cells = vec![label(metric)];
        cells.extend(comparison.players.iter().map(|p| num(p.radar[i], 1)));
        cells.push(num(comparison.baseline[i], 1));
        radar.push(cells);
    }
    print!("{}", radar.render());
    println!();

    let others: Vec<&str> = names.iter().copied().filter(|n| *n != reference).collect();
    let headers = std::iter::once("Metric".to_string())
        .chain(names.iter().map(|n| n.to_string()))
        .chain(others.iter().map(|n| format!("d {n}")))
        .chain(names.iter().map(|n| format!("pct {n}")));
    let mut detail = TextTable::new(headers);
    for row in &comparison.table {
        let mut cells = vec![label(&row.metric)];
        cells.extend(row.raw.iter().map(|v| opt(*v, d)));
        cells.extend(row.deltas.iter().map(|v| delta(*v, d)));
        cells.extend(row.group_percentiles.iter().map(|v| opt(*v, 1)));
        detail.push(cells);
    }
    print!("{}", detail.render());
    Ok(())
}

// ---------------------------------------------------------------------------
// strengths
// ---------------------------------------------------------------------------

fn strengths(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let player = matches
        .get_one::<String>("player")
        .context("a player is required")?;
    let n = matches.get_one::<usize>("top").copied().unwrap_or(5);
    let selection = match session.requested_metrics(matches)? {
        Some(keys) => MetricSelection::new(&keys)?,
        None => MetricSelection::new(&session.catalog.pool(MetricPool::Profile))?,
    };

    let pool = session.pool();
    let report = strengths_and_weaknesses(player, &pool, &selection, n)?;
    if session.format == OutputFormat::Json {
        return print_json(&report);
    }

    for (title, items) in [("Strengths", &report.strengths), ("Weaknesses", &report.weaknesses)] {
        println!("{title} of {player} (percentile within {} rows)", pool.len());
        let mut table = TextTable::new(["Metric", "Percentile"]);
        for item in items {
            table.push(vec![label(&item.metric), num(item.percentile, 1)]);
        }
        print!("{}", table.render());
        println!();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// teams
// ---------------------------------------------------------------------------

fn teams(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let top = matches.get_one::<usize>("top").copied().unwrap_or(10);
    let selection = session.selection(matches)?;
    let pool = session.pool();
    let teams = team_averages(&pool, &selection, top)?;
    if session.format == OutputFormat::Json {
        return print_json(&teams);
    }

    let d = session.decimals();
    let mut table = TextTable::new(
        ["#", "Squad", "Rows"]
            .into_iter()
            .map(String::from)
            .chain(selection.iter().map(label))
            .chain(std::iter::once("Mean".to_string())),
    );
    for team in &teams {
        let mut cells = vec![team.rank.to_string(), team.squad.clone(), team.rows.to_string()];
        cells.extend(team.means.iter().map(|v| num(*v, d)));
        cells.push(num(team.overall, d));
        table.push(cells);
    }
    print!("{}", table.render());
    Ok(())
}

// ---------------------------------------------------------------------------
// overview
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct OverviewView {
    maturity: Vec<MaturityPoint>,
    roles: Vec<RoleShare>,
    evolution: Option<SquadEvolution>,
}

fn overview(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let top = matches
        .get_one::<usize>("top")
        .copied()
        .unwrap_or(DEFAULT_EVOLUTION_TOP_N);
    let pool = session.pool();
    let evolution = match session.requested_metrics(matches)? {
        Some(keys) => Some(squad_evolution(&pool, &MetricSelection::new(&keys)?, top)?),
        None => None,
    };
    let view = OverviewView {
        maturity: maturity_curve(&pool)?,
        roles: role_distribution(&pool)?,
        evolution,
    };
    if session.format == OutputFormat::Json {
        return print_json(&view);
    }

    println!("Mean minutes by role and age");
    let mut curve = TextTable::new(["Role", "Age", "Rows", "Minutes"]);
    for p in &view.maturity {
        curve.push(vec![
            p.role.clone(),
            num(p.age, 0),
            p.rows.to_string(),
            num(p.mean_minutes, 0),
        ]);
    }
    print!("{}", curve.render());
    println!();

    println!("Role mix per league");
    let mut roles = TextTable::new(["League", "Role", "Rows", "Share %"]);
    for r in &view.roles {
        roles.push(vec![
            r.league.clone(),
            r.role.clone(),
            r.rows.to_string(),
            num(r.share * 100.0, 1),
        ]);
    }
    print!("{}", roles.render());

    if let Some(evo) = &view.evolution {
        println!();
        println!("Squad evolution (top {}: {})", evo.squads.len(), evo.squads.join(", "));
        let mut table = TextTable::new(
            ["Season", "Squad"]
                .into_iter()
                .map(String::from)
                .chain(evo.metrics.iter().map(|m| label(m))),
        );
        for s in &evo.seasons {
            let mut cells = vec![s.season.clone(), s.squad.clone()];
            cells.extend(s.means.iter().map(|v| opt(*v, session.decimals())));
            table.push(cells);
        }
        print!("{}", table.render());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// shortlist
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ShortlistView<'a> {
    entries: &'a [scoutlens_core::shortlist::ShortlistEntry],
    counts: scoutlens_core::shortlist::StatusCounts,
    mean_age: Option<f64>,
}

fn entry_details(matches: &ArgMatches) -> anyhow::Result<EntryDetails> {
    let text = |id: &str| matches.get_one::<String>(id).cloned().unwrap_or_default();
    let next_action = match matches.get_one::<String>("next_action") {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("next action date `{raw}` is not YYYY-MM-DD"))?,
        ),
        None => None,
    };
    Ok(EntryDetails {
        status: Status::from_str_status(&text("status"))?,
        priority: Priority::from_str_priority(&text("priority"))?,
        tags: parse_tags(&text("tags")),
        notes: text("notes"),
        next_action,
        estimated_fee: text("fee"),
    })
}

fn shortlist(session: &Session, matches: &ArgMatches) -> anyhow::Result<()> {
    let players: Vec<&str> = matches
        .get_many::<String>("players")
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    let details = entry_details(matches)?;

    let pool = session.pool();
    let mut list = Shortlist::new();
    let outcome = list.add_players(&pool, &players, &details)?;

    let view = ShortlistView {
        entries: list.entries(),
        counts: list.status_counts(),
        mean_age: list.mean_age(),
    };
    if session.format == OutputFormat::Json {
        return print_json(&view);
    }

    println!(
        "Added {} row(s); {} already listed. Observed {}, tracking {}, candidate {}, rejected {}; mean age {}",
        outcome.added,
        outcome.already_listed,
        view.counts.observed,
        view.counts.tracking,
        view.counts.candidate,
        view.counts.rejected,
        opt(view.mean_age, 1)
    );
    let mut table = TextTable::new([
        "Player", "Squad", "Season", "Age", "Status", "Priority", "Tags", "Next action", "Fee",
    ]);
    for e in view.entries {
        let mut cells = identity_cells(&e.record);
        cells.push(opt(e.record.age, 0));
        cells.push(format!("{:?}", e.status));
        cells.push(format!("{:?}", e.priority));
        cells.push(e.tags.join(", "));
        cells.push(e.next_action.map(|d| d.to_string()).unwrap_or_default());
        cells.push(e.estimated_fee.clone());
        table.push(cells);
    }
    print!("{}", table.render());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_parse_key_value() {
        assert_eq!(parse_weight("GLS_per90 = 1.5").unwrap(), ("gls_per90".to_string(), 1.5));
        assert!(parse_weight("gls_per90").is_err());
        assert!(parse_weight("gls_per90=high").is_err());
    }

    #[test]
    fn profile_bounds_are_inclusive() {
        let bounds = profile_bounds(4, 10);
        assert!(bounds.contains(&4) && bounds.contains(&10));
        assert!(!bounds.contains(&11));
    }
}
