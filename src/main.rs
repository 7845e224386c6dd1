// Scorebook entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr; stdout carries command output)
// 2. Parse the command line
// 3. Load config (auto-copying defaults on first run)
// 4. Open the stats store
// 5. Dispatch the command

use chrono::NaiveDate;
use scorebook::config;
use scorebook::extract::VisionClient;
use scorebook::ingest::{self, GameMeta};
use scorebook::query::Query;
use scorebook::stats::leaders::StatKind;
use scorebook::store::{DataType, GameFormat, Store};

use anyhow::{bail, Context};
use tracing::{info, warn};

const USAGE: &str = "usage: scorebook <command>

commands:
  summary                                        store-wide counts
  seasons                                        known seasons, newest first
  players [season]                               roster names
  player <name>                                  one player's history and averages
  season <label>                                 season overview and opponent records
  game <date>                                    one game's box score (YYYY-MM-DD)
  leaders [season] [pts|reb|ast|stl|blk|to]      leaderboard
  compare <name> <season-a> <season-b>           one player across two seasons
  delete-game <date> <opponent> [our|opponent]   remove a game's rows
  ingest <image> <date> <season> <opponent> <team-score> <opp-score>
         [--format 4Q|2Q|Other] [--opponent-team NAME]
                                                 extract and store a box score";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;

    // 2. Parse the command line
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(team = %config.team.name, data = %config.data_path, "config loaded");

    // 4. Open the stats store. A corrupt file degrades read commands to an
    //    empty view but blocks mutations, so a bad load can never be
    //    persisted over the real data.
    let store = match Store::open(&config.data_path) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "stats file could not be loaded; continuing with empty data");
            if matches!(command, "ingest" | "delete-game") {
                bail!("refusing to modify {}: {e}", config.data_path);
            }
            Store::empty(&config.data_path)
        }
    };

    // 5. Dispatch
    match command {
        "summary" => cmd_summary(&store),
        "seasons" => cmd_seasons(&store),
        "players" => cmd_players(&store, args.get(1).map(String::as_str)),
        "player" => cmd_player(&store, args.get(1).context("player: missing <name>")?),
        "season" => cmd_season(&store, args.get(1).context("season: missing <label>")?),
        "game" => cmd_game(&store, parse_date(args.get(1).context("game: missing <date>")?)?),
        "leaders" => cmd_leaders(&store, &args[1..]),
        "compare" => cmd_compare(&store, &args[1..]),
        "delete-game" => cmd_delete_game(store, &args[1..]),
        "ingest" => cmd_ingest(store, &config, &args[1..]).await,
        other => {
            println!("{USAGE}");
            bail!("unknown command: {other}");
        }
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_summary(store: &Store) -> anyhow::Result<()> {
    let s = Query::new(store).stats_summary();
    println!("seasons: {}", s.seasons.join(", "));
    println!("games:   {}", s.total_games);
    println!("players: {}", s.total_players);
    println!("rows:    {}", s.total_rows);
    Ok(())
}

fn cmd_seasons(store: &Store) -> anyhow::Result<()> {
    for season in Query::new(store).seasons() {
        println!("{season}");
    }
    Ok(())
}

fn cmd_players(store: &Store, season: Option<&str>) -> anyhow::Result<()> {
    for name in Query::new(store).players(season) {
        println!("{name}");
    }
    Ok(())
}

fn cmd_player(store: &Store, name: &str) -> anyhow::Result<()> {
    let data = Query::new(store).get_player_data(name);
    if data.rows.is_empty() {
        println!("no games recorded for {name}");
        return Ok(());
    }

    let a = &data.averages;
    println!("{name}: {} games", a.games_played);
    println!(
        "  {:.1} pts  {:.1} reb  {:.1} ast  {:.1} stl  {:.1} blk  {:.1} to",
        a.ppg, a.rpg, a.apg, a.spg, a.bpg, a.topg
    );
    println!(
        "  FG {:.1}%  3P {:.1}%  FT {:.1}%",
        a.fg_pct, a.tp_pct, a.ft_pct
    );
    println!("  contribution: {:.2}", data.contribution);
    println!();
    for row in &data.rows {
        println!(
            "  {}  vs {:<12} {:>3} pts {:>2} reb {:>2} ast  ({})",
            row.game_date, row.opponent, row.pts, row.reb, row.ast, row.season
        );
    }
    Ok(())
}

fn cmd_season(store: &Store, label: &str) -> anyhow::Result<()> {
    let data = Query::new(store).get_season_data(label);
    let ov = &data.overview;
    if ov.games == 0 {
        println!("no games recorded for {label}");
        return Ok(());
    }

    println!(
        "{label}: {} games, {} players, {}-{} ({:.1}%)",
        ov.games, ov.players, ov.wins, ov.losses, ov.win_pct
    );
    println!(
        "  scoring {:.1} for / {:.1} against per game",
        ov.avg_pts, ov.avg_pts_against
    );
    println!();
    for rec in &data.opponents {
        println!(
            "  {:<14} {} games  {}-{}  {:.1} / {:.1}",
            rec.opponent, rec.games, rec.wins, rec.losses, rec.avg_pts_for, rec.avg_pts_against
        );
    }
    Ok(())
}

fn cmd_game(store: &Store, date: NaiveDate) -> anyhow::Result<()> {
    let data = Query::new(store).get_game_data(date);
    let Some(date) = data.date else {
        println!("no game recorded on that date");
        return Ok(());
    };

    if let Some(first) = data.our_rows.first() {
        println!(
            "{date} vs {}  {}-{}  ({})",
            first.opponent, first.team_score, first.opponent_score, first.season
        );
    } else {
        println!("{date} (opponent sheet only)");
    }
    for row in &data.our_rows {
        println!(
            "  {:<16} {:>3} pts {:>2} reb {:>2} ast {:>2} stl {:>2} blk  {}",
            row.player_name, row.pts, row.reb, row.ast, row.stl, row.blk, row.minutes
        );
    }
    let t = &data.team;
    println!(
        "  team: {} pts, {} reb, {} ast, FG {:.1}%",
        t.pts, t.reb, t.ast, t.fg_pct
    );
    if !data.opponent_rows.is_empty() {
        println!("  opponent rows: {}", data.opponent_rows.len());
    }
    Ok(())
}

fn cmd_leaders(store: &Store, args: &[String]) -> anyhow::Result<()> {
    // Either argument may be omitted: `leaders`, `leaders 2024-25`,
    // `leaders reb`, `leaders 2024-25 reb`.
    let mut season: Option<&str> = None;
    let mut stat = StatKind::Points;
    for arg in args {
        match parse_stat(arg) {
            Some(kind) => stat = kind,
            None => season = Some(arg.as_str()),
        }
    }

    for (i, entry) in Query::new(store).leaders(season, stat, 10).iter().enumerate() {
        println!(
            "{:>2}. {:<16} {:>5.1} {}  ({} in {} games)",
            i + 1,
            entry.player_name,
            entry.avg,
            stat.label(),
            entry.total,
            entry.games_played
        );
    }
    Ok(())
}

fn cmd_compare(store: &Store, args: &[String]) -> anyhow::Result<()> {
    let name = args.first().context("compare: missing <name>")?;
    let first = args.get(1).context("compare: missing <season-a>")?;
    let second = args.get(2).context("compare: missing <season-b>")?;

    let cmp = Query::new(store).compare_player(name, first, second);
    println!("{name}");
    for line in [&cmp.first, &cmp.second] {
        let a = &line.averages;
        println!(
            "  {}: {} games  {:.1} pts  {:.1} reb  {:.1} ast  {:.1} stl  {:.1} blk  {:.1} to  contribution {:.2}",
            line.season, a.games_played, a.ppg, a.rpg, a.apg, a.spg, a.bpg, a.topg, line.contribution
        );
    }
    let d = &cmp.delta;
    println!(
        "  delta: {:+.2} pts  {:+.2} reb  {:+.2} ast  {:+.2} stl  {:+.2} blk  {:+.2} to  {:+.2} contribution",
        d.ppg, d.rpg, d.apg, d.spg, d.bpg, d.topg, d.contribution
    );
    Ok(())
}

fn parse_stat(arg: &str) -> Option<StatKind> {
    match arg.to_lowercase().as_str() {
        "pts" => Some(StatKind::Points),
        "reb" => Some(StatKind::Rebounds),
        "ast" => Some(StatKind::Assists),
        "stl" => Some(StatKind::Steals),
        "blk" => Some(StatKind::Blocks),
        "to" => Some(StatKind::Turnovers),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Mutating commands
// ---------------------------------------------------------------------------

fn cmd_delete_game(mut store: Store, args: &[String]) -> anyhow::Result<()> {
    let date = parse_date(args.first().context("delete-game: missing <date>")?)?;
    let opponent = args.get(1).context("delete-game: missing <opponent>")?;
    let data_type = match args.get(2).map(String::as_str) {
        None => None,
        Some("our") => Some(DataType::OurTeam),
        Some("opponent") => Some(DataType::OpponentTeam),
        Some(other) => bail!("delete-game: data type must be `our` or `opponent`, got {other}"),
    };

    let removed = store.delete_game(date, opponent, data_type);
    if removed == 0 {
        println!("no matching rows");
        return Ok(());
    }
    store.persist().context("failed to persist after delete")?;
    println!("removed {removed} rows");
    Ok(())
}

async fn cmd_ingest(
    mut store: Store,
    config: &config::Config,
    args: &[String],
) -> anyhow::Result<()> {
    let image_path = args.first().context("ingest: missing <image>")?;
    let date = parse_date(args.get(1).context("ingest: missing <date>")?)?;
    let season = args.get(2).context("ingest: missing <season>")?.clone();
    let mut opponent = args.get(3).context("ingest: missing <opponent>")?.clone();
    let team_score: u32 = args
        .get(4)
        .context("ingest: missing <team-score>")?
        .parse()
        .context("ingest: <team-score> must be a number")?;
    let opponent_score: u32 = args
        .get(5)
        .context("ingest: missing <opp-score>")?
        .parse()
        .context("ingest: <opp-score> must be a number")?;

    let mut format = GameFormat::FourQuarters;
    let mut data_type = DataType::OurTeam;
    let mut i = 6;
    while i < args.len() {
        match args[i].as_str() {
            "--format" => {
                let code = args.get(i + 1).context("--format needs a value")?;
                if !config.formats.iter().any(|f| f == code) {
                    bail!("unknown game format: {code}");
                }
                format = GameFormat::parse(code);
                i += 2;
            }
            "--opponent-team" => {
                // The sheet is the named team's own box score.
                opponent = args.get(i + 1).context("--opponent-team needs a value")?.clone();
                data_type = DataType::OpponentTeam;
                i += 2;
            }
            other => bail!("ingest: unknown flag {other}"),
        }
    }

    let image = std::fs::read(image_path)
        .with_context(|| format!("failed to read image {image_path}"))?;

    let client = VisionClient::from_config(config);
    match &client {
        VisionClient::Active(_) => info!("vision client ready"),
        VisionClient::Disabled => warn!("no API key configured; extraction will fail"),
    }

    let meta = GameMeta {
        date,
        season,
        opponent,
        team_score,
        opponent_score,
        format,
        data_type,
    };

    let count = ingest::ingest_box_score(
        &client,
        &image,
        config.extraction.max_retries,
        &meta,
        &config.team.name,
        &config.seasons,
        &mut store,
    )
    .await
    .context("ingestion failed")?;

    println!("ingested {count} rows");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("dates are YYYY-MM-DD, got {raw}"))
}

/// Logs go to stderr so piped stdout stays clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scorebook=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))?;

    Ok(())
}
