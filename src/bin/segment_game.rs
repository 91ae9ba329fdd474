use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

use hoops_possessions::normalize::{GameHeader, normalize_live_feed_json, normalize_stats_feed_json};
use hoops_possessions::synthetic::{SyntheticConfig, synthetic_game};
use hoops_possessions::{BoxCounts, GameEvents, RuleSet, possessions_fingerprint, process_game};

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
enum Source {
    Stats,
    Live,
    Synthetic,
}

#[derive(Debug, serde::Deserialize)]
struct SegmentCase {
    game_id: String,
    home_team_id: u32,
    away_team_id: u32,
    source: Source,
    /// Feed file, relative to the case file.
    #[serde(default)]
    feed_file: Option<PathBuf>,
    #[serde(default)]
    home_box: Option<BoxCounts>,
    #[serde(default)]
    away_box: Option<BoxCounts>,
    #[serde(default)]
    seed: u64,
}

fn load_rules() -> anyhow::Result<RuleSet> {
    let base = match std::env::var("POSSESSION_RULES_PATH") {
        Ok(path) => {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            RuleSet::from_json_str(&raw)?
        }
        Err(_) => RuleSet::default(),
    };
    let rules = base.with_overrides(|key| std::env::var(key).ok());
    rules.validate()?;
    Ok(rules)
}

fn load_game(case: &SegmentCase, case_path: &Path) -> anyhow::Result<GameEvents> {
    let header = GameHeader {
        game_id: case.game_id.clone(),
        home_team_id: case.home_team_id,
        away_team_id: case.away_team_id,
    };
    let feed = || -> anyhow::Result<String> {
        let Some(file) = case.feed_file.as_ref() else {
            bail!("case {} needs a feed_file", case.game_id);
        };
        let path = case_path.parent().unwrap_or(Path::new(".")).join(file);
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    };

    match case.source {
        Source::Stats => normalize_stats_feed_json(&header, &feed()?),
        Source::Live => normalize_live_feed_json(&header, &feed()?),
        Source::Synthetic => {
            let (Some(home), Some(away)) = (case.home_box, case.away_box) else {
                bail!("synthetic case {} needs home_box and away_box", case.game_id);
            };
            let mut cfg = SyntheticConfig::new(home, away, case.seed);
            cfg.game_id = case.game_id.clone();
            cfg.home_team_id = case.home_team_id;
            cfg.away_team_id = case.away_team_id;
            synthetic_game(&cfg)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/segment_case.json"));
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let case: SegmentCase = serde_json::from_str(&raw)?;

    let rules = load_rules()?;
    let game = load_game(&case, &path)?;

    match process_game(&game, &rules) {
        Ok(segmented) => {
            println!("Game: {}", segmented.game_id);
            println!("Possessions: {}", segmented.possessions.len());
            println!(
                "Oliver: est {:.2} / actual {:.2} ({:.2}% delta)",
                segmented.report.oliver_estimate,
                segmented.report.actual_possessions,
                segmented.report.delta_percent
            );
            println!("Issues: {}", segmented.report.issues.len());
            println!("Fingerprint: {}", possessions_fingerprint(&segmented.possessions));
            for p in &segmented.possessions {
                println!(
                    "#{:<3} P{} off {} {:>6.1}s -> {:>5.1}s {:?} {} pts",
                    p.possession_number,
                    p.period,
                    p.offense_team_id,
                    p.start_clock,
                    p.end_clock,
                    p.result,
                    p.points_scored
                );
            }
            println!("{}", serde_json::to_string_pretty(&segmented.report)?);
        }
        Err(failure) => {
            eprintln!("{failure}");
            println!("{}", serde_json::to_string_pretty(&failure.stats)?);
            std::process::exit(1);
        }
    }

    Ok(())
}
