use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::info;

use gridpool_engine::{
    ClaimError, IdentityProvider, ReleaseError, ReservationEngine, resolve_short_code, stripes,
    track_access, winners_for_board,
};
use gridpool_store::SqliteStore;
use gridpool_types::{Board, BoardId, CellKey, Identity, UserId};

const USAGE: &str = "usage:
  gridpool show <board-id>
  gridpool claim <board-id> <row> <col>
  gridpool release <board-id> <row> <col>
  gridpool winners <board-id>
  gridpool resolve <short-code>

identity comes from GRIDPOOL_USER_ID / GRIDPOOL_EMAIL / GRIDPOOL_DISPLAY_NAME;
the board database lives at GRIDPOOL_DB_PATH (default ./gridpool.db)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridpool_engine=info,gridpool_store=info".into()),
        )
        .init();

    let db_path: PathBuf = std::env::var("GRIDPOOL_DB_PATH")
        .unwrap_or_else(|_| "gridpool.db".into())
        .into();
    let store = SqliteStore::open(&db_path)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("");

    match (command, args.len()) {
        ("show", 2) => show(&store, &BoardId::from(args[1].as_str())).await,
        ("claim", 4) => {
            let cell = parse_cell(&args[2], &args[3])?;
            claim(&store, &BoardId::from(args[1].as_str()), cell).await
        }
        ("release", 4) => {
            let cell = parse_cell(&args[2], &args[3])?;
            release(&store, &BoardId::from(args[1].as_str()), cell).await
        }
        ("winners", 2) => winners(&store, &BoardId::from(args[1].as_str())).await,
        ("resolve", 2) => resolve(&store, &args[1]).await,
        _ => bail!(USAGE),
    }
}

fn parse_cell(row: &str, col: &str) -> anyhow::Result<CellKey> {
    let row: u8 = row.parse().context("row must be a number 1-10")?;
    let col: u8 = col.parse().context("col must be a number 1-10")?;
    Ok(CellKey::new(row, col)?)
}

/// Env-backed identity source, the CLI's stand-in for a real auth
/// transport.
struct EnvIdentity;

impl IdentityProvider for EnvIdentity {
    fn current_identity(&self) -> Option<Identity> {
        let uid = std::env::var("GRIDPOOL_USER_ID").ok()?;
        Some(Identity {
            uid: UserId::from(uid),
            email: std::env::var("GRIDPOOL_EMAIL").ok(),
            display_name: std::env::var("GRIDPOOL_DISPLAY_NAME").ok(),
        })
    }
}

fn identity_from_env() -> anyhow::Result<Identity> {
    EnvIdentity
        .current_identity()
        .context("GRIDPOOL_USER_ID must be set to claim or release squares")
}

async fn load_board(store: &SqliteStore, board_id: &BoardId) -> anyhow::Result<Board> {
    let engine = ReservationEngine::new(store, board_id.clone());
    engine
        .load()
        .await?
        .with_context(|| format!("board {board_id} not found"))
}

async fn show(store: &SqliteStore, board_id: &BoardId) -> anyhow::Result<()> {
    let board = load_board(store, board_id).await?;
    let team_a = board.team_a.as_deref().unwrap_or("Team A");
    let team_b = board.team_b.as_deref().unwrap_or("Team B");
    let label = board.label.as_deref().unwrap_or(board_id.as_str());

    println!("{label}: {team_a} vs {team_b}");
    if board.locked {
        println!("selection is locked");
    }
    println!("{} squares reserved", board.reservations.len());
    for (cell, reservation) in &board.reservations {
        println!("  {cell}  {}  ({})", reservation.label, reservation.user_id);
    }
    Ok(())
}

async fn claim(store: &SqliteStore, board_id: &BoardId, cell: CellKey) -> anyhow::Result<()> {
    let identity = identity_from_env()?;
    let engine = ReservationEngine::new(store, board_id.clone());
    match engine.claim(cell, &identity).await {
        Ok(reservation) => {
            track_access(store, &identity.uid, board_id).await?;
            info!(cell = %cell, label = %reservation.label, "square reserved");
            println!("reserved {cell} as {}", reservation.label);
            Ok(())
        }
        // Contention outcomes are answers, not failures.
        Err(ClaimError::AlreadyReserved) => {
            println!("sorry, {cell} is already reserved");
            Ok(())
        }
        Err(ClaimError::BoardLocked) => {
            println!("this board is locked; no new squares can be reserved");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn release(store: &SqliteStore, board_id: &BoardId, cell: CellKey) -> anyhow::Result<()> {
    let identity = identity_from_env()?;
    let engine = ReservationEngine::new(store, board_id.clone());
    match engine.release(cell, &identity.uid).await {
        Ok(()) => {
            println!("released {cell}");
            Ok(())
        }
        Err(ReleaseError::NotReserved) => {
            println!("{cell} is not currently reserved");
            Ok(())
        }
        Err(ReleaseError::NotOwner) => {
            println!("only the original reserver can cancel {cell}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn winners(store: &SqliteStore, board_id: &BoardId) -> anyhow::Result<()> {
    let board = load_board(store, board_id).await?;
    let winners = winners_for_board(&board);
    if winners.is_empty() {
        println!("no winning squares yet");
        return Ok(());
    }
    for (cell, quarters) in &winners {
        let bands: Vec<String> = stripes(quarters)
            .iter()
            .map(|s| format!("{} {}", s.quarter, s.color))
            .collect();
        let owner = board
            .reservations
            .get(cell)
            .map(|r| r.label.as_str())
            .unwrap_or("(unclaimed)");
        println!("{cell}  {owner}  [{}]", bands.join(" | "));
    }
    Ok(())
}

async fn resolve(store: &SqliteStore, code: &str) -> anyhow::Result<()> {
    match resolve_short_code(store, code).await? {
        Some(board_id) => println!("{board_id}"),
        None => println!("short code {code:?} not found"),
    }
    Ok(())
}
