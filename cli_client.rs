use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::{Color, Colorize};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use landgrab_protocol::{
    BuyOrder, BuyStock, CompanyId, GameStatus, RoomSnapshot, SellStock, SellTerms, Tile,
};
use landgrab_client::{
    decode, views, ActionClient, PlacementFlow, PlacementOutcome, RoomChannel,
};

/// Terminal client for a landgrab room.
#[derive(Parser)]
#[command(name = "landgrab-cli")]
struct Args {
    /// Base URL of the room service
    #[arg(long, default_value = "http://127.0.0.1:9001")]
    server: Url,
    /// Room to watch; created from --config when omitted
    #[arg(long)]
    room: Option<String>,
    /// Player name
    #[arg(long)]
    player: String,
    /// Game-config document, posted verbatim when creating a room
    #[arg(long)]
    config: Option<PathBuf>,
    /// Join the room as a player before watching it
    #[arg(long)]
    join: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    colog::init();
    let args = Args::parse();
    let actions = ActionClient::new(args.server.clone());

    let room_id = match (&args.room, &args.config) {
        (Some(room), _) => room.clone(),
        (None, Some(path)) => {
            let config = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let created = actions.create_room(config).await?;
            println!("🏠 created room {}", created.room_id);
            created.room_id
        }
        (None, None) => bail!("pass --room to watch a room, or --config to create one"),
    };

    if args.join {
        actions.join(&room_id, &args.player).await?;
        println!("🚪 joined room {room_id} as {}", args.player);
    }

    let channel = RoomChannel::open(&args.server, &room_id, &args.player)
        .await
        .context("opening the room stream")?;
    let mut updates = channel.subscribe();
    let mut flow = PlacementFlow::new(actions.clone(), &room_id, &args.player);

    println!("📋 commands: join | start | place <tile> | pick <company> | drop | cancel");
    println!("            buy [id=n ...] | sell [id=n ...] | end | state | quit");
    println!("⏳ waiting for the first snapshot…");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(Ok(snapshot)) => {
                        render(&snapshot, &args.player);
                        react(&snapshot, &actions, &mut flow, &room_id, &args.player).await;
                    }
                    Some(Err(err)) => log::warn!("room stream: {err}"),
                    None => {
                        println!("🔌 room stream closed");
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match run_command(line.trim(), &channel, &actions, &mut flow, &room_id, &args.player).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => println!("{} {err:#}", "❌".red()),
                }
            }
        }
    }

    channel.close();
    println!("👋 goodbye");
    Ok(())
}

/// Turn-keeping the snapshot asks of the local player without a prompt:
/// skip an empty-hand placement turn, pass an empty buying turn.
async fn react(
    snapshot: &RoomSnapshot,
    actions: &ActionClient,
    flow: &mut PlacementFlow,
    room_id: &str,
    player: &str,
) {
    match flow.auto_skip(snapshot).await {
        Ok(true) => println!("⏭️  empty hand, placement skipped"),
        Ok(false) => {}
        Err(err) => log::warn!("auto skip: {err}"),
    }
    if views::is_local_buy_turn(snapshot, player) && views::founded_companies(snapshot).is_empty()
    {
        println!("⏭️  nothing to buy, passing");
        let pass = BuyStock {
            player: player.to_string(),
            buy: Vec::new(),
        };
        if let Err(err) = actions.buy_stock(room_id, &pass).await {
            log::warn!("auto pass: {err}");
        }
    }
}

async fn run_command(
    line: &str,
    channel: &RoomChannel,
    actions: &ActionClient,
    flow: &mut PlacementFlow,
    room_id: &str,
    player: &str,
) -> Result<bool> {
    let mut words = line.split_whitespace();
    match words.next().unwrap_or("") {
        "" => {}
        "quit" => return Ok(false),
        "join" => actions.join(room_id, player).await?,
        "start" => actions.start_game(room_id).await?,
        "state" => render(&channel.current_snapshot()?, player),
        "place" => {
            let tile: Tile = words
                .next()
                .context("usage: place <tile>")?
                .parse()
                .context("not a tile label")?;
            let snapshot = channel.current_snapshot()?;
            flow.choose_tile(&snapshot, tile)?;
            report(flow.place(&snapshot).await?, &snapshot);
        }
        "pick" => {
            let company: CompanyId = words
                .next()
                .context("usage: pick <company>")?
                .parse()
                .context("not a company id")?;
            flow.choose_company(company)?;
            let snapshot = channel.current_snapshot()?;
            report(flow.place(&snapshot).await?, &snapshot);
        }
        "drop" => {
            flow.drop_tile().await?;
            println!("🗑️  tile dropped");
        }
        "cancel" => flow.cancel(),
        "buy" => {
            let buy = BuyStock {
                player: player.to_string(),
                buy: amounts(words)?
                    .into_iter()
                    .map(|(company, amount)| BuyOrder { company, amount })
                    .collect(),
            };
            actions.buy_stock(room_id, &buy).await?;
        }
        "sell" => {
            let sell = SellStock {
                player: player.to_string(),
                sell: SellTerms {
                    for_money: amounts(words)?,
                    for_other_stocks: BTreeMap::new(),
                },
            };
            actions.sell_stock(room_id, &sell).await?;
        }
        "end" => actions.end_game(room_id, player).await?,
        other => println!("❓ unknown command: {other}"),
    }
    Ok(true)
}

/// Parses `5=2 9=1` pairs into a company→amount map.
fn amounts<'a>(words: impl Iterator<Item = &'a str>) -> Result<BTreeMap<CompanyId, u32>> {
    let mut parsed = BTreeMap::new();
    for word in words {
        let (company, amount) = word
            .split_once('=')
            .with_context(|| format!("expected <company>=<amount>, got {word:?}"))?;
        parsed.insert(
            company.parse().context("not a company id")?,
            amount.parse().context("not an amount")?,
        );
    }
    Ok(parsed)
}

fn report(outcome: PlacementOutcome, snapshot: &RoomSnapshot) {
    match outcome {
        PlacementOutcome::Resolved => println!("✅ placed"),
        PlacementOutcome::NeedsCompany { kind, candidates } => {
            use landgrab_client::DisambiguationKind;
            let question = match kind {
                DisambiguationKind::Create => "which company should be founded?",
                DisambiguationKind::Merge => "which company survives the merger?",
            };
            println!("🏢 {question} (pick <company>)");
            for company in candidates {
                let name = snapshot
                    .companies
                    .get(&company)
                    .map_or("?", |c| c.name.as_str());
                println!("   {company}: {name}");
            }
        }
    }
}

fn render(snapshot: &RoomSnapshot, me: &str) {
    println!();
    println!(
        "🏠 {}  status: {}",
        snapshot.room_id,
        snapshot.status.to_string().bold()
    );

    match decode(&snapshot.board) {
        Ok(board) => {
            for row in 0..board.rows {
                let mut line = String::new();
                for col in 0..board.cols {
                    let occupant = board.matrix[row][col];
                    let color = snapshot
                        .companies
                        .get(&occupant)
                        .and_then(|c| c.color.as_deref());
                    let (bg, fg) = views::company_palette(occupant, color);
                    let label = format!("{:>4}", Tile::from_grid(row, col).to_string());
                    line.push_str(&format!("{}", label.color(tint(fg)).on_color(tint(bg))));
                }
                println!("{line}");
            }
        }
        Err(err) => {
            if snapshot.status != GameStatus::Initializing {
                log::warn!("board: {err}");
            }
        }
    }

    for company in views::founded_companies(snapshot) {
        if let Some(info) = snapshot.companies.get(&company) {
            let quote = views::cliff_quote(info.cliff);
            println!(
                "🏢 {company}: {} tier {} ${} bonuses {:?}",
                info.name, info.cliff, quote.price, quote.bonuses
            );
        }
    }

    let actor = views::current_actor(snapshot).cloned();
    for player in views::rotate_to_local(&snapshot.players, me) {
        let mut tags = String::new();
        if player.id == me {
            tags.push_str(" [you]");
        }
        if Some(&player.id) == actor.as_ref() {
            tags.push_str(" [to act]");
        }
        let stocks: Vec<String> = player
            .stocks
            .iter()
            .map(|(company, held)| format!("{company}×{held}"))
            .collect();
        println!(
            "👤 {}{}  ${}  tiles: {}  stocks: {}",
            player.id.bold(),
            tags,
            player.balance,
            player
                .cards
                .iter()
                .map(Tile::to_string)
                .collect::<Vec<_>>()
                .join(" "),
            stocks.join(" ")
        );
    }

    if snapshot.status == GameStatus::Distributing {
        println!(
            "📤 selling queue: {}  absorbed: {:?}",
            snapshot.distributing.join(" → "),
            snapshot.acquired_companies
        );
        if snapshot.distributing.first().map(String::as_str) == Some(me) {
            println!("   your move: sell [id=n ...]");
        }
    }
}

fn tint(name: &str) -> Color {
    match name {
        "red" => Color::Red,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "purple" => Color::Magenta,
        "cyan" => Color::Cyan,
        "orange" => Color::TrueColor {
            r: 0xff,
            g: 0xa5,
            b: 0x00,
        },
        "dark" => Color::BrightBlack,
        "black" => Color::Black,
        _ => Color::White,
    }
}
