//! Interactive shell for the facility booking client.
//!
//! Reads one command per line from stdin. Server address and transport
//! settings come from the `BOOKING_*` environment variables; log output goes
//! to stderr and is filtered by `BOOKING_LOG` (or `RUST_LOG`).

mod command;
mod render;

use std::time::Duration;

use facility_booking_client::client::{
    BookingClient, ClientConfig, ClientError, PushedUpdate, Session,
};
use facility_booking_client::core::constants::UPDATE_CHANNEL_CAPACITY;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use command::{Command, HELP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = std::env::var("BOOKING_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    info!(server = %config.server_addr, "booking shell starting");
    let mut session = Session::new(BookingClient::new(config));
    debug!(first_request_id = session.next_request_id(), "session ready");

    println!("Facility Booking Client ({})", session.client().server_addr());
    println!("Type 'help' for available commands\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("Error: {e}\n");
                continue;
            }
        };
        if command == Command::Quit {
            println!("Exiting...");
            break;
        }
        if let Err(e) = run(&mut session, command).await {
            println!("Error: {e}");
        }
        println!();
    }

    Ok(())
}

async fn run(session: &mut Session, command: Command) -> Result<(), ClientError> {
    let reply = match command {
        Command::Help => {
            println!("{HELP}");
            return Ok(());
        }
        Command::Quit => return Ok(()),
        Command::Query { facility, days } => {
            println!("Querying availability for '{facility}'...");
            session.query_availability(&facility, &days).await?
        }
        Command::Book {
            facility,
            day,
            start,
            end,
        } => {
            println!(
                "Booking {facility} on {day} from {} to {}...",
                render::clock(start),
                render::clock(end)
            );
            session.create_booking(&facility, day, start, end).await?
        }
        Command::Modify { booking_id, offset } => {
            println!("Modifying booking {booking_id} by {offset} minutes...");
            session.modify_booking(booking_id, offset).await?
        }
        Command::Extend {
            booking_id,
            minutes,
        } => {
            println!("Extending booking {booking_id} by {minutes} minutes...");
            session.extend_booking(booking_id, minutes).await?
        }
        Command::Capacity { facility } => {
            println!("Querying capacity for {facility}...");
            session.query_capacity(&facility).await?
        }
        Command::List => {
            println!("Listing all facilities...");
            session.list_facilities().await?
        }
        Command::Watch { facility, duration } => {
            return watch(session, &facility, duration).await;
        }
    };

    println!("{}", render::reply(&reply));
    Ok(())
}

async fn watch(
    session: &mut Session,
    facility: &str,
    duration: Option<Duration>,
) -> Result<(), ClientError> {
    let shown = duration.unwrap_or(session.client().config().watch_duration);
    println!("Monitoring {facility} for {} minutes...", shown.as_secs() / 60);

    let (tx, mut rx) = mpsc::channel::<PushedUpdate>(UPDATE_CHANNEL_CAPACITY);
    let watching = session.watch_facility(facility, duration, tx);
    tokio::pin!(watching);

    let result = loop {
        tokio::select! {
            result = &mut watching => break result,
            Some(update) = rx.recv() => print_update(&update),
        }
    };
    // Readers may still hold senders until the server hangs up, so only
    // drain what is already queued
    while let Ok(update) = rx.try_recv() {
        print_update(&update);
    }

    let summary = result?;
    println!(
        "Watch ended: {} update(s) over {} push connection(s) on port {}",
        summary.updates, summary.connections, summary.callback_port
    );
    Ok(())
}

fn print_update(update: &PushedUpdate) {
    println!(
        "update #{} from {}:\n{}",
        update.connection,
        update.peer,
        render::reply(&update.reply)
    );
}
