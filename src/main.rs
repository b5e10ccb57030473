use clap::{Parser, Subcommand};
use comfy_table::Table;
use core_types::{format_datetime, NewFlight};
use database::Services;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// The main entry point for the Skyfare flight-management tool.
///
/// This binary is only a composition root: it constructs the service set,
/// opens the connection, runs a single command and tears the connection down.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let services = Services::from_env()?;
    services.connection.connect().await?;
    let outcome = run(cli.command, &services).await;
    services.connection.disconnect().await;
    outcome
}

/// A data-access and authentication layer for a flight catalog.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the whole flight catalog, most recent departure first.
    List,
    /// Show a single flight.
    Show { flight_id: String },
    /// Add a flight to the catalog.
    Add(AddArgs),
    /// Change the price of a flight.
    SetPrice { flight_id: String, price: Decimal },
    /// Change the remaining-seat count of a flight.
    SetSeats { flight_id: String, remaining: i64 },
    /// Remove a flight from the catalog.
    Remove { flight_id: String },
    /// Register a new end-user account.
    Register {
        email: String,
        username: String,
        password: String,
    },
}

#[derive(Parser)]
struct AddArgs {
    #[arg(long)]
    flight_id: String,

    #[arg(long)]
    departure: String,

    #[arg(long)]
    destination: String,

    /// Departure time (format: "YYYY-MM-DD HH:MM:SS").
    #[arg(long)]
    depart_time: String,

    /// Arrival time (format: "YYYY-MM-DD HH:MM:SS").
    #[arg(long)]
    arrive_time: String,

    #[arg(long)]
    price: Decimal,

    #[arg(long)]
    total_seats: i64,

    /// Defaults to a fully available flight.
    #[arg(long)]
    remain_seats: Option<i64>,
}

async fn run(command: Commands, services: &Services) -> anyhow::Result<()> {
    match command {
        Commands::List => {
            let flights = services.flights.query_all().await?;
            let mut table = Table::new();
            table.set_header([
                "Flight", "From", "To", "Departs", "Arrives", "Price", "Seats",
            ]);
            for flight in &flights {
                table.add_row([
                    flight.flight_id.clone(),
                    flight.departure.clone(),
                    flight.destination.clone(),
                    format_datetime(flight.depart_time),
                    format_datetime(flight.arrive_time),
                    flight.price.to_string(),
                    format!("{}/{}", flight.remain_seats, flight.total_seats),
                ]);
            }
            println!("{table}");
            println!("{} flight(s)", flights.len());
        }
        Commands::Show { flight_id } => {
            let flight = services.flights.query_by_id(&flight_id).await?;
            println!(
                "{} {} -> {} departs {} arrives {} price {} seats {}/{}",
                flight.flight_id,
                flight.departure,
                flight.destination,
                format_datetime(flight.depart_time),
                format_datetime(flight.arrive_time),
                flight.price,
                flight.remain_seats,
                flight.total_seats,
            );
        }
        Commands::Add(args) => {
            let flight = services
                .flights
                .add(&NewFlight {
                    flight_id: args.flight_id,
                    departure: args.departure,
                    destination: args.destination,
                    depart_time: args.depart_time,
                    arrive_time: args.arrive_time,
                    price: args.price,
                    total_seats: args.total_seats,
                    remain_seats: args.remain_seats.unwrap_or(args.total_seats),
                })
                .await?;
            println!("Added flight {}", flight.flight_id);
        }
        Commands::SetPrice { flight_id, price } => {
            services.flights.update_price(&flight_id, price).await?;
            println!("Updated price of {flight_id} to {price}");
        }
        Commands::SetSeats {
            flight_id,
            remaining,
        } => {
            services.flights.update_seats(&flight_id, remaining).await?;
            println!("Updated remaining seats of {flight_id} to {remaining}");
        }
        Commands::Remove { flight_id } => {
            services.flights.delete(&flight_id).await?;
            println!("Removed flight {flight_id}");
        }
        Commands::Register {
            email,
            username,
            password,
        } => {
            let id = services
                .users
                .register(&email, &username, &password, &password)
                .await?;
            println!("Registered {username} (account #{id})");
        }
    }
    Ok(())
}
