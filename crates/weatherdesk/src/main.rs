use anyhow::{anyhow, Context};
use clap::CommandFactory;
use slog::{debug, error, info, Logger};
use std::{sync::Arc, time::Duration};
use time::format_description::well_known::Rfc3339;
use tokio::time::interval;
use weatherdesk::{
    get_config_info, setup_logger, AlertDispatcher, Cli, Command, CommandNotifier,
    CurrentSnapshot, HistoryRecord, HistoryStore, LocationsCommand, NotificationSink,
    Observation, OpenWeatherClient, Session, StatusIndicator, TerminalNotifier,
};
use weatherdesk_core::DEFAULT_FORECAST_DAYS;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let (cli, config_source) = get_config_info();
    let logger = setup_logger(&cli);

    debug!(logger, "config: {}", config_source);
    debug!(logger, "data dir: {}", cli.data_dir().display());

    let store = HistoryStore::new(logger.clone(), cli.data_dir());
    store
        .init()
        .context("failed to initialize history storage")?;

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Current { city } => {
            let mut session = build_session(&cli, &logger, store)?;
            match session.refresh(&city).await? {
                Some(snapshot) => print_snapshot(&snapshot),
                None => println!("No weather data available for {}", city),
            }
        }
        Command::Forecast { city, days } => {
            let session = build_session(&cli, &logger, store)?;
            let days = days.unwrap_or(DEFAULT_FORECAST_DAYS);
            match session.daily_forecast(&city, days).await {
                Some(daily) => {
                    println!("{}-day forecast for {}", days, city);
                    for observation in &daily {
                        print_forecast_day(observation);
                    }
                }
                None => println!("No forecast available for {}", city),
            }
        }
        Command::Air { city } => {
            let session = build_session(&cli, &logger, store)?;
            match session.air_quality(&city).await {
                Some(air) => {
                    println!("Air quality in {}: {}", city, air);
                    for (name, value) in &air.components {
                        println!("  {:<6} {:>8.2} μg/m3", name, value);
                    }
                }
                None => println!("No air quality data available for {}", city),
            }
        }
        Command::Watch { city } => {
            let session = build_session(&cli, &logger, store)?;
            watch(session, &city, cli.refresh_interval(), &logger).await;
        }
        Command::History { city, days } => {
            let records = store.query(city.as_deref(), days.unwrap_or(cli.window_days()))?;
            if records.is_empty() {
                println!("No weather history recorded");
            }
            for record in &records {
                print_record(record)?;
            }
        }
        Command::Trend { city, days } => {
            let summaries = store.daily_summary(city.as_deref(), days.unwrap_or(cli.window_days()))?;
            if summaries.is_empty() {
                println!("No weather history recorded");
            }
            for day in &summaries {
                println!(
                    "{}  {:>3} obs  low {:>6.1}°C  high {:>6.1}°C  mean {:>6.1}°C  wind max {:>5.1} m/s",
                    day.date,
                    day.observations,
                    day.temp_low,
                    day.temp_high,
                    day.temp_mean,
                    day.max_wind_speed
                );
            }
        }
        Command::Export { format } => {
            let path = store.export(format)?;
            println!("History exported to {}", path.display());
        }
        Command::Backup => {
            let path = store.backup()?;
            println!("Backup created at {}", path.display());
        }
        Command::Prune { days } => {
            let days = days.unwrap_or(cli.window_days());
            let kept = store
                .prune(days)
                .with_context(|| format!("failed to prune history to {} days", days))?;
            println!("Kept {} records from the last {} days", kept, days);
        }
        Command::Locations { action } => match action {
            LocationsCommand::List => {
                let locations = store.list_locations()?;
                if locations.is_empty() {
                    println!("No saved locations");
                }
                for location in locations {
                    println!("{}", location);
                }
            }
            LocationsCommand::Save { city } => {
                if store.save_location(&city)? {
                    println!("Saved {}", city);
                } else {
                    println!("{} is already saved", city);
                }
            }
        },
    }
    Ok(())
}

fn build_session(cli: &Cli, logger: &Logger, store: HistoryStore) -> Result<Session, anyhow::Error> {
    let api_key = cli
        .api_key()
        .ok_or_else(|| anyhow!("an API key is required: pass --api-key or set WEATHERDESK_API_KEY"))?;
    let provider = OpenWeatherClient::new(logger.clone(), &cli.base_url(), api_key)?;

    let notifier: Box<dyn NotificationSink> = match cli.notify_command() {
        Some(program) => Box::new(CommandNotifier::new(program)),
        None => Box::new(TerminalNotifier),
    };
    let dispatcher = AlertDispatcher::new(
        logger.clone(),
        Box::new(StatusIndicator::new(logger.clone())),
        notifier,
    );

    Ok(Session::new(
        logger.clone(),
        Arc::new(provider),
        store,
        dispatcher,
        cli.units(),
    ))
}

async fn watch(mut session: Session, city: &str, refresh_interval: u64, logger: &Logger) {
    info!(
        logger,
        "Watching {}: refreshing every {} seconds", city, refresh_interval
    );

    let mut refresh = interval(Duration::from_secs(refresh_interval));
    loop {
        tokio::select! {
            _ = refresh.tick() => {
                match session.refresh(city).await {
                    Ok(Some(snapshot)) => print_snapshot(&snapshot),
                    Ok(None) => info!(logger, "No data for {}, waiting {} seconds for next run", city, refresh_interval),
                    Err(err) => error!(logger, "Error refreshing {}: {:#}", city, err),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(logger, "Stopping watch");
                break;
            }
        }
    }
}

fn condition_text(observation: &Observation) -> String {
    observation
        .description
        .clone()
        .or_else(|| observation.conditions.first().cloned())
        .unwrap_or_default()
}

fn print_snapshot(snapshot: &CurrentSnapshot) {
    let observation = &snapshot.observation;
    println!("{}: {}, {}", observation.city, observation.temperature, condition_text(observation));
    println!("  wind       {:.1} m/s", observation.wind_speed);
    if let Some(humidity) = observation.humidity {
        println!("  humidity   {}%", humidity);
    }
    if let Some(pressure) = observation.pressure {
        println!("  pressure   {} hPa", pressure);
    }
    println!("  visibility {:.1} km", observation.visibility_km());
    println!();
    println!("{}", snapshot.alerts.summary());
}

fn print_forecast_day(observation: &Observation) {
    let when = observation
        .observed_at
        .map(|at| at.date().to_string())
        .unwrap_or_else(|| String::from("-"));
    println!(
        "  {}  {:>8}  {:<20} wind {:.1} m/s",
        when,
        observation.temperature.to_string(),
        condition_text(observation),
        observation.wind_speed
    );
}

fn print_record(record: &HistoryRecord) -> Result<(), anyhow::Error> {
    println!(
        "{}  {:<16} {:>6.1}°C  {:<14} wind {:>5.1} m/s  visibility {:>5.1} km",
        record.timestamp.format(&Rfc3339)?,
        record.city,
        record.temp,
        record.conditions,
        record.wind_speed,
        record.visibility_km
    );
    Ok(())
}
