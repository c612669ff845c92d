//! Jog a single Dynamixel servo from the keyboard.
//!
//! `a` raises the goal position, `s` lowers it, `Esc` quits. After every key
//! the goal is written and the present position is polled until the servo
//! settles or the goal turns out to be out of range.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dynamixel_jog::{
    ControlTable, DynamixelDriver, JogController, JogSettings, KeySource, TerminalKeys,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset, so status messages always show.
const DEFAULT_LOG_FILTER: &str = "info";

#[cfg(windows)]
const DEFAULT_PORT: &str = "COM1";
#[cfg(not(windows))]
const DEFAULT_PORT: &str = "/dev/ttyUSB0";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Table {
    /// MX series on Protocol 1.0 (torque 24, goal 30, present 36)
    Mx,
    /// X series (torque 64, goal 116, present 132)
    XSeries,
}

impl From<Table> for ControlTable {
    fn from(table: Table) -> Self {
        match table {
            Table::Mx => ControlTable::MX_PROTOCOL_1,
            Table::XSeries => ControlTable::X_SERIES,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dynamixel_jog")]
#[command(about = "Move a Dynamixel servo with the a/s keys")]
#[command(version)]
struct Args {
    /// Serial port to use
    #[arg(long, default_value = DEFAULT_PORT)]
    port: String,

    #[arg(long, default_value_t = 1_000_000)]
    baud_rate: u32,

    /// Servo id
    #[arg(long, default_value_t = 1)]
    id: u8,

    /// Control table layout of the servo model
    #[arg(long, value_enum, default_value_t = Table::Mx)]
    table: Table,

    /// Goal change per key press
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(i32).range(1..))]
    step: i32,

    /// Distance from the goal at which the servo counts as settled
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i32).range(0..))]
    threshold: i32,

    /// First goal position, the one adjusted by default
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    min_goal: i32,

    /// Second goal position, used with --alternate-goals
    #[arg(long, default_value_t = 4000, allow_negative_numbers = true)]
    max_goal: i32,

    /// Switch between the two goals after every move
    #[arg(long)]
    alternate_goals: bool,
}

impl Args {
    fn settings(&self) -> JogSettings {
        JogSettings {
            id: self.id,
            table: self.table.into(),
            goals: [self.min_goal, self.max_goal],
            step: self.step,
            threshold: self.threshold,
            alternate_goals: self.alternate_goals,
        }
    }
}

fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn wait_for_key(keys: &mut TerminalKeys) {
    println!("Press any key to terminate...");
    if let Err(err) = keys.next_key().await {
        error!("failed to read keyboard: {}", err);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let args = Args::parse();
    let mut keys = TerminalKeys::new();

    let mut driver = match DynamixelDriver::new(&args.port) {
        Ok(driver) => {
            info!("Succeeded to open the port");
            driver
        }
        Err(err) => {
            error!("Failed to open the port: {}", err);
            wait_for_key(&mut keys).await;
            return Err(err).with_context(|| format!("failed to open {}", args.port));
        }
    };

    match driver.set_baud_rate(args.baud_rate) {
        Ok(()) => info!("Succeeded to change the baudrate"),
        Err(err) => {
            error!("Failed to change the baudrate: {}", err);
            wait_for_key(&mut keys).await;
            return Err(err)
                .with_context(|| format!("failed to set baud rate {}", args.baud_rate));
        }
    }

    let mut controller = JogController::new(driver, args.settings());
    let result = controller.run(&mut keys).await;
    controller.into_driver().close();
    result.context("failed to read keyboard")
}
