use clap::{Parser, Subcommand};
use fortuna::config;
use fortuna::events::ControlCommand;
use fortuna::sys::server::SOCKET_PATH;
use fortuna::wheel::{OutcomeGenerator, ResetScope};
use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;

#[derive(Parser, Debug)]
#[command(name = "spinctl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Spin the wheel.
    Spin {
        /// Land on this slot instead of drawing one
        #[arg(short, long)]
        slot: Option<usize>,
    },
    /// Stop the running spin where it is
    Cancel,
    /// Print the running statistics
    Stats,
    /// Zero the statistics
    Reset {
        /// Also forget recent results used for repeat suppression
        #[arg(short, long)]
        all: bool,
    },
    /// Stop the daemon
    Shutdown,
    /// Draw outcomes offline with the configured wheel and print the tally
    Simulate {
        #[arg(short = 'n', long, default_value_t = 1000)]
        spins: u64,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Spin { slot } => ControlCommand::Spin(slot),
        Commands::Cancel => ControlCommand::Cancel,
        Commands::Stats => ControlCommand::Stats,
        Commands::Reset { all } => ControlCommand::Reset(if all {
            ResetScope::All
        } else {
            ResetScope::Counters
        }),
        Commands::Shutdown => ControlCommand::Shutdown,
        Commands::Simulate { spins, seed } => return simulate(spins, seed),
    };

    let reply = send_command(&command.to_string())?;
    print!("{}", reply);
    if reply.starts_with("error:") {
        anyhow::bail!("fortuna refused '{}'", command);
    }
    Ok(())
}

fn simulate(spins: u64, seed: Option<u64>) -> anyhow::Result<()> {
    let config = config::load_or_default();
    let layout = config.layout()?;
    let prizes = config.prize_table()?;
    let mut generator = match seed {
        Some(seed) => OutcomeGenerator::seeded(layout, prizes, seed),
        None => OutcomeGenerator::new(layout, prizes),
    };

    let options = config.spin.options();
    for _ in 0..spins {
        generator.generate(&options)?;
    }

    print!("{}", generator.statistics());
    Ok(())
}

fn send_command(cmd: &str) -> anyhow::Result<String> {
    log::debug!("Sending '{}' to {}", cmd, SOCKET_PATH);
    let mut stream = UnixStream::connect(SOCKET_PATH).map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to fortuna daemon at {}: {}. Is fortuna running?",
            SOCKET_PATH,
            e
        )
    })?;

    writeln!(stream, "{}", cmd)?;
    stream.shutdown(Shutdown::Write)?;

    let mut reply = String::new();
    stream.read_to_string(&mut reply)?;
    Ok(reply)
}
