//! Pi Peripherals binary
//!
//! Brings up the LED, touch sensor and LED matrix and serves the web UI.

use clap::{Args, Parser, Subcommand};
use pi_peripherals::{
    default_context, start_web_server, DigitalState, HardwareContext, MatrixDirection,
    MatrixSymbol, MockContext, PeripheralConfig, PeripheralService, WebConfig, DEFAULT_WEB_PORT,
};
use pi_peripherals::service::config::{
    DEFAULT_LED_PIN, DEFAULT_MATRIX_BRIGHTNESS, DEFAULT_TOUCH_DEBOUNCE_US, DEFAULT_TOUCH_PIN,
};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pi_peripherals")]
#[command(about = "Raspberry Pi LED, touch sensor and LED matrix service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Initializes the board peripherals and exposes them through a web UI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Use the simulated board even when built with GPIO support
    #[arg(long)]
    mock: bool,

    /// BCM pin of the LED
    #[arg(long, default_value_t = DEFAULT_LED_PIN)]
    led_pin: u8,

    /// BCM pin of the touch sensor
    #[arg(long, default_value_t = DEFAULT_TOUCH_PIN)]
    touch_pin: u8,

    /// Touch sensor debounce in microseconds
    #[arg(long, default_value_t = DEFAULT_TOUCH_DEBOUNCE_US)]
    debounce_us: u64,

    /// LED matrix brightness (0-15)
    #[arg(long, default_value_t = DEFAULT_MATRIX_BRIGHTNESS)]
    brightness: u8,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve(ServeArgs),

    /// Show the hardware context and peripheral status
    Info,

    /// Log touch events and cycle the matrix until interrupted
    Watch(WatchArgs),
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Static files directory (optional)
    #[arg(long)]
    static_dir: Option<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

#[derive(Args)]
struct WatchArgs {
    /// Symbol shown while watching
    #[arg(long, default_value = "SMILEY")]
    symbol: MatrixSymbol,

    /// Rotate the matrix one quarter turn on every touch
    #[arg(long)]
    rotate_on_touch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let service = Arc::new(build_service(&cli));

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args, service).await?,
        Some(Commands::Info) => info_command(&service),
        Some(Commands::Watch(args)) => watch_command(args, service).await?,
        None => serve_command(&cli, &ServeArgs::default(), service).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn peripheral_config(cli: &Cli) -> PeripheralConfig {
    PeripheralConfig::default()
        .with_led_pin(cli.led_pin)
        .with_touch_pin(cli.touch_pin)
        .with_touch_debounce_us(cli.debounce_us)
        .with_matrix_brightness(cli.brightness)
}

fn build_service(cli: &Cli) -> PeripheralService {
    let context: pi_peripherals::Result<Arc<dyn HardwareContext>> = if cli.mock {
        info!("Using the simulated board");
        Ok(Arc::new(MockContext::new()))
    } else {
        default_context()
    };

    match context {
        Ok(context) => PeripheralService::new(context, peripheral_config(cli)),
        Err(e) => {
            error!("Failed to create the hardware context: {}", e);
            PeripheralService::without_context()
        }
    }
}

async fn serve_command(
    cli: &Cli,
    args: &ServeArgs,
    service: Arc<PeripheralService>,
) -> anyhow::Result<()> {
    let mut web_config = WebConfig::new(&cli.host, cli.port).with_cors(!args.no_cors);

    if let Some(static_dir) = &args.static_dir {
        web_config = web_config.with_static_path(Some(static_dir.clone()));
        info!("Using static files from: {}", static_dir);
    }

    let status = service.status();
    info!("Peripheral status:");
    info!("  - LED: {}", availability(status.led_available));
    info!("  - Touch sensor: {}", availability(status.touch_available));
    info!("  - LED matrix: {}", availability(status.matrix_available));
    info!("  - Bind address: {}", web_config.bind_address());

    start_web_server(web_config, service).await?;

    Ok(())
}

fn info_command(service: &PeripheralService) {
    println!("Pi Peripherals");
    println!("==============");
    println!();

    let info = service.hardware_info();
    println!("Hardware:");
    println!("  Default platform: {}", info.default_platform);
    println!("  Platforms: {}", info.loaded_platforms);
    println!("  Providers: {}", info.providers);
    println!("  Registry: {}", info.registry);
    println!();

    let status = service.status();
    println!("Peripherals:");
    println!(
        "  LED: {} ({})",
        availability(status.led_available),
        status.led_state
    );
    println!(
        "  Touch sensor: {} ({})",
        availability(status.touch_available),
        status.touch_state
    );
    println!(
        "  LED matrix: {} ({} facing {})",
        availability(status.matrix_available),
        status.matrix.symbol,
        status.matrix.direction
    );

    for (name, reason) in [
        ("LED", service.led().reason()),
        ("Touch sensor", service.touch().reason()),
        ("LED matrix", service.led_matrix().reason()),
    ] {
        if let Some(reason) = reason {
            println!("  {} error: {}", name, reason);
        }
    }
}

async fn watch_command(args: &WatchArgs, service: Arc<PeripheralService>) -> anyhow::Result<()> {
    service.led_matrix_print(args.symbol);

    let rotate_on_touch = args.rotate_on_touch;
    let target = Arc::downgrade(&service);
    service.add_button_listener(move |state: DigitalState| {
        println!("Touch: {}", state);
        let Some(service) = target.upgrade() else {
            return;
        };
        service.set_led_state(state.is_low());
        if rotate_on_touch && state.is_low() {
            service.led_matrix_rotate(next_direction(service.current_direction()));
        }
    });
    service.add_matrix_listener(|symbol: MatrixSymbol, direction: MatrixDirection| {
        println!("Matrix: {} facing {}", symbol, direction);
    });

    println!("Watching the touch sensor, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    service.led_matrix_clear();
    service.set_led_state(false);

    Ok(())
}

fn next_direction(direction: MatrixDirection) -> MatrixDirection {
    match direction {
        MatrixDirection::Up => MatrixDirection::Right,
        MatrixDirection::Right => MatrixDirection::Down,
        MatrixDirection::Down => MatrixDirection::Left,
        MatrixDirection::Left => MatrixDirection::Up,
    }
}

fn availability(ready: bool) -> &'static str {
    if ready {
        "ready"
    } else {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["pi_peripherals", "--port", "9090", "--mock"]).unwrap();
        assert_eq!(cli.port, 9090);
        assert!(cli.mock);
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["pi_peripherals"]).unwrap();
        assert_eq!(cli.port, DEFAULT_WEB_PORT);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(peripheral_config(&cli), PeripheralConfig::default());
    }

    #[test]
    fn test_watch_symbol_parsing() {
        let cli = Cli::try_parse_from(["pi_peripherals", "watch", "--symbol", "heart"]).unwrap();
        match cli.command {
            Some(Commands::Watch(args)) => assert_eq!(args.symbol, MatrixSymbol::Heart),
            _ => panic!("expected the watch command"),
        }
        assert!(Cli::try_parse_from(["pi_peripherals", "watch", "--symbol", "banana"]).is_err());
    }

    #[test]
    fn test_next_direction_cycles() {
        let mut direction = MatrixDirection::Up;
        for _ in 0..4 {
            direction = next_direction(direction);
        }
        assert_eq!(direction, MatrixDirection::Up);
    }

    #[test]
    fn test_mock_service() {
        let cli = Cli::try_parse_from(["pi_peripherals", "--mock"]).unwrap();
        let service = build_service(&cli);
        assert!(service.status().led_available);
        assert_eq!(service.default_platform(), "Mock Platform");
    }
}
