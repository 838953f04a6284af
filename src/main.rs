use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ebyte_rs::{init_logger, DeviceConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ebyte-cli")]
#[command(about = "CLI tool for EByte E22 radio modules")]
struct Cli {
    /// JSON device configuration; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device, overrides the configuration file
    #[arg(short, long)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[cfg_attr(not(feature = "raspberry-pi"), allow(dead_code))]
enum Commands {
    /// Print the module's register configuration
    Show,
    /// Broadcast a message in normal mode
    Send {
        payload: String,
        /// Treat the payload as hex bytes
        #[arg(long)]
        hex: bool,
    },
    /// Send a message to one address and channel (needs fixed transmission)
    SendFixed {
        address_high: u8,
        address_low: u8,
        channel: u8,
        payload: String,
        #[arg(long)]
        hex: bool,
    },
    /// Print received messages until Ctrl-C
    Listen,
    /// Change the module configuration
    Configure {
        #[arg(long)]
        channel: Option<u8>,
        /// Module address, e.g. 0x0102
        #[arg(long, value_parser = parse_address)]
        address: Option<u16>,
        /// Append RSSI to received messages
        #[arg(long)]
        rssi: Option<bool>,
        #[arg(long, value_enum)]
        transmission: Option<Transmission>,
        /// Lose the configuration on the next power cycle
        #[arg(long)]
        temporary: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
#[cfg_attr(not(feature = "raspberry-pi"), allow(dead_code))]
enum Transmission {
    Transparent,
    Fixed,
}

fn parse_address(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DeviceConfig::default(),
    };
    if let Some(port) = cli.port {
        config.serial_port = port;
    }

    run(config, cli.command).await
}

#[cfg(feature = "raspberry-pi")]
async fn run(config: DeviceConfig, command: Commands) -> anyhow::Result<()> {
    use ebyte_rs::e22::TransmissionMethod;
    use ebyte_rs::util::decode_hex;
    use ebyte_rs::{log_info, ChipMode, E22Module, EbyteError, HwHandler, Message};
    use std::sync::Arc;

    fn payload_bytes(payload: &str, hex: bool) -> anyhow::Result<Vec<u8>> {
        if hex {
            decode_hex(payload).context("invalid hex payload")
        } else {
            Ok(payload.as_bytes().to_vec())
        }
    }

    fn print_message(message: Result<Message, EbyteError>) {
        match message {
            Ok(message) => {
                let text = message
                    .payload_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| ebyte_rs::util::format_hex_compact(&message.payload));
                match message.rssi_dbm() {
                    Some(dbm) => println!("{text} (RSSI {dbm} dBm)"),
                    None => println!("{text}"),
                }
            }
            Err(e) => eprintln!("receive failed: {e}"),
        }
    }

    let handler = Arc::new(
        HwHandler::open_raspberry_pi(&config)
            .await
            .with_context(|| format!("opening module on {}", config.serial_port))?,
    );
    let module = E22Module::with_timing(handler.clone(), Box::new(print_message), config.timing)
        .await
        .context("reading module configuration")?;

    match command {
        Commands::Show => {
            println!("Mode: {}", module.mode()?);
            print!("{}", module.configuration_report());
        }
        Commands::Send { payload, hex } => {
            let bytes = payload_bytes(&payload, hex)?;
            module.set_mode(ChipMode::Normal).await?;
            module.send_message(&bytes).await?;
            log_info(&format!("Sent {} bytes", bytes.len()));
        }
        Commands::SendFixed {
            address_high,
            address_low,
            channel,
            payload,
            hex,
        } => {
            let bytes = payload_bytes(&payload, hex)?;
            module.set_mode(ChipMode::Normal).await?;
            module
                .send_fixed_message(address_high, address_low, channel, &bytes)
                .await?;
            log_info(&format!(
                "Sent {} bytes to {address_high:02x}{address_low:02x} on channel {channel}",
                bytes.len()
            ));
        }
        Commands::Listen => {
            module.set_mode(ChipMode::Normal).await?;
            log_info("Listening, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
        }
        Commands::Configure {
            channel,
            address,
            rssi,
            transmission,
            temporary,
        } => {
            let mut builder = module.config_builder();
            if let Some(channel) = channel {
                builder = builder.channel(channel);
            }
            if let Some(address) = address {
                let [high, low] = address.to_be_bytes();
                builder = builder.address(high, low);
            }
            if let Some(rssi) = rssi {
                builder = builder.rssi(rssi);
            }
            if let Some(transmission) = transmission {
                builder = builder.transmission(match transmission {
                    Transmission::Transparent => TransmissionMethod::Transparent,
                    Transmission::Fixed => TransmissionMethod::Fixed,
                });
            }

            if temporary {
                builder.write_temporary().await?;
            } else {
                builder.write_permanent().await?;
            }
            print!("{}", module.configuration_report());
        }
    }

    handler.close().await?;
    Ok(())
}

#[cfg(not(feature = "raspberry-pi"))]
async fn run(_config: DeviceConfig, _command: Commands) -> anyhow::Result<()> {
    anyhow::bail!("ebyte-cli was built without hardware support; rebuild with --features raspberry-pi")
}
