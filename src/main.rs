//! RTDMS site agent: entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                     │
//! │                                                               │
//! │  HardwareAdapter      LcdDisplay / ConsoleDisplay             │
//! │  (relay + LED)        (DisplayPort)                           │
//! │  ClimateSensor        IotHubMqttTransport / LoopbackTransport │
//! │  (SensorPort)         (TelemetryTransport)   LogEventSink     │
//! │                                                               │
//! │  ──────────────── Port Trait Boundary ─────────────────       │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │  Agent: publisher · refresher · remote handler · uplink │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! │                                                               │
//! │  console thread: CommandDispatcher over stdin / stdout        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};

use rtdms::app::Agent;
use rtdms::app::dispatcher::CommandDispatcher;
use rtdms::drivers::task_pin::{Core, spawn_on_core};

fn main() -> Result<()> {
    // ── 1. Platform bootstrap (logging, config, peripherals) ──
    let (config, hardware, _platform) = platform::init()?;

    info!("RTDMS v{} ({})", env!("CARGO_PKG_VERSION"), config.device_id);

    // ── 2. Build and start the agent ──────────────────────────
    let agent = Arc::new(Agent::new(config, hardware));
    agent.start().context("agent startup failed")?;

    // ── 3. Interrupt path: same shutdown as `x` ───────────────
    platform::install_interrupt_handler(agent.clone())?;

    // ── 4. Operator console ───────────────────────────────────
    let console_agent = agent.clone();
    spawn_on_core(Core::App, 4, 16, "console\0", move || {
        let stdin = io::stdin();
        let mut dispatcher =
            CommandDispatcher::new(console_agent.clone(), stdin.lock(), io::stdout());
        if let Err(e) = dispatcher.run() {
            error!("Console failed: {}", e);
            console_agent.shutdown();
        }
    })
    .context("failed to spawn console thread")?;

    // ── 5. Park until shutdown completes ──────────────────────
    agent.wait_for_exit();
    info!("RTDMS agent exited");
    Ok(())
}

// ── Host platform ─────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod platform {
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use clap::Parser;
    use log::info;
    use tracing_subscriber::EnvFilter;

    use rtdms::adapters::hardware::HardwareAdapter;
    use rtdms::adapters::log_sink::LogEventSink;
    use rtdms::adapters::sim::{
        ConsoleDisplay, LoopbackTransport, SimBmp280Bus, SimDelay, SimPin,
    };
    use rtdms::app::{Agent, AgentHardware};
    use rtdms::config::AgentConfig;
    use rtdms::drivers::relay::RelayDriver;
    use rtdms::drivers::status_led::IndicatorLed;
    use rtdms::error::Error;
    use rtdms::sensors::ClimateSensor;

    /// Simulated RTDMS site agent.
    #[derive(Debug, Parser)]
    #[command(name = "rtdms", version, about)]
    struct Cli {
        /// Path to appsettings.json
        #[arg(short, long, default_value = "appsettings.json")]
        config: PathBuf,
    }

    /// Nothing to keep alive on the host.
    pub struct Platform;

    pub fn init() -> Result<(AgentConfig, AgentHardware, Platform)> {
        let cli = Cli::parse();

        // Logs go to stderr; stdout belongs to the console menu.
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();

        let config = AgentConfig::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?;
        info!("Config loaded from {}", cli.config.display());

        let outputs = HardwareAdapter::new(
            RelayDriver::new(SimPin::new(config.actuator_pin)),
            IndicatorLed::new(SimPin::new(config.indicator_pin)),
        );
        let sensor = ClimateSensor::new(SimBmp280Bus::new(), &mut SimDelay, config.sensor_address)
            .map_err(|e| Error::Init(format!("BMP280: {e}")))?;
        let display = ConsoleDisplay::new(config.display_line_count, config.display_line_length);

        let hardware = AgentHardware {
            sensor: Box::new(sensor),
            outputs: Box::new(outputs),
            display: Box::new(display),
            transport: Arc::new(LoopbackTransport::new()),
            events: Arc::new(LogEventSink::new()),
        };
        Ok((config, hardware, Platform))
    }

    pub fn install_interrupt_handler(agent: Arc<Agent>) -> Result<()> {
        ctrlc::set_handler(move || {
            info!("Interrupt received");
            agent.shutdown();
        })
        .context("installing Ctrl-C handler")
    }
}

// ── ESP-IDF platform ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use std::sync::Arc;

    use anyhow::{Context, Result, anyhow};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::Delay;
    use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
    use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::units::Hertz;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::info;

    use rtdms::adapters::hardware::{HardwareAdapter, LcdDisplay};
    use rtdms::adapters::log_sink::LogEventSink;
    use rtdms::adapters::mqtt::IotHubMqttTransport;
    use rtdms::app::{Agent, AgentHardware};
    use rtdms::config::AgentConfig;
    use rtdms::drivers::lcd::CharacterLcd;
    use rtdms::drivers::relay::RelayDriver;
    use rtdms::drivers::status_led::IndicatorLed;
    use rtdms::error::Error;
    use rtdms::pins;
    use rtdms::sensors::ClimateSensor;
    use rtdms::uplink::iothub::ConnectionString;

    /// Settings are baked into the image; the device has no filesystem.
    const APPSETTINGS: &str = include_str!("../appsettings.json");

    /// Keeps the Wi-Fi driver alive for the life of the process.
    pub struct Platform {
        _wifi: BlockingWifi<EspWifi<'static>>,
    }

    type OutPin = PinDriver<'static, AnyOutputPin, Output>;

    pub fn init() -> Result<(AgentConfig, AgentHardware, Platform)> {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;

        let config = AgentConfig::from_json(APPSETTINGS).context("embedded appsettings.json")?;
        let identity = ConnectionString::parse(&config.connection_string)
            .ok_or_else(|| anyhow!("ConnectionString is missing HostName or DeviceId"))?;

        let peripherals = Peripherals::take()?;

        // ── Console UART: blocking reads for the operator menu ──
        // SAFETY: called once, before any other thread touches the console UART.
        unsafe {
            let uart = esp_idf_svc::sys::CONFIG_ESP_CONSOLE_UART_NUM as i32;
            esp_idf_svc::sys::esp!(esp_idf_svc::sys::uart_driver_install(
                uart,
                512,
                0,
                0,
                core::ptr::null_mut(),
                0
            ))?;
            esp_idf_svc::sys::esp_vfs_dev_uart_use_driver(uart);
        }

        // ── Wi-Fi ──────────────────────────────────────────────
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
            sysloop,
        )?;
        let ssid = config.wifi_ssid.as_deref().unwrap_or_default();
        let password = config.wifi_password.as_deref().unwrap_or_default();
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|()| anyhow!("WifiSsid too long"))?,
            password: password
                .try_into()
                .map_err(|()| anyhow!("WifiPassword too long"))?,
            ..Default::default()
        }))?;
        wifi.start()?;
        wifi.connect().context("Wi-Fi connect")?;
        wifi.wait_netif_up()?;
        info!("Wi-Fi up ({})", ssid);

        // ── Sensor bus (I2C0) ──────────────────────────────────
        let sensor_i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio21,
            peripherals.pins.gpio22,
            &I2cConfig::new().baudrate(Hertz(pins::SENSOR_I2C_BAUD_HZ)),
        )?;
        let sensor = ClimateSensor::new(sensor_i2c, &mut Delay::new_default(), config.sensor_address)
            .map_err(|e| Error::Init(format!("BMP280: {e}")))?;

        // ── Display bus (I2C1) ─────────────────────────────────
        let display_i2c = I2cDriver::new(
            peripherals.i2c1,
            peripherals.pins.gpio18,
            peripherals.pins.gpio19,
            &I2cConfig::new().baudrate(Hertz(pins::DISPLAY_I2C_BAUD_HZ)),
        )?;
        let lcd = CharacterLcd::new(
            display_i2c,
            Delay::new_default(),
            config.display_address,
            config.display_line_count,
            config.display_line_length,
        )
        .map_err(|e| Error::Init(format!("LCD: {e:?}")))?;

        // ── Relay and indicator (GPIO numbers from config) ────
        // SAFETY: validate() has checked both numbers are distinct free
        // output GPIOs not claimed by the I2C buses above.
        let relay: OutPin = PinDriver::output(unsafe { AnyOutputPin::new(config.actuator_pin) })?;
        let led: OutPin = PinDriver::output(unsafe { AnyOutputPin::new(config.indicator_pin) })?;
        let outputs = HardwareAdapter::new(RelayDriver::new(relay), IndicatorLed::new(led));

        let transport = IotHubMqttTransport::new(identity, config.sas_token.clone());

        let hardware = AgentHardware {
            sensor: Box::new(sensor),
            outputs: Box::new(outputs),
            display: Box::new(LcdDisplay::new(lcd)),
            transport: Arc::new(transport),
            events: Arc::new(LogEventSink::new()),
        };
        Ok((config, hardware, Platform { _wifi: wifi }))
    }

    /// The device has no interrupt key; shutdown comes from the console.
    pub fn install_interrupt_handler(_agent: Arc<Agent>) -> Result<()> {
        Ok(())
    }
}
