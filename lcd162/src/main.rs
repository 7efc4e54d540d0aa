mod config;
mod demo;

use crate::config::{Backend, Config};
use dotenv::dotenv;
use embedded_hal::delay::DelayNs;
use lcd162_gpio::IoSpace;
use lcd162_gpio::lcd::hd44780::backlight::Backlight;
use lcd162_gpio::lcd::hd44780::display::Lcd162;
use lcd162_gpio::lcd::hd44780::driver::PortHD44780Driver;
use lcd162_gpio::lcd::hd44780::pins::LCD_KEYPAD_SHIELD;
use lcd162_gpio::lcd::hd44780::probe::{BusProbe, Transfer};
use lcd162_gpio::lcd::hd44780::timing::SpinDelay;
use lcd162_gpio::pwm::Timer2Pwm;
use lcd162_gpio::raw::RawIoSpace;
use lcd162_gpio::sim::SimIoSpace;
use log::{debug, info, trace};
use sysinfo::System;

fn build_lcd<'a>(
    config: &Config,
    io: &'a dyn IoSpace,
    delay: impl DelayNs + 'a,
) -> eyre::Result<Lcd162<'a>> {
    let backlight = Backlight::new(Timer2Pwm::new(io, LCD_KEYPAD_SHIELD.backlight)?)
        .with_curve(config.curve()?)
        .with_default_percent(config.backlight);

    let driver = PortHD44780Driver::new(io, LCD_KEYPAD_SHIELD, delay)?
        .with_timing(config.timing()?)
        .with_backlight(backlight);
    debug!("{:?} created.", driver);

    Ok(Lcd162::new(driver))
}

fn run<'a>(config: &Config, io: &'a dyn IoSpace, delay: impl DelayNs + 'a) -> eyre::Result<()> {
    let mut lcd = build_lcd(config, io, delay)?;

    debug!("Initializing LCD...");
    lcd.init()?;
    let driver = lcd.driver();
    info!("LCD initialized at {} Hz.", driver.timing().clock_hz);
    debug!("Pins: {:?}", driver.pins());

    demo::run(config, &mut lcd)
}

fn log_trace(io: &SimIoSpace) -> eyre::Result<()> {
    let nibbles = BusProbe::new(LCD_KEYPAD_SHIELD).nibbles(&io.timeline());
    let split = BusProbe::BOOTSTRAP_NIBBLES.min(nibbles.len());
    let (bootstrap, rest) = nibbles.split_at(split);

    let bootstrap: Vec<u8> = bootstrap.iter().map(|(_, nibble)| *nibble).collect();
    debug!("Bootstrap nibbles: {:x?}", bootstrap);

    let transfers = BusProbe::pair(rest)?;
    for transfer in &transfers {
        trace!("{}", transfer);
    }

    let commands = transfers
        .iter()
        .filter(|transfer| matches!(transfer, Transfer::Command(_)))
        .count();
    info!(
        "Bus trace: {} commands, {} data bytes, {:.1} ms spent waiting",
        commands,
        transfers.len() - commands,
        io.total_delay_ns() as f64 / 1_000_000.0
    );
    Ok(())
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!("Architecture {}", System::cpu_arch());

    debug!("Trying to load config...");
    let mut config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    config.apply_env()?;
    debug!("{:?}", config);

    info!("lcd162 v{} on the {} backend", env!("CARGO_PKG_VERSION"), config.backend);

    match config.backend {
        Backend::Sim => {
            let io = SimIoSpace::default();
            run(&config, &io, io.delay())?;
            log_trace(&io)?;
        }
        Backend::Raw => {
            let io = RawIoSpace::create(&config.register_image, SimIoSpace::ATMEGA2560_SIZE)?;
            debug!("{:?} mapped.", io);
            run(&config, &io, SpinDelay)?;
        }
    }

    info!("Done.");
    Ok(())
}
