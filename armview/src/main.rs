use anyhow::Result;
use armview::config::config_from_command_line;
use armview::show::Show;
use log::info;
use simplelog::{Config as LogConfig, SimpleLogger};

fn main() -> Result<()> {
    let cfg = config_from_command_line()?;
    SimpleLogger::init(cfg.log_level, LogConfig::default())?;
    info!("Polling {} every {:?}.", cfg.source, cfg.poll_interval);
    Show::new(cfg)?.run()
}
