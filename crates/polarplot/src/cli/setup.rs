use crate::{
    cli::positive,
    config::{Config, DEFAULT_CONFIG_PATH},
};
use anyhow::{Context, Result};
use clap::Args;
use polarplot_core::Point;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Horizontal distance between the two anchors, mm.
    #[arg(value_parser = positive)]
    pub anchor_separation: f64,

    /// Current left cable length, mm.
    #[arg(value_parser = positive)]
    pub left: f64,

    /// Current right cable length, mm.
    #[arg(value_parser = positive)]
    pub right: f64,

    /// Configuration file to update (TOML or JSON).
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl SetupArgs {
    pub fn run(&self) -> Result<()> {
        let mut config = Config::load(&self.config)?;
        let start = self.apply(&mut config)?;

        println!("Initial X,Y position of pen is {:.3}, {:.3}", start.x, start.y);
        config.write(&self.config)?;
        info!(path = %self.config.display(), "configuration saved");
        Ok(())
    }

    /// Record the machine geometry in `config` and return the resulting pen
    /// position. `config` is left untouched when the geometry is rejected.
    pub fn apply(&self, config: &mut Config) -> Result<Point> {
        let mut updated = config.clone();
        updated.motion.anchor_separation_mm = self.anchor_separation;
        updated.motion.start_left_mm = self.left;
        updated.motion.start_right_mm = self.right;

        updated
            .validate()
            .context("setup rejected, configuration not written")?;
        let start = updated.motion.start_position()?;

        *config = updated;
        Ok(start)
    }
}
