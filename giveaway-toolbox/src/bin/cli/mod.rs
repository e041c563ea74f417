mod draw;
mod odds;
mod seeds;
mod verify;

use color_eyre::Report;
use fair_draw_lib::Participant;
use giveaway_toolbox::config::DrawConfig;
use giveaway_toolbox::participants::{self, Source};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum Cli {
    /// Generate a client seed to publish before the draw
    Seeds(seeds::Seeds),
    /// Run a giveaway draw and write winner and audit records
    Draw(draw::Draw),
    /// Recompute a published draw from its audit records
    Verify(verify::Verify),
    /// Show every participant's tickets and odds of winning a single draw
    Odds(odds::Odds),
}

impl Cli {
    pub fn exec(self) -> Result<(), Report> {
        match self {
            Cli::Seeds(seeds) => seeds.exec(),
            Cli::Draw(draw) => draw.exec(),
            Cli::Verify(verify) => verify.exec(),
            Cli::Odds(odds) => odds.exec(),
        }
    }
}

/// Participant list and draw settings shared by every command that reads entrants.
#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Entrants {
    /// Participants file, csv or json
    participants: PathBuf,

    /// How to read the participants file: plain, engagement or chat
    #[structopt(long, default_value = "plain")]
    source: Source,

    /// Chat keyword entrants had to type, required for the chat source
    #[structopt(long)]
    keyword: Option<String>,

    /// Draw settings (json), defaults apply to missing fields
    #[structopt(long)]
    config: Option<PathBuf>,
}

impl Entrants {
    pub fn load(&self) -> Result<(DrawConfig, Vec<Participant>), Report> {
        let config = DrawConfig::load_or_default(self.config.as_deref())?;
        let participants = participants::load_participants(
            &self.participants,
            self.source,
            self.keyword.as_deref(),
            &config.engagement_weights,
        )?;
        Ok((config, participants))
    }
}
