use super::Entrants;
use color_eyre::Report;
use fair_draw_lib::seed::generate_client_seed;
use fair_draw_lib::{HashAlgorithm, SelectionSession};
use giveaway_toolbox::audit::audit_records;
use giveaway_toolbox::utils::csv::{dump_data_to_csv, dump_data_to_writer};
use giveaway_toolbox::winners::winner_records;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;
use tracing::{info, warn};

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Draw {
    #[structopt(flatten)]
    entrants: Entrants,

    /// Number of winners to draw
    #[structopt(long, default_value = "1")]
    winners: usize,

    /// Client seed published before the draw, a random one is generated when missing
    #[structopt(long)]
    client_seed: Option<String>,

    /// Hash algorithm (blake2b256 or legacy), overrides the config file
    #[structopt(long)]
    algorithm: Option<HashAlgorithm>,

    /// Winner records format, csv or json
    #[structopt(long, default_value = "csv")]
    format: Format,

    /// Winner records output path, printed to stdout when missing
    #[structopt(long)]
    winners_out: Option<PathBuf>,

    /// Audit records output path (json)
    #[structopt(long)]
    audit_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            _ => Err(format!("unknown format {}, expected csv or json", s)),
        }
    }
}

impl Draw {
    pub fn exec(self) -> Result<(), Report> {
        let Draw {
            entrants,
            winners,
            client_seed,
            algorithm,
            format,
            winners_out,
            audit_out,
        } = self;
        let (mut config, participants) = entrants.load()?;
        if let Some(algorithm) = algorithm {
            config.algorithm = algorithm;
        }

        let mut rng = rand::thread_rng();
        let client_seed = client_seed.unwrap_or_else(|| generate_client_seed(&mut rng));
        info!(%client_seed, algorithm = %config.algorithm, winners, "starting draw");

        let mut session = SelectionSession::new(participants.clone(), winners, client_seed)
            .with_policy(config.allocation_policy())
            .with_algorithm(config.algorithm);
        let drawn = session.draw_remaining(&mut rng)?;
        if drawn < winners {
            warn!(drawn, requested = winners, "not enough participants for every prize");
        }
        let results = session.finalize()?.to_vec();

        let records = winner_records(&results, &participants);
        match (format, winners_out) {
            (Format::Csv, Some(path)) => dump_data_to_csv(&records, &path)?,
            (Format::Csv, None) => {
                dump_data_to_writer(&records, csv::Writer::from_writer(std::io::stdout()))?
            }
            (Format::Json, Some(path)) => {
                serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &records)?
            }
            (Format::Json, None) => serde_json::to_writer_pretty(std::io::stdout(), &records)?,
        }

        if let Some(path) = audit_out {
            let writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(writer, &audit_records(&results))?;
            info!(path = %path.display(), "audit records written");
        }
        Ok(())
    }
}
