use super::Entrants;
use color_eyre::Report;
use giveaway_toolbox::audit::{verify_session, AuditRecord};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Verify {
    #[structopt(flatten)]
    entrants: Entrants,

    /// Audit records (json) published with the draw
    audit: PathBuf,
}

impl Verify {
    pub fn exec(self) -> Result<(), Report> {
        let (config, participants) = self.entrants.load()?;
        let records: Vec<AuditRecord> =
            serde_json::from_reader(BufReader::new(File::open(&self.audit)?))?;

        verify_session(&participants, config.allocation_policy(), &records)?;

        for record in &records {
            println!(
                "#{} {} ticket {}/{} hash {}",
                record.position,
                record.winner,
                record.winning_ticket_number,
                record.total_tickets,
                record.hash
            );
        }
        println!("{} draws verified", records.len());
        Ok(())
    }
}
