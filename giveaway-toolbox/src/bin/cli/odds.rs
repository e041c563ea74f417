use super::Entrants;
use color_eyre::Report;
use fair_draw_lib::{allocate, ParticipantId, Tickets};
use giveaway_toolbox::utils::csv::dump_data_to_writer;
use serde::Serialize;
use structopt::StructOpt;

const ODDS_DECIMAL_PLACES: u32 = 6;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Odds {
    #[structopt(flatten)]
    entrants: Entrants,
}

#[derive(Serialize)]
struct OddsRow {
    id: ParticipantId,
    display_name: String,
    first_ticket: Tickets,
    last_ticket: Tickets,
    odds: String,
}

impl Odds {
    pub fn exec(self) -> Result<(), Report> {
        let (config, participants) = self.entrants.load()?;
        let allocation = allocate(&participants, config.allocation_policy())?;
        tracing::info!(
            total_tickets = allocation.total_tickets(),
            tickets_per_participant = ?allocation.tickets_per_participant(),
            "ticket pool"
        );

        let rows: Vec<OddsRow> = allocation
            .ranges()
            .zip(allocation.odds())
            .zip(participants.iter())
            .map(|(((id, range), (_, odds)), participant)| OddsRow {
                id: id.clone(),
                display_name: participant.display_name.clone(),
                first_ticket: *range.start(),
                last_ticket: *range.end(),
                odds: odds.round_dp(ODDS_DECIMAL_PLACES).to_string(),
            })
            .collect();

        dump_data_to_writer(&rows, csv::Writer::from_writer(std::io::stdout()))?;
        Ok(())
    }
}
