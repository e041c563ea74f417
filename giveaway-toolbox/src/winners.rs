use fair_draw_lib::{DrawResult, Participant, ParticipantId, Tickets};
use serde::{Deserialize, Serialize};

/// Row persisted for every winner of a finalized session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WinnerRecord {
    pub position: usize,
    pub winner: ParticipantId,
    pub display_name: String,
    pub winning_ticket_number: Tickets,
    pub total_tickets: Tickets,
    pub tickets_per_participant: Option<Tickets>,
}

pub fn winner_records(results: &[DrawResult], participants: &[Participant]) -> Vec<WinnerRecord> {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| WinnerRecord {
            position: index + 1,
            winner: result.winner.clone(),
            display_name: participants
                .iter()
                .find(|participant| participant.id == result.winner)
                .map(|participant| participant.display_name.clone())
                .unwrap_or_default(),
            winning_ticket_number: result.winning_ticket_number,
            total_tickets: result.total_tickets,
            tickets_per_participant: result.tickets_per_participant,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::csv::dump_data_to_writer;
    use fair_draw_lib::{allocate, resolve, AllocationPolicy, HashAlgorithm, SeedMaterial};

    #[test]
    fn records_follow_selection_order() {
        let participants = vec![
            Participant::new("A", "Ann"),
            Participant::new("B", "Ben"),
            Participant::new("C", "Cid"),
            Participant::new("D", "Dee"),
        ];
        let allocation = allocate(&participants, AllocationPolicy::default()).unwrap();
        let results = vec![
            resolve(
                SeedMaterial::new("lucky", "seed", 42),
                &allocation,
                HashAlgorithm::Legacy,
            )
            .unwrap(),
            resolve(
                SeedMaterial::new("client", "server", 1),
                &allocation,
                HashAlgorithm::Blake2b256,
            )
            .unwrap(),
        ];

        let records = winner_records(&results, &participants);
        assert_eq!(
            records,
            vec![
                WinnerRecord {
                    position: 1,
                    winner: "D".into(),
                    display_name: "Dee".into(),
                    winning_ticket_number: 796,
                    total_tickets: 1000,
                    tickets_per_participant: Some(250),
                },
                WinnerRecord {
                    position: 2,
                    winner: "B".into(),
                    display_name: "Ben".into(),
                    winning_ticket_number: 277,
                    total_tickets: 1000,
                    tickets_per_participant: Some(250),
                },
            ]
        );

        let mut buffer = Vec::new();
        dump_data_to_writer(&records, csv::Writer::from_writer(&mut buffer)).unwrap();
        let written = String::from_utf8(buffer).unwrap();
        assert_eq!(
            written,
            "position,winner,display_name,winning_ticket_number,total_tickets,tickets_per_participant\n\
             1,D,Dee,796,1000,250\n\
             2,B,Ben,277,1000,250\n"
        );
    }
}
