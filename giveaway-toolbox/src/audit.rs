use fair_draw_lib::resolver;
use fair_draw_lib::tickets::{self, allocate};
use fair_draw_lib::{
    AllocationPolicy, DrawResult, HashAlgorithm, Nonce, Participant, ParticipantId, SeedMaterial,
    Tickets,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("draw #{position}: {source}")]
    Allocation {
        position: usize,
        source: tickets::Error,
    },

    #[error("draw #{position}: {source}")]
    Resolution {
        position: usize,
        source: resolver::Error,
    },
}

/// Everything a viewer needs to recompute one draw by hand.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub position: usize,
    pub client_seed: String,
    pub server_seed: String,
    pub nonce: Nonce,
    pub algorithm: HashAlgorithm,
    pub hash: String,
    pub total_tickets: Tickets,
    pub tickets_per_participant: Option<Tickets>,
    pub winning_ticket_number: Tickets,
    pub winner: ParticipantId,
    /// Winners that were out of the pool when this draw was made.
    #[serde(default)]
    pub excluded: Vec<ParticipantId>,
}

impl AuditRecord {
    pub fn new(position: usize, result: &DrawResult) -> Self {
        Self {
            position,
            client_seed: result.seed_material.client_seed.clone(),
            server_seed: result.seed_material.server_seed.clone(),
            nonce: result.seed_material.nonce,
            algorithm: result.algorithm,
            hash: result.hash.clone(),
            total_tickets: result.total_tickets,
            tickets_per_participant: result.tickets_per_participant,
            winning_ticket_number: result.winning_ticket_number,
            winner: result.winner.clone(),
            excluded: result.excluded.clone(),
        }
    }
}

impl From<AuditRecord> for DrawResult {
    fn from(record: AuditRecord) -> Self {
        DrawResult {
            seed_material: SeedMaterial::new(record.client_seed, record.server_seed, record.nonce),
            algorithm: record.algorithm,
            hash: record.hash,
            total_tickets: record.total_tickets,
            tickets_per_participant: record.tickets_per_participant,
            winning_ticket_number: record.winning_ticket_number,
            winner: record.winner,
            excluded: record.excluded,
        }
    }
}

pub fn audit_records(results: &[DrawResult]) -> Vec<AuditRecord> {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| AuditRecord::new(index + 1, result))
        .collect()
}

/// Replays a published session: each draw is recomputed over the
/// participants minus the winners it excluded, so winners removed between
/// draws do not break the replay.
pub fn verify_session(
    participants: &[Participant],
    policy: AllocationPolicy,
    records: &[AuditRecord],
) -> Result<(), Error> {
    for record in records {
        let position = record.position;
        let excluded: HashSet<&ParticipantId> = record.excluded.iter().collect();
        let remaining: Vec<&Participant> = participants
            .iter()
            .filter(|participant| !excluded.contains(&participant.id))
            .collect();
        let allocation = allocate(&remaining, policy)
            .map_err(|source| Error::Allocation { position, source })?;
        let result = DrawResult::from(record.clone());
        resolver::verify(&result, &allocation)
            .map_err(|source| Error::Resolution { position, source })?;
        tracing::debug!(position, winner = %result.winner, "draw verified");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fair_draw_lib::testing::participants;
    use fair_draw_lib::SelectionSession;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use test_strategy::proptest;

    fn session_records(participants: Vec<Participant>, target: usize, seed: [u8; 32]) -> Vec<AuditRecord> {
        let mut session = SelectionSession::new(participants, target, "client");
        session.draw_remaining(&mut ChaCha8Rng::from_seed(seed)).unwrap();
        audit_records(session.finalize().unwrap())
    }

    fn named(ids: &[&str]) -> Vec<Participant> {
        ids.iter().map(|id| Participant::new(*id, *id)).collect()
    }

    #[test]
    fn records_round_trip_through_json() {
        let records = session_records(named(&["A", "B", "C"]), 2, [1; 32]);
        let json = serde_json::to_string_pretty(&records).unwrap();
        assert!(json.contains("\"algorithm\": \"blake2b256\""));
        let parsed: Vec<AuditRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn forged_winner_is_detected() {
        let participants = named(&["A", "B", "C", "D"]);
        let mut records = session_records(participants.clone(), 2, [2; 32]);
        let honest = records[1].winner.clone();
        let forged = participants
            .iter()
            .map(|participant| participant.id.clone())
            .find(|id| *id != honest && *id != records[0].winner)
            .unwrap();
        records[1].winner = forged;
        assert_eq!(
            verify_session(&participants, AllocationPolicy::default(), &records),
            Err(Error::Resolution {
                position: 2,
                source: resolver::Error::VerificationFailed("winner")
            })
        );
    }

    #[test]
    fn replay_needs_the_original_pool() {
        let participants = named(&["A", "B", "C", "D"]);
        let records = session_records(participants.clone(), 1, [3; 32]);
        let smaller = named(&["A", "B", "C"]);
        assert!(matches!(
            verify_session(&smaller, AllocationPolicy::default(), &records),
            Err(Error::Resolution { position: 1, .. })
        ));
    }

    #[test]
    fn sessions_with_removed_winners_verify() {
        let participants = named(&["A", "B", "C", "D"]);
        let mut rng = ChaCha8Rng::from_seed([4; 32]);
        let mut session = SelectionSession::new(participants.clone(), 2, "client");
        session.draw_remaining(&mut rng).unwrap();
        let first = session.pending_winners()[0].winner.clone();
        session.remove_winner(&first).unwrap();
        assert_eq!(session.draw_remaining(&mut rng), Ok(1));

        let records = audit_records(session.finalize().unwrap());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].excluded, vec![first]);
        assert_eq!(records[1].excluded, vec![records[0].winner.clone()]);
        assert_eq!(
            verify_session(&participants, AllocationPolicy::default(), &records),
            Ok(())
        );
    }

    #[test]
    fn tampered_exclusions_are_detected() {
        let participants = named(&["A", "B", "C", "D"]);
        let mut records = session_records(participants.clone(), 2, [5; 32]);
        records[1].excluded.clear();
        assert!(matches!(
            verify_session(&participants, AllocationPolicy::default(), &records),
            Err(Error::Resolution { position: 2, .. })
        ));
    }

    #[proptest]
    fn sessions_with_a_removal_verify(
        #[strategy(participants(2..20))] participants: Vec<Participant>,
        #[strategy(1..6usize)] target: usize,
        removal: usize,
        seed: [u8; 32],
    ) {
        let mut rng = ChaCha8Rng::from_seed(seed);
        let mut session = SelectionSession::new(participants.clone(), target, "client");
        session.draw_remaining(&mut rng).unwrap();
        let drawn = session.pending_winners();
        let removed = drawn[removal % drawn.len()].winner.clone();
        session.remove_winner(&removed).unwrap();
        session.draw_remaining(&mut rng).unwrap();

        let records = audit_records(session.finalize().unwrap());
        assert_eq!(
            verify_session(&participants, AllocationPolicy::default(), &records),
            Ok(())
        );
    }

    #[proptest]
    fn honest_sessions_verify(
        #[strategy(participants(1..20))] participants: Vec<Participant>,
        #[strategy(1..10usize)] target: usize,
        seed: [u8; 32],
    ) {
        let mut records = session_records(participants.clone(), target, seed);
        records.reverse();
        assert_eq!(
            verify_session(&participants, AllocationPolicy::default(), &records),
            Ok(())
        );
    }
}
