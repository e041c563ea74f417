use crate::seed::{HashAlgorithm, SeedMaterial};
use crate::tickets::TicketAllocation;
use crate::{ParticipantId, Tickets};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of leading hex digits of the hash turned into the ticket draw.
pub const HASH_PREFIX_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("ticket pool has no drawable tickets")]
    InvalidTicketPool,
    #[error("hash {0:?} does not start with {} hex digits", HASH_PREFIX_LEN)]
    MalformedHash(String),
    #[error("published {0} does not match the recomputed draw")]
    VerificationFailed(&'static str),
}

/// Outcome of one resolved draw, with everything needed to audit it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DrawResult {
    pub seed_material: SeedMaterial,
    pub algorithm: HashAlgorithm,
    pub hash: String,
    pub total_tickets: Tickets,
    pub tickets_per_participant: Option<Tickets>,
    pub winning_ticket_number: Tickets,
    pub winner: ParticipantId,
    /// Winners already taken out of the pool when this draw was made.
    #[serde(default)]
    pub excluded: Vec<ParticipantId>,
}

pub fn hash_to_int(hash: &str) -> Result<u64, Error> {
    let mut buffer = [0u8; HASH_PREFIX_LEN / 2];
    hash.get(..HASH_PREFIX_LEN)
        .and_then(|prefix| hex::decode_to_slice(prefix, &mut buffer).ok())
        .ok_or_else(|| Error::MalformedHash(hash.to_string()))?;
    Ok(u64::from(u32::from_be_bytes(buffer)))
}

/// `(hash_int mod total_tickets) + 1`, always within `[1, total_tickets]`.
pub fn winning_ticket(hash_int: u64, total_tickets: Tickets) -> Result<Tickets, Error> {
    if total_tickets == 0 {
        return Err(Error::InvalidTicketPool);
    }
    Ok(hash_int % total_tickets + 1)
}

pub fn resolve(
    seed_material: SeedMaterial,
    allocation: &TicketAllocation,
    algorithm: HashAlgorithm,
) -> Result<DrawResult, Error> {
    let total_tickets = allocation.total_tickets();
    if total_tickets == 0 {
        return Err(Error::InvalidTicketPool);
    }

    let hash = seed_material.hash(algorithm);
    let winning_ticket_number = winning_ticket(hash_to_int(&hash)?, total_tickets)?;
    // a dead-zone pool smaller than the participant list owns no tickets at all
    let winner = allocation
        .owner_of(winning_ticket_number)
        .ok_or(Error::InvalidTicketPool)?
        .clone();

    tracing::debug!(
        %hash,
        nonce = seed_material.nonce,
        winning_ticket_number,
        total_tickets,
        %winner,
        "resolved draw"
    );

    Ok(DrawResult {
        seed_material,
        algorithm,
        hash,
        total_tickets,
        tickets_per_participant: allocation.tickets_per_participant(),
        winning_ticket_number,
        winner,
        excluded: Vec::new(),
    })
}

/// Recomputes a published draw against the allocation it claims to come from.
pub fn verify(result: &DrawResult, allocation: &TicketAllocation) -> Result<(), Error> {
    let expected = resolve(result.seed_material.clone(), allocation, result.algorithm)?;
    if expected.hash != result.hash {
        return Err(Error::VerificationFailed("hash"));
    }
    if expected.total_tickets != result.total_tickets {
        return Err(Error::VerificationFailed("total tickets"));
    }
    if expected.tickets_per_participant != result.tickets_per_participant {
        return Err(Error::VerificationFailed("tickets per participant"));
    }
    if expected.winning_ticket_number != result.winning_ticket_number {
        return Err(Error::VerificationFailed("winning ticket number"));
    }
    if expected.winner != result.winner {
        return Err(Error::VerificationFailed("winner"));
    }
    Ok(())
}
