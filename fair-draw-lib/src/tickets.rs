use crate::{Participant, ParticipantId, Tickets};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::ops::RangeInclusive;
use thiserror::Error;

pub const DEFAULT_POOL_SIZE: Tickets = 1000;

pub type TicketRange = RangeInclusive<Tickets>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("cannot allocate tickets to an empty participant set")]
    EmptyParticipantSet,
    #[error("Value overflowed its maximum value")]
    Overflow,
}

/// What happens to the `pool_size mod N` tickets a fixed pool cannot split evenly.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RemainderPolicy {
    /// Tickets stay unassigned and a draw landing on them goes to the last participant.
    DeadZone,
    /// The first `pool_size mod N` participants get one extra ticket each.
    RoundRobin,
}

impl Default for RemainderPolicy {
    fn default() -> Self {
        RemainderPolicy::DeadZone
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum AllocationPolicy {
    /// Equal odds: `pool_size` tickets split evenly between all participants.
    FixedPool {
        pool_size: Tickets,
        #[serde(default)]
        remainder: RemainderPolicy,
    },
    /// Every participant holds `max(1, weight)` tickets.
    Engagement,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy::fixed_pool(DEFAULT_POOL_SIZE)
    }
}

impl AllocationPolicy {
    pub fn fixed_pool(pool_size: Tickets) -> Self {
        AllocationPolicy::FixedPool {
            pool_size,
            remainder: RemainderPolicy::default(),
        }
    }
}

/// Contiguous ticket ranges, in the order participants were handed in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketAllocation {
    policy: AllocationPolicy,
    total_tickets: Tickets,
    tickets_per_participant: Option<Tickets>,
    ranges: Vec<(ParticipantId, TicketRange)>,
}

impl TicketAllocation {
    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn total_tickets(&self) -> Tickets {
        self.total_tickets
    }

    /// Base share of a fixed pool, `None` for engagement allocations.
    pub fn tickets_per_participant(&self) -> Option<Tickets> {
        self.tickets_per_participant
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> impl Iterator<Item = (&ParticipantId, &TicketRange)> {
        self.ranges.iter().map(|(id, range)| (id, range))
    }

    /// Whether a draw over this allocation can produce a winner at all.
    ///
    /// A dead-zone pool with fewer tickets than participants gives nobody a
    /// ticket.
    pub fn is_drawable(&self) -> bool {
        let empty_dead_zone = matches!(
            (self.policy, self.tickets_per_participant),
            (
                AllocationPolicy::FixedPool {
                    remainder: RemainderPolicy::DeadZone,
                    ..
                },
                Some(0)
            )
        );
        self.total_tickets > 0 && !self.ranges.is_empty() && !empty_dead_zone
    }

    /// Index of the participant holding `ticket`, `None` if the ticket lies
    /// outside `[1, total_tickets]` or the pool cannot be resolved at all.
    pub fn owner_index(&self, ticket: Tickets) -> Option<usize> {
        if ticket == 0 || ticket > self.total_tickets || !self.is_drawable() {
            return None;
        }
        match (self.policy, self.tickets_per_participant) {
            (
                AllocationPolicy::FixedPool {
                    remainder: RemainderPolicy::DeadZone,
                    ..
                },
                Some(per_participant),
            ) => {
                let index = usize::try_from((ticket - 1) / per_participant).unwrap_or(usize::MAX);
                Some(index.min(self.ranges.len() - 1))
            }
            _ => {
                let index = self
                    .ranges
                    .partition_point(|(_, range)| *range.end() < ticket);
                (index < self.ranges.len()).then(|| index)
            }
        }
    }

    pub fn owner_of(&self, ticket: Tickets) -> Option<&ParticipantId> {
        self.owner_index(ticket).map(|index| &self.ranges[index].0)
    }

    /// Probability of each participant winning a single draw.
    ///
    /// Dead-zone tickets are credited to the last participant, since that is
    /// where the resolver sends them. Nobody has any chance in a pool that is
    /// not drawable.
    pub fn odds(&self) -> Vec<(ParticipantId, Decimal)> {
        if !self.is_drawable() {
            return self
                .ranges
                .iter()
                .map(|(id, _)| (id.clone(), Decimal::ZERO))
                .collect();
        }
        let assigned: Tickets = self.ranges.iter().map(|(_, range)| range_len(range)).sum();
        let dead_tickets = self.total_tickets.saturating_sub(assigned);
        let last = self.ranges.len() - 1;
        self.ranges
            .iter()
            .enumerate()
            .map(|(index, (id, range))| {
                let mut tickets = range_len(range);
                if index == last {
                    tickets += dead_tickets;
                }
                (
                    id.clone(),
                    Decimal::from(tickets) / Decimal::from(self.total_tickets),
                )
            })
            .collect()
    }
}

fn range_len(range: &TicketRange) -> Tickets {
    if range.is_empty() {
        0
    } else {
        range.end() - range.start() + 1
    }
}

pub fn allocate(
    participants: &[impl Borrow<Participant>],
    policy: AllocationPolicy,
) -> Result<TicketAllocation, Error> {
    if participants.is_empty() {
        return Err(Error::EmptyParticipantSet);
    }
    let allocation = match policy {
        AllocationPolicy::FixedPool {
            pool_size,
            remainder,
        } => fixed_pool(participants, policy, pool_size, remainder)?,
        AllocationPolicy::Engagement => engagement(participants, policy)?,
    };
    tracing::debug!(
        participants = allocation.len(),
        total_tickets = allocation.total_tickets,
        "allocated tickets"
    );
    Ok(allocation)
}

fn fixed_pool(
    participants: &[impl Borrow<Participant>],
    policy: AllocationPolicy,
    pool_size: Tickets,
    remainder: RemainderPolicy,
) -> Result<TicketAllocation, Error> {
    let n_participants = participants.len() as Tickets;
    let per_participant = pool_size / n_participants;
    let extra_tickets = match remainder {
        RemainderPolicy::DeadZone => 0,
        RemainderPolicy::RoundRobin => pool_size % n_participants,
    };

    let mut assigned: Tickets = 0;
    let mut ranges = Vec::with_capacity(participants.len());
    for (index, participant) in participants.iter().enumerate() {
        let tickets = per_participant + Tickets::from((index as Tickets) < extra_tickets);
        let first_ticket = assigned.checked_add(1).ok_or(Error::Overflow)?;
        let last_ticket = assigned.checked_add(tickets).ok_or(Error::Overflow)?;
        // an empty share yields an empty range (first > last)
        ranges.push((participant.borrow().id.clone(), first_ticket..=last_ticket));
        assigned = last_ticket;
    }

    Ok(TicketAllocation {
        policy,
        total_tickets: pool_size,
        tickets_per_participant: Some(per_participant),
        ranges,
    })
}

fn engagement(
    participants: &[impl Borrow<Participant>],
    policy: AllocationPolicy,
) -> Result<TicketAllocation, Error> {
    let mut assigned: Tickets = 0;
    let mut ranges = Vec::with_capacity(participants.len());
    for participant in participants {
        let participant = participant.borrow();
        let first_ticket = assigned.checked_add(1).ok_or(Error::Overflow)?;
        let last_ticket = assigned
            .checked_add(participant.weight.max(1))
            .ok_or(Error::Overflow)?;
        ranges.push((participant.id.clone(), first_ticket..=last_ticket));
        assigned = last_ticket;
    }

    Ok(TicketAllocation {
        policy,
        total_tickets: assigned,
        tickets_per_participant: None,
        ranges,
    })
}
