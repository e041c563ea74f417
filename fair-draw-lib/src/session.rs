use crate::resolver::{self, DrawResult};
use crate::seed::{HashAlgorithm, NonceSequence, SeedMaterial};
use crate::tickets::{self, AllocationPolicy};
use crate::{Participant, ParticipantId};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("no eligible participants left to draw from")]
    NoEligibleParticipants,
    #[error("all {0} winners have already been drawn")]
    TargetAlreadyReached(usize),
    #[error("{0} is not an accepted winner of this session")]
    UnknownWinnerId(ParticipantId),
    #[error("only {drawn} of {target} winners have been drawn")]
    TargetNotReached { drawn: usize, target: usize },
    #[error("cannot {action} while the session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Allocation(#[from] tickets::Error),
    #[error(transparent)]
    Resolution(#[from] resolver::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Drawing,
    PendingAcceptance(DrawResult),
    Completed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Drawing => "drawing",
            SessionState::PendingAcceptance(_) => "pending acceptance",
            SessionState::Completed => "completed",
        }
    }
}

/// A multi-winner giveaway draw, owned by a single operator.
///
/// Draws are made without replacement: every draw allocates tickets over the
/// participants that have not been accepted as winners yet. Nothing is
/// persisted here; once [`SelectionSession::finalize`] succeeds the caller
/// stores the winners and drops the session.
#[derive(Clone, Debug)]
pub struct SelectionSession {
    participants: Vec<Participant>,
    target_winner_count: usize,
    policy: AllocationPolicy,
    algorithm: HashAlgorithm,
    client_seed: String,
    nonces: NonceSequence,
    pending_winners: Vec<DrawResult>,
    state: SessionState,
}

impl SelectionSession {
    pub fn new(
        participants: Vec<Participant>,
        target_winner_count: usize,
        client_seed: impl Into<String>,
    ) -> Self {
        Self {
            participants,
            target_winner_count,
            policy: AllocationPolicy::default(),
            algorithm: HashAlgorithm::default(),
            client_seed: client_seed.into(),
            nonces: NonceSequence::default(),
            pending_winners: Vec::new(),
            state: SessionState::Idle,
        }
    }

    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn client_seed(&self) -> &str {
        &self.client_seed
    }

    pub fn target_winner_count(&self) -> usize {
        self.target_winner_count
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Accepted winners, in selection order.
    pub fn pending_winners(&self) -> &[DrawResult] {
        &self.pending_winners
    }

    /// Participants not accepted as winners yet, in their original order.
    pub fn remaining_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(move |participant| {
            !self
                .pending_winners
                .iter()
                .any(|winner| winner.winner == participant.id)
        })
    }

    pub fn is_complete(&self) -> bool {
        self.pending_winners.len() >= self.target_winner_count
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// The operator may change the client seed between draws.
    pub fn set_client_seed(&mut self, client_seed: impl Into<String>) -> Result<(), Error> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("change the client seed"));
        }
        self.client_seed = client_seed.into();
        Ok(())
    }

    pub fn start_draw(&mut self) -> Result<(), Error> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("start a draw"));
        }
        if self.is_complete() {
            return Err(Error::TargetAlreadyReached(self.target_winner_count));
        }
        if self.remaining_participants().next().is_none() {
            return Err(Error::NoEligibleParticipants);
        }
        debug!(
            drawn = self.pending_winners.len(),
            target = self.target_winner_count,
            "draw started"
        );
        self.state = SessionState::Drawing;
        Ok(())
    }

    /// Resolves the draw in progress with a fresh server seed and nonce.
    pub fn resolve<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<DrawResult, Error> {
        if self.state != SessionState::Drawing {
            return Err(self.invalid("resolve a draw"));
        }
        let seed_material =
            SeedMaterial::generate(rng, self.client_seed.clone(), self.nonces.peek());
        self.resolve_with(seed_material)
    }

    /// Resolves the draw in progress with caller supplied seed material.
    pub fn resolve_with(&mut self, seed_material: SeedMaterial) -> Result<DrawResult, Error> {
        if self.state != SessionState::Drawing {
            return Err(self.invalid("resolve a draw"));
        }
        let remaining: Vec<&Participant> = self.remaining_participants().collect();
        let allocation = tickets::allocate(&remaining, self.policy)?;
        let nonce = seed_material.nonce;
        let mut result = resolver::resolve(seed_material, &allocation, self.algorithm)?;
        result.excluded = self
            .pending_winners
            .iter()
            .map(|winner| winner.winner.clone())
            .collect();

        self.nonces.observe(nonce);
        self.state = SessionState::PendingAcceptance(result.clone());
        Ok(result)
    }

    /// Discards the pending result and draws again from the same pool.
    pub fn reroll<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<DrawResult, Error> {
        if !matches!(self.state, SessionState::PendingAcceptance(_)) {
            return Err(self.invalid("reroll"));
        }
        let previous = std::mem::replace(&mut self.state, SessionState::Drawing);
        match self.resolve(rng) {
            Ok(result) => {
                debug!(winner = %result.winner, "draw rerolled");
                Ok(result)
            }
            Err(error) => {
                self.state = previous;
                Err(error)
            }
        }
    }

    pub fn accept(&mut self) -> Result<&DrawResult, Error> {
        let result = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::PendingAcceptance(result) => result,
            other => {
                self.state = other;
                return Err(self.invalid("accept a winner"));
            }
        };
        info!(
            winner = %result.winner,
            ticket = result.winning_ticket_number,
            position = self.pending_winners.len() + 1,
            "winner accepted"
        );
        self.pending_winners.push(result);
        Ok(&self.pending_winners[self.pending_winners.len() - 1])
    }

    /// Abandons a draw in progress, as if it never started.
    pub fn cancel(&mut self) -> Result<(), Error> {
        match self.state {
            SessionState::Drawing | SessionState::PendingAcceptance(_) => {
                self.state = SessionState::Idle;
                Ok(())
            }
            _ => Err(self.invalid("cancel a draw")),
        }
    }

    /// Takes back an accepted winner, returning them to the eligible pool.
    pub fn remove_winner(&mut self, id: &str) -> Result<DrawResult, Error> {
        if self.state == SessionState::Completed {
            return Err(self.invalid("remove a winner"));
        }
        let position = self
            .pending_winners
            .iter()
            .position(|result| result.winner == id)
            .ok_or_else(|| Error::UnknownWinnerId(id.to_string()))?;
        let removed = self.pending_winners.remove(position);
        self.state = SessionState::Idle;
        info!(winner = %removed.winner, "winner removed");
        Ok(removed)
    }

    /// Draws and accepts winners until the target is reached or nobody is left.
    pub fn draw_remaining<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, Error> {
        let mut drawn = 0;
        loop {
            match self.start_draw() {
                Ok(()) => {}
                Err(Error::TargetAlreadyReached(_)) | Err(Error::NoEligibleParticipants) => {
                    return Ok(drawn)
                }
                Err(error) => return Err(error),
            }
            if let Err(error) = self.resolve(rng) {
                self.state = SessionState::Idle;
                return Err(error);
            }
            self.accept()?;
            drawn += 1;
        }
    }

    /// Closes the session once the target is reached, or earlier when every
    /// participant has already won.
    pub fn finalize(&mut self) -> Result<&[DrawResult], Error> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("finalize"));
        }
        if !self.is_complete() && self.remaining_participants().next().is_some() {
            return Err(Error::TargetNotReached {
                drawn: self.pending_winners.len(),
                target: self.target_winner_count,
            });
        }
        info!(winners = self.pending_winners.len(), "session finalized");
        self.state = SessionState::Completed;
        Ok(&self.pending_winners)
    }
}
