pub mod resolver;
pub mod seed;
pub mod session;
pub mod tickets;

use serde::{Deserialize, Serialize};

pub use resolver::{resolve, verify, DrawResult};
pub use seed::{HashAlgorithm, Nonce, NonceSequence, SeedMaterial};
pub use session::{SelectionSession, SessionState};
pub use tickets::{allocate, AllocationPolicy, RemainderPolicy, TicketAllocation};

pub type ParticipantId = String;
pub type Tickets = u64;

/// One eligible entrant of a draw.
///
/// `weight` is the number of tickets the entrant holds under the engagement
/// policy; fixed-pool draws ignore it and give every entrant the same share.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_weight")]
    pub weight: Tickets,
}

fn default_weight() -> Tickets {
    1
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: Tickets) -> Self {
        self.weight = weight;
        self
    }
}

#[cfg(any(test, feature = "proptest"))]
pub mod testing {
    use super::*;
    use proptest::collection::{btree_map, SizeRange};
    use proptest::prelude::*;

    impl Arbitrary for Participant {
        type Parameters = ();
        type Strategy = BoxedStrategy<Participant>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            ("[a-z0-9_]{1,12}", "[A-Za-z ]{0,16}", 1..100u64)
                .prop_map(|(id, display_name, weight)| Participant {
                    id,
                    display_name,
                    weight,
                })
                .boxed()
        }
    }

    /// Participant lists with unique ids, as a participant source hands them over.
    pub fn participants(size: impl Into<SizeRange>) -> BoxedStrategy<Vec<Participant>> {
        btree_map("[a-z0-9_]{1,12}", ("[A-Za-z ]{0,16}", 1..100u64), size)
            .prop_map(|entries| {
                entries
                    .into_iter()
                    .map(|(id, (display_name, weight))| Participant {
                        id,
                        display_name,
                        weight,
                    })
                    .collect()
            })
            .boxed()
    }
}
