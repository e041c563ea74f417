use crate::utils::csv::load_data_from_csv;
use crate::utils::serde::deserialize_truthy_falsy;
use fair_draw_lib::{Participant, ParticipantId, Tickets};
use itertools::Itertools;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(ParticipantId),

    #[error("chat entries need a keyword to filter on")]
    MissingKeyword,

    #[error("unknown participant source {0}, expected one of plain, engagement, chat")]
    UnknownSource(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A giveaway entry as exported by the entry store.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    #[serde(alias = "user_id", alias = "Id")]
    pub id: ParticipantId,
    #[serde(default, alias = "username", alias = "Display Name")]
    pub display_name: String,
    #[serde(default)]
    pub weight: Option<Tickets>,
    // e.g. the streamer's own account or banned users
    #[serde(default, deserialize_with = "deserialize_truthy_falsy")]
    pub excluded: bool,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        let display_name = if row.display_name.is_empty() {
            row.id.clone()
        } else {
            row.display_name
        };
        Participant::new(row.id, display_name).with_weight(row.weight.unwrap_or(1))
    }
}

/// Engagement counters of a post reply, one row per account.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngagementRow {
    #[serde(alias = "user_id")]
    pub id: ParticipantId,
    #[serde(default, alias = "username")]
    pub display_name: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub quotes: u64,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct EngagementWeights {
    pub like: Tickets,
    pub retweet: Tickets,
    pub reply: Tickets,
    pub quote: Tickets,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            like: 1,
            retweet: 3,
            reply: 2,
            quote: 2,
        }
    }
}

impl EngagementWeights {
    /// Tickets earned by an account, never below one.
    pub fn tickets(&self, row: &EngagementRow) -> Tickets {
        [
            (row.likes, self.like),
            (row.retweets, self.retweet),
            (row.replies, self.reply),
            (row.quotes, self.quote),
        ]
        .iter()
        .fold(0u64, |acc, (count, weight)| {
            acc.saturating_add(count.saturating_mul(*weight))
        })
        .max(1)
    }
}

pub fn from_engagement(
    rows: impl IntoIterator<Item = EngagementRow>,
    weights: &EngagementWeights,
) -> Vec<Participant> {
    rows.into_iter()
        .map(|row| {
            let tickets = weights.tickets(&row);
            let display_name = if row.display_name.is_empty() {
                row.id.clone()
            } else {
                row.display_name
            };
            Participant::new(row.id, display_name).with_weight(tickets)
        })
        .collect()
}

/// One chat message captured by the chat monitor.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessageRow {
    #[serde(alias = "user_id")]
    pub sender_id: ParticipantId,
    #[serde(alias = "username")]
    pub sender: String,
    #[serde(alias = "content")]
    pub message: String,
}

/// Everyone who typed `keyword` in chat enters once, in order of first entry.
pub fn entrants_from_chat(
    messages: impl IntoIterator<Item = ChatMessageRow>,
    keyword: &str,
) -> Vec<Participant> {
    let keyword = keyword.to_lowercase();
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|row| row.message.to_lowercase().contains(&keyword))
        .filter(|row| seen.insert(row.sender_id.clone()))
        .map(|row| Participant::new(row.sender_id, row.sender))
        .collect()
}

pub fn eligible(rows: impl IntoIterator<Item = ParticipantRow>) -> Vec<Participant> {
    rows.into_iter()
        .filter(|row| !row.excluded)
        .map(Participant::from)
        .collect()
}

pub fn ensure_unique(participants: &[Participant]) -> Result<(), Error> {
    let counts = participants.iter().counts_by(|participant| &participant.id);
    match participants
        .iter()
        .find(|participant| counts[&participant.id] > 1)
    {
        Some(duplicate) => Err(Error::DuplicateParticipant(duplicate.id.clone())),
        None => Ok(()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Plain,
    Engagement,
    Chat,
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "plain" => Ok(Source::Plain),
            "engagement" => Ok(Source::Engagement),
            "chat" => Ok(Source::Chat),
            _ => Err(Error::UnknownSource(s.to_string())),
        }
    }
}

fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Error> {
    let is_json = path
        .extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    } else {
        Ok(load_data_from_csv::<_, b','>(path)?)
    }
}

/// Reads a participant list (csv, or json by extension) and checks ids are unique.
pub fn load_participants(
    path: &Path,
    source: Source,
    keyword: Option<&str>,
    weights: &EngagementWeights,
) -> Result<Vec<Participant>, Error> {
    let participants = match source {
        Source::Plain => eligible(load_rows::<ParticipantRow>(path)?),
        Source::Engagement => from_engagement(load_rows::<EngagementRow>(path)?, weights),
        Source::Chat => {
            let keyword = keyword.ok_or(Error::MissingKeyword)?;
            entrants_from_chat(load_rows::<ChatMessageRow>(path)?, keyword)
        }
    };
    ensure_unique(&participants)?;
    tracing::info!(
        participants = participants.len(),
        path = %path.display(),
        "loaded participants"
    );
    Ok(participants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::csv::load_data_from_reader;

    fn csv_rows<T: DeserializeOwned>(data: &str) -> Vec<T> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        load_data_from_reader(reader).unwrap()
    }

    #[test]
    fn plain_rows_with_optional_columns() {
        let rows: Vec<ParticipantRow> = csv_rows(
            "user_id,username,weight,excluded\n\
             1,alice,3,\n\
             2,,,x\n\
             3,carol,,0\n",
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].weight, Some(3));
        assert!(rows[1].excluded);

        let participants = eligible(rows);
        assert_eq!(
            participants,
            vec![
                Participant::new("1", "alice").with_weight(3),
                Participant::new("3", "carol"),
            ]
        );
    }

    #[test]
    fn missing_display_name_falls_back_to_id() {
        let rows: Vec<ParticipantRow> = csv_rows("id\nbob\n");
        assert_eq!(eligible(rows), vec![Participant::new("bob", "bob")]);
    }

    #[test]
    fn json_rows() {
        let rows: Vec<ParticipantRow> = serde_json::from_str(
            r#"[{"id": "a", "display_name": "Ann", "weight": 2}, {"id": "b", "excluded": "true"}]"#,
        )
        .unwrap();
        assert_eq!(eligible(rows), vec![Participant::new("a", "Ann").with_weight(2)]);
    }

    #[test]
    fn json_rows_with_boolean_exclusions() {
        let rows: Vec<ParticipantRow> = serde_json::from_str(
            r#"[
                {"id": "a", "excluded": false},
                {"id": "b", "excluded": true},
                {"id": "c", "excluded": 0},
                {"id": "d"}
            ]"#,
        )
        .unwrap();
        let ids: Vec<_> = eligible(rows).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn engagement_scores() {
        let rows: Vec<EngagementRow> = csv_rows(
            "id,username,likes,retweets,replies,quotes\n\
             a,ann,1,1,0,0\n\
             b,ben,0,0,0,0\n\
             c,cid,2,0,1,1\n",
        );
        let participants = from_engagement(rows, &EngagementWeights::default());
        let weights: Vec<_> = participants.iter().map(|p| p.weight).collect();
        assert_eq!(weights, vec![4, 1, 6]);
    }

    #[test]
    fn engagement_score_saturates() {
        let row = EngagementRow {
            id: "whale".into(),
            display_name: String::new(),
            likes: u64::MAX,
            retweets: u64::MAX,
            replies: 0,
            quotes: 0,
        };
        assert_eq!(EngagementWeights::default().tickets(&row), u64::MAX);
    }

    #[test]
    fn chat_keyword_entries_are_deduplicated() {
        let rows: Vec<ChatMessageRow> = csv_rows(
            "user_id,username,content\n\
             7,zed,hello\n\
             8,amy,!Join please\n\
             7,zed,!join\n\
             8,amy,!join again\n",
        );
        assert_eq!(
            entrants_from_chat(rows, "!JOIN"),
            vec![Participant::new("8", "amy"), Participant::new("7", "zed")]
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let participants = vec![
            Participant::new("a", "a"),
            Participant::new("b", "b"),
            Participant::new("a", "again"),
        ];
        assert!(matches!(
            ensure_unique(&participants),
            Err(Error::DuplicateParticipant(id)) if id == "a"
        ));
        assert!(ensure_unique(&participants[..2]).is_ok());
    }

    #[test]
    fn source_names() {
        assert_eq!("Chat".parse::<Source>().unwrap(), Source::Chat);
        assert!(matches!(
            "tiktok".parse::<Source>(),
            Err(Error::UnknownSource(_))
        ));
    }
}
