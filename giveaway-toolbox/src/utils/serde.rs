use serde::{Deserialize, Deserializer};

pub fn deserialize_truthy_falsy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    // csv hands `true`/`1` cells over as bool/number, json may use real booleans
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TruthyFalsy {
        Bool(bool),
        Int(i64),
        String(String),
    }

    Ok(match TruthyFalsy::deserialize(deserializer)? {
        TruthyFalsy::Bool(value) => value,
        TruthyFalsy::Int(value) => value == 1,
        TruthyFalsy::String(value) => matches!(
            value.trim().to_lowercase().as_ref(),
            "x" | "1" | "true" | "yes"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{BoolDeserializer, Error, StrDeserializer, U64Deserializer};
    use serde::de::IntoDeserializer;

    fn parse(value: &str) -> bool {
        let deserializer: StrDeserializer<Error> = value.into_deserializer();
        deserialize_truthy_falsy(deserializer).unwrap()
    }

    #[test]
    fn truthy_values() {
        for value in ["x", "X", "1", "true", "TRUE", " yes "] {
            assert!(parse(value), "{value} should be truthy");
        }
        for value in ["", "0", "false", "no", "banned"] {
            assert!(!parse(value), "{value} should be falsy");
        }
    }

    #[test]
    fn booleans_and_numbers() {
        let deserializer: BoolDeserializer<Error> = true.into_deserializer();
        assert!(deserialize_truthy_falsy(deserializer).unwrap());
        let deserializer: BoolDeserializer<Error> = false.into_deserializer();
        assert!(!deserialize_truthy_falsy(deserializer).unwrap());
        let deserializer: U64Deserializer<Error> = 1u64.into_deserializer();
        assert!(deserialize_truthy_falsy(deserializer).unwrap());
        let deserializer: U64Deserializer<Error> = 0u64.into_deserializer();
        assert!(!deserialize_truthy_falsy(deserializer).unwrap());
    }
}
