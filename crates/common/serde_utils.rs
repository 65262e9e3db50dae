//! Serde adapters for hex-encoded payloads.

pub mod bytes {
    use ::bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&crate::to_hex(value))
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        crate::decode_hex(&value)
            .map(Bytes::from)
            .map_err(|e| D::Error::custom(e.to_string()))
    }
}

pub mod bytes_vec {
    use ::bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};

    pub fn serialize<S>(value: &[Bytes], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(value.len()))?;
        for item in value {
            seq.serialize_element(&crate::to_hex(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec<Bytes>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|s| {
                crate::decode_hex(s)
                    .map(Bytes::from)
                    .map_err(|e| D::Error::custom(e.to_string()))
            })
            .collect()
    }
}
