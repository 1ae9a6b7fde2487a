//! Serde helpers for the JSON-RPC wire conventions: quantities as minimal
//! hex (`"0x0"` for zero), byte strings as 0x-prefixed lowercase hex of
//! exact length.

use serde::{Deserialize, Deserializer, Serializer, de::Error};

pub mod u64 {
    use super::*;

    pub mod hex_str {
        use super::*;

        pub fn deserialize<'de, D>(d: D) -> Result<u64, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = String::deserialize(d)?;
            let trimmed = value
                .strip_prefix("0x")
                .ok_or_else(|| D::Error::custom("quantity is missing the 0x prefix"))?;
            core::primitive::u64::from_str_radix(trimmed, 16).map_err(|e| D::Error::custom(e.to_string()))
        }

        pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&format!("{value:#x}"))
        }
    }

    pub mod hex_str_opt {
        use super::*;

        pub fn deserialize<'de, D>(d: D) -> Result<Option<u64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Option::<String>::deserialize(d)?;
            match value {
                Some(s) => {
                    let trimmed = s
                        .strip_prefix("0x")
                        .ok_or_else(|| D::Error::custom("quantity is missing the 0x prefix"))?;
                    core::primitive::u64::from_str_radix(trimmed, 16)
                        .map(Some)
                        .map_err(|e| D::Error::custom(e.to_string()))
                }
                None => Ok(None),
            }
        }

        pub fn serialize<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => serializer.serialize_str(&format!("{v:#x}")),
                None => serializer.serialize_none(),
            }
        }
    }
}

pub mod u256 {
    use super::*;
    use ethereum_types::U256;

    pub fn deser_hex_str<'de, D>(d: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        let trimmed = value
            .strip_prefix("0x")
            .ok_or_else(|| D::Error::custom("quantity is missing the 0x prefix"))?;
        U256::from_str_radix(trimmed, 16).map_err(|e| D::Error::custom(e.to_string()))
    }

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub mod hex_str {
        pub use super::{deser_hex_str as deserialize, serialize};
    }
}

pub mod bytes {
    use super::*;
    use ::bytes::Bytes;

    pub fn deserialize<'de, D>(d: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        let trimmed = value
            .strip_prefix("0x")
            .ok_or_else(|| D::Error::custom("byte string is missing the 0x prefix"))?;
        hex::decode(trimmed)
            .map(Bytes::from)
            .map_err(|e| D::Error::custom(e.to_string()))
    }

    pub fn serialize<S>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub mod opt {
        use super::*;

        pub fn deserialize<'de, D>(d: D) -> Result<Option<Bytes>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Option::<String>::deserialize(d)?;
            match value {
                Some(s) => {
                    let trimmed = s
                        .strip_prefix("0x")
                        .ok_or_else(|| D::Error::custom("byte string is missing the 0x prefix"))?;
                    hex::decode(trimmed)
                        .map(|v| Some(Bytes::from(v)))
                        .map_err(|e| D::Error::custom(e.to_string()))
                }
                None => Ok(None),
            }
        }

        pub fn serialize<S>(value: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => serializer.serialize_str(&format!("0x{}", hex::encode(v))),
                None => serializer.serialize_none(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::U256;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::u64::hex_str")]
        n: u64,
        #[serde(with = "super::u256::hex_str")]
        v: U256,
    }

    #[test]
    fn quantities_are_minimal_hex() {
        let w = Wrapper {
            n: 0,
            v: U256::from(0x1a2bu64),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"n":"0x0","v":"0x1a2b"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n, 0);
        assert_eq!(back.v, U256::from(0x1a2bu64));
    }
}
