//! Value serialization strategies
//!
//! The engine stores opaque strings. A [`Codec`] turns caller values into
//! those strings and back; it is injected into [`Brine`](crate::Brine) at
//! construction. Codecs may do asynchronous work and are not assumed to be
//! pure, so their output is never cached.

use crate::error::{KvError, KvResult};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serialization strategy for stored values
#[async_trait]
pub trait Codec<T: Send + Sync>: Send + Sync {
    async fn serialize(&self, value: &T) -> KvResult<String>;

    async fn deserialize(&self, raw: &str) -> KvResult<T>;
}

/// Default codec: JSON text via serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[async_trait]
impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn serialize(&self, value: &T) -> KvResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    async fn deserialize(&self, raw: &str) -> KvResult<T> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Stores strings verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

#[async_trait]
impl Codec<String> for RawCodec {
    async fn serialize(&self, value: &String) -> KvResult<String> {
        Ok(value.clone())
    }

    async fn deserialize(&self, raw: &str) -> KvResult<String> {
        Ok(raw.to_string())
    }
}

/// Codec built from a pair of plain functions
pub struct FnCodec<S, D> {
    serialize: S,
    deserialize: D,
}

impl<S, D> FnCodec<S, D> {
    pub fn new(serialize: S, deserialize: D) -> Self {
        Self {
            serialize,
            deserialize,
        }
    }
}

#[async_trait]
impl<T, S, D> Codec<T> for FnCodec<S, D>
where
    T: Send + Sync,
    S: Fn(&T) -> Result<String, String> + Send + Sync,
    D: Fn(&str) -> Result<T, String> + Send + Sync,
{
    async fn serialize(&self, value: &T) -> KvResult<String> {
        (self.serialize)(value).map_err(KvError::Serialization)
    }

    async fn deserialize(&self, raw: &str) -> KvResult<T> {
        (self.deserialize)(raw).map_err(KvError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        hello: String,
    }

    #[tokio::test]
    async fn test_json_codec() {
        let doc = Doc {
            hello: "world".into(),
        };

        let raw = Codec::<Doc>::serialize(&JsonCodec, &doc).await.unwrap();
        assert_eq!(raw, r#"{"hello":"world"}"#);

        let back = Codec::<Doc>::deserialize(&JsonCodec, &raw).await.unwrap();
        assert_eq!(back, doc);

        let err = Codec::<Doc>::deserialize(&JsonCodec, "not json").await;
        assert!(matches!(err, Err(KvError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_fn_codec() {
        let codec = FnCodec::new(
            |v: &u32| -> Result<String, String> { Ok(format!("n={}", v)) },
            |raw: &str| -> Result<u32, String> {
                raw.strip_prefix("n=")
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| format!("bad number {}", raw))
            },
        );

        assert_eq!(Codec::<u32>::serialize(&codec, &7).await.unwrap(), "n=7");
        assert_eq!(Codec::<u32>::deserialize(&codec, "n=7").await.unwrap(), 7);
        assert!(Codec::<u32>::deserialize(&codec, "seven").await.is_err());
    }
}
