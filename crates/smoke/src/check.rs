//! The round-trip check itself.

use anyhow::{ensure, Context, Result};
use tracing::info;
use transit_cipher::{select_encrypted_fields, Client, Record, Transit};

/// Sample record: two sensitive strings, one sensitive non-string that must be
/// ignored, one plain string.
#[derive(Record, Debug, Clone, PartialEq, Eq)]
struct Person {
    #[encrypted]
    name: String,
    #[encrypted]
    address: String,
    #[encrypted]
    age: u32,
    desc: String,
}

impl Person {
    fn sample() -> Self {
        Self {
            name: "John Doe".into(),
            address: "123 Main St".into(),
            age: 30,
            desc: "abc".into(),
        }
    }
}

/// Encrypt then decrypt [`Person::sample`] with `key_name`, checking every
/// field after each step.
pub async fn round_trip<T: Transit>(client: &Client<T>, key_name: &str) -> Result<()> {
    let original = Person::sample();
    let mut person = original.clone();

    client
        .encrypt(&mut person, key_name)
        .await
        .context("encrypt failed")?;
    ensure!(
        person.name != original.name && !person.name.is_empty(),
        "name was not encrypted"
    );
    ensure!(
        person.address != original.address && !person.address.is_empty(),
        "address was not encrypted"
    );
    ensure!(
        person.age == original.age && person.desc == original.desc,
        "non-sensitive fields changed during encryption"
    );
    info!(
        key = key_name,
        fields = select_encrypted_fields::<Person>().len(),
        "record encrypted"
    );

    client
        .decrypt(&mut person, key_name)
        .await
        .context("decrypt failed")?;
    ensure!(person == original, "decrypted record differs from the original");
    info!(key = key_name, "round trip ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use transit_cipher::{LocalTransit, TransportError};

    /// Answers every item with the same unchanged text.
    struct Echo;

    #[async_trait]
    impl Transit for Echo {
        async fn write(&self, _path: &str, body: Value) -> Result<Option<Value>, TransportError> {
            let results: Vec<Value> = body["batch_input"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|item| json!({"reference": item["reference"].clone(), "ciphertext": "John Doe"}))
                .collect();
            Ok(Some(json!({"data": {"batch_results": results}})))
        }
    }

    struct Down;

    #[async_trait]
    impl Transit for Down {
        async fn write(&self, _path: &str, _body: Value) -> Result<Option<Value>, TransportError> {
            Err(TransportError::Request("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn passes_against_local_engine() {
        let client = Client::new(LocalTransit::new());
        round_trip(&client, "my-encryption-key").await.unwrap();
        assert_eq!(client.transit().writes(), 2);
    }

    #[tokio::test]
    async fn fails_when_service_does_not_transform() {
        let err = round_trip(&Client::new(Echo), "k").await.unwrap_err();
        assert!(err.to_string().contains("name was not encrypted"), "{err}");
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let err = round_trip(&Client::new(Down), "k").await.unwrap_err();
        assert!(err.to_string().contains("encrypt failed"), "{err}");
    }
}
