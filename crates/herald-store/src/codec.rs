//! CBOR encoding of stored values.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Encode `value` as CBOR.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Decode a CBOR value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{Address, Event};
    use herald_ledger::LedgerState;

    #[test]
    fn test_event_survives_encoding() {
        let event = Event::Subscribed {
            channel: Address::from_bytes([1; 20]),
            subscriber: Address::from_bytes([2; 20]),
        };
        let bytes = encode(&event).unwrap();
        assert_eq!(decode::<Event>(&bytes).unwrap(), event);
    }

    #[test]
    fn test_empty_state_survives_encoding() {
        let state = LedgerState::default();
        let bytes = encode(&state).unwrap();
        assert_eq!(decode::<LedgerState>(&bytes).unwrap(), state);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            decode::<Event>(&[0xff, 0x00, 0x13]),
            Err(StoreError::Serialization(_))
        ));
    }
}
