use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hearth_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use secp256k1::{
    Message, SECP256K1,
    ecdsa::{RecoverableSignature, RecoveryId},
};
use thiserror::Error;

use crate::keccak::keccak;

/// Destination of a transaction: a call to an existing account or the
/// creation of a new contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

impl TxKind {
    pub fn to(&self) -> Option<Address> {
        match self {
            TxKind::Call(address) => Some(*address),
            TxKind::Create => None,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, TxKind::Create)
    }
}

impl From<Option<Address>> for TxKind {
    fn from(to: Option<Address>) -> Self {
        match to {
            Some(address) => TxKind::Call(address),
            None => TxKind::Create,
        }
    }
}

// A create destination encodes as the empty byte string, as in the
// canonical transaction format.
impl RLPEncode for TxKind {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            TxKind::Call(address) => address.encode(buf),
            TxKind::Create => Bytes::new().encode(buf),
        }
    }
}

impl RLPDecode for TxKind {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest): (Bytes, _) = RLPDecode::decode_unfinished(rlp)?;
        match bytes.len() {
            0 => Ok((TxKind::Create, rest)),
            20 => Ok((TxKind::Call(Address::from_slice(&bytes)), rest)),
            _ => Err(RLPDecodeError::InvalidLength),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("transaction has neither a sender nor a signature")]
    Missing,
    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

/// A transaction as submitted to the node.
///
/// `from` and `nonce` may be absent on submission; the processor resolves
/// the sender (recovering it from the signature when needed) and fills the
/// nonce from the account before execution, so stored transactions always
/// carry both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub from: Option<Address>,
    pub to: TxKind,
    pub nonce: Option<u64>,
    pub gas: u64,
    pub gas_price: u64,
    pub value: U256,
    pub data: Bytes,
    /// 65-byte r || s || v recoverable signature, when submitted signed.
    pub signature: Option<Bytes>,
}

impl Transaction {
    /// Hash of the canonical encoding. Meaningful once `from` and `nonce`
    /// are filled in; the processor guarantees both before hashing.
    pub fn compute_hash(&self) -> H256 {
        keccak(self.encode_to_vec())
    }

    /// The payload a signer commits to: everything except the sender
    /// (which the signature itself determines) and the signature.
    pub fn signing_payload(&self) -> H256 {
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_field(&self.nonce.unwrap_or_default())
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .finish();
        keccak(buf)
    }

    /// Resolves the sender: an explicit `from` wins, otherwise the signer
    /// is recovered from the attached signature.
    pub fn recover_sender(&self) -> Result<Address, SignatureError> {
        if let Some(from) = self.from {
            return Ok(from);
        }
        let signature = self.signature.as_ref().ok_or(SignatureError::Missing)?;
        if signature.len() != 65 {
            return Err(SignatureError::Recovery(format!(
                "expected 65 signature bytes, got {}",
                signature.len()
            )));
        }
        // v may be 0/1 or 27/28
        let v = signature[64];
        let recovery_id = RecoveryId::from_i32(i32::from(v.checked_sub(27).unwrap_or(v)))
            .map_err(|e| SignatureError::Recovery(e.to_string()))?;
        let signature = RecoverableSignature::from_compact(&signature[..64], recovery_id)
            .map_err(|e| SignatureError::Recovery(e.to_string()))?;
        let message = Message::from_digest(self.signing_payload().0);
        let public_key = SECP256K1
            .recover_ecdsa(&message, &signature)
            .map_err(|e| SignatureError::Recovery(e.to_string()))?;
        // address = last 20 bytes of keccak(uncompressed pubkey without the 0x04 tag)
        let hash = keccak(&public_key.serialize_uncompressed()[1..]);
        Ok(Address::from_slice(&hash.as_bytes()[12..]))
    }
}

impl RLPEncode for Transaction {
    fn encode(&self, buf: &mut Vec<u8>) {
        Encoder::new(buf)
            .encode_field(&self.from.unwrap_or_default())
            .encode_field(&self.to)
            .encode_field(&self.nonce.unwrap_or_default())
            .encode_field(&self.gas)
            .encode_field(&self.gas_price)
            .encode_field(&self.value)
            .encode_bytes(&self.data)
            .encode_bytes(self.signature.as_deref().unwrap_or_default())
            .finish();
    }
}

impl RLPDecode for Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (from, decoder): (Address, _) = decoder.decode_field("from")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder): (Bytes, _) = decoder.decode_field("data")?;
        let (signature, decoder): (Bytes, _) = decoder.decode_field("signature")?;
        Ok((
            Self {
                from: Some(from),
                to,
                nonce: Some(nonce),
                gas,
                gas_price,
                value,
                data,
                signature: (!signature.is_empty()).then_some(signature),
            },
            decoder.finish()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_rlp_roundtrip() {
        let tx = Transaction {
            from: Some(Address::repeat_byte(0x11)),
            to: TxKind::Call(Address::repeat_byte(0x22)),
            nonce: Some(7),
            gas: 1_000_000,
            gas_price: 50_000,
            value: U256::from(123u64),
            data: Bytes::from_static(&[0xde, 0xad]),
            signature: None,
        };
        let encoded = tx.encode_to_vec();
        assert_eq!(Transaction::decode(&encoded).unwrap(), tx);
    }

    #[test]
    fn create_kind_encodes_as_empty_string() {
        let mut buf = Vec::new();
        TxKind::Create.encode(&mut buf);
        assert_eq!(buf, vec![0x80]);
    }

    #[test]
    fn hash_distinguishes_nonce() {
        let mut tx = Transaction {
            from: Some(Address::repeat_byte(1)),
            nonce: Some(0),
            ..Default::default()
        };
        let h0 = tx.compute_hash();
        tx.nonce = Some(1);
        assert_ne!(h0, tx.compute_hash());
    }

    #[test]
    fn explicit_from_wins_over_signature() {
        let tx = Transaction {
            from: Some(Address::repeat_byte(3)),
            ..Default::default()
        };
        assert_eq!(tx.recover_sender().unwrap(), Address::repeat_byte(3));
    }

    #[test]
    fn missing_sender_and_signature_is_an_error() {
        let tx = Transaction::default();
        assert_eq!(tx.recover_sender(), Err(SignatureError::Missing));
    }

    #[test]
    fn recovers_signer_of_known_key() {
        use secp256k1::SecretKey;

        let sk = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let public_key = sk.public_key(SECP256K1);
        let hash = keccak(&public_key.serialize_uncompressed()[1..]);
        let expected = Address::from_slice(&hash.as_bytes()[12..]);

        let mut tx = Transaction {
            to: TxKind::Call(Address::repeat_byte(9)),
            nonce: Some(1),
            gas: 21_000,
            gas_price: 50_000,
            ..Default::default()
        };
        let message = Message::from_digest(tx.signing_payload().0);
        let signature = SECP256K1.sign_ecdsa_recoverable(&message, &sk);
        let (rec_id, compact) = signature.serialize_compact();
        let mut raw = compact.to_vec();
        raw.push(rec_id.to_i32() as u8);
        tx.signature = Some(Bytes::from(raw));

        assert_eq!(tx.recover_sender().unwrap(), expected);
    }
}
