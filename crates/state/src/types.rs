use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// EIP-2930 access list item.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<H256>,
}

/// A slot whose value now differs from the first value observed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageChange {
    pub address: Address,
    pub key: U256,
    /// `None` when the slot had no known value before the first write.
    #[serde(with = "option_bytes")]
    pub original: Option<Bytes>,
    #[serde(with = "ethsim_common::serde_utils::bytes")]
    pub current: Bytes,
}

/// An account whose balance moved during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceChange {
    pub address: Address,
    pub initial_chain_balance: Option<U256>,
    #[serde(serialize_with = "bigint_decimal")]
    pub delta: BigInt,
}

fn bigint_decimal<S: serde::Serializer>(value: &BigInt, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

mod option_bytes {
    use bytes::Bytes;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<Bytes>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&ethsim_common::to_hex(bytes)),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn access_list_uses_rpc_field_names() {
        let json = r#"{"address":"0x0000000000000000000000000000000000000001","storageKeys":["0x0000000000000000000000000000000000000000000000000000000000000002"]}"#;
        let entry: AccessListEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.address, Address::from_low_u64_be(1));
        assert_eq!(entry.storage_keys, vec![H256::from_low_u64_be(2)]);
    }

    #[test]
    fn changes_serialize_readably() {
        let change = StorageChange {
            address: Address::zero(),
            key: U256::one(),
            original: None,
            current: Bytes::from_static(&[0xff]),
        };
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["original"], serde_json::Value::Null);
        assert_eq!(value["current"], "0xff");

        let balance = BalanceChange {
            address: Address::zero(),
            initial_chain_balance: None,
            delta: BigInt::from(-30),
        };
        assert_eq!(serde_json::to_value(&balance).unwrap()["delta"], "-30");
    }
}
