//! Wire-level transaction model
//!
//! A [`Transaction`] wraps the canonical bytes of a [`SignedTransaction`],
//! which in turn wraps the canonical bytes of a [`TransactionBody`]. Both
//! layers are encoded with bincode so the transaction hash is reproducible
//! on every node.

use crate::{
    record::AccountAmount,
    types::{AccountId, ContractId, Functionality, ScheduleId, TokenId, TopicId, TransactionId},
    Error, Result,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Signature over the body bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    /// Prefix of the signing public key
    pub pub_key_prefix: Bytes,
    /// Signature bytes
    pub signature: Bytes,
}

/// Body bytes plus the signatures over them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Canonical bytes of a [`TransactionBody`]
    pub body_bytes: Bytes,
    /// Signatures (empty for synthetic transactions)
    pub sig_map: Vec<SignaturePair>,
}

/// Transaction as it appears in the record stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Canonical bytes of a [`SignedTransaction`]
    pub signed_transaction_bytes: Bytes,
}

impl Transaction {
    /// Wrap an unsigned body, as done for synthetic transactions
    pub fn from_body(body: &TransactionBody) -> Result<Self> {
        Self::from_signed(&SignedTransaction {
            body_bytes: Bytes::from(bincode::serialize(body)?),
            sig_map: Vec::new(),
        })
    }

    /// Wrap a signed transaction
    pub fn from_signed(signed: &SignedTransaction) -> Result<Self> {
        Ok(Self {
            signed_transaction_bytes: Bytes::from(bincode::serialize(signed)?),
        })
    }

    /// Parse the signed transaction
    ///
    /// Empty bytes parse as the default message, as on the wire.
    pub fn signed_transaction(&self) -> Result<SignedTransaction> {
        if self.signed_transaction_bytes.is_empty() {
            return Ok(SignedTransaction::default());
        }
        bincode::deserialize(&self.signed_transaction_bytes)
            .map_err(|e| Error::UnparseableTransaction(e.to_string()))
    }

    /// Parse the transaction body
    pub fn body(&self) -> Result<TransactionBody> {
        let signed = self.signed_transaction()?;
        if signed.body_bytes.is_empty() {
            return Ok(TransactionBody::default());
        }
        bincode::deserialize(&signed.body_bytes)
            .map_err(|e| Error::UnparseableTransaction(e.to_string()))
    }
}

/// Transaction body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// Transaction id
    pub transaction_id: Option<TransactionId>,
    /// Free-form memo
    pub memo: String,
    /// Maximum fee the payer is willing to pay
    pub transaction_fee: u64,
    /// Operation payload
    pub data: TransactionData,
}

impl TransactionBody {
    /// Body with no id and the given payload
    pub fn new(data: TransactionData) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Set the transaction id
    pub fn with_transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Set the memo
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }
}

/// Operation payload of a transaction body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionData {
    /// No payload
    #[default]
    Unset,
    /// Create an account
    CryptoCreateAccount {
        /// Initial balance in tinybars
        initial_balance: u64,
        /// Account alias (EVM address or key alias)
        alias: Bytes,
    },
    /// Transfer value
    CryptoTransfer {
        /// Hbar adjustments
        transfers: Vec<AccountAmount>,
    },
    /// Delete an account
    CryptoDelete {
        /// Account being deleted
        delete_account_id: AccountId,
        /// Beneficiary of the remaining balance
        transfer_account_id: AccountId,
    },
    /// Create a contract
    ContractCreateInstance {
        /// Gas limit
        gas: u64,
        /// Initial balance in tinybars
        initial_balance: u64,
    },
    /// Call a contract
    ContractCall {
        /// Target contract
        contract_id: ContractId,
        /// Gas limit
        gas: u64,
        /// ABI-encoded call data
        function_parameters: Bytes,
    },
    /// Create a token
    TokenCreation {
        /// Token symbol
        symbol: String,
        /// Initial supply
        initial_supply: u64,
    },
    /// Mint supply
    TokenMint {
        /// Token being minted
        token: TokenId,
        /// Fungible amount (0 for NFTs)
        amount: u64,
        /// NFT metadata, one entry per serial
        metadata: Vec<Bytes>,
    },
    /// Airdrop tokens
    TokenAirdrop {
        /// Token being dropped
        token: TokenId,
        /// Recipients
        receivers: Vec<AccountId>,
    },
    /// Create a schedule
    ScheduleCreate {
        /// Memo of the schedule
        memo: String,
    },
    /// Submit a topic message
    ConsensusSubmitMessage {
        /// Target topic
        topic_id: TopicId,
        /// Message payload
        message: Bytes,
    },
    /// Delete a schedule
    ScheduleDelete {
        /// Schedule being deleted
        schedule_id: ScheduleId,
    },
    /// Generate pseudorandom output
    UtilPrng {
        /// Upper bound (0 for 48 random bytes)
        range: i32,
    },
    /// Update node stakes
    NodeStakeUpdate {
        /// Staking period end
        end_of_staking_period: u64,
    },
}

impl TransactionData {
    /// Functionality of this payload
    pub fn kind(&self) -> Functionality {
        match self {
            TransactionData::Unset => Functionality::None,
            TransactionData::CryptoCreateAccount { .. } => Functionality::CryptoCreate,
            TransactionData::CryptoTransfer { .. } => Functionality::CryptoTransfer,
            TransactionData::CryptoDelete { .. } => Functionality::CryptoDelete,
            TransactionData::ContractCreateInstance { .. } => Functionality::ContractCreate,
            TransactionData::ContractCall { .. } => Functionality::ContractCall,
            TransactionData::TokenCreation { .. } => Functionality::TokenCreate,
            TransactionData::TokenMint { .. } => Functionality::TokenMint,
            TransactionData::TokenAirdrop { .. } => Functionality::TokenAirdrop,
            TransactionData::ScheduleCreate { .. } => Functionality::ScheduleCreate,
            TransactionData::ScheduleDelete { .. } => Functionality::ScheduleDelete,
            TransactionData::ConsensusSubmitMessage { .. } => Functionality::ConsensusSubmitMessage,
            TransactionData::UtilPrng { .. } => Functionality::UtilPrng,
            TransactionData::NodeStakeUpdate { .. } => Functionality::NodeStakeUpdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    #[test]
    fn test_body_survives_wrapping() {
        let body = TransactionBody::new(TransactionData::UtilPrng { range: 10 })
            .with_transaction_id(TransactionId::new(AccountId::new(2), Timestamp::new(1, 2)))
            .with_memo("prng");
        let transaction = Transaction::from_body(&body).unwrap();

        assert_eq!(transaction.body().unwrap(), body);
        assert!(transaction.signed_transaction().unwrap().sig_map.is_empty());
    }

    #[test]
    fn test_garbage_bytes_are_unparseable() {
        let transaction = Transaction {
            signed_transaction_bytes: Bytes::from_static(&[0xff, 0x01]),
        };
        let err = transaction.body().unwrap_err();
        assert!(matches!(err, Error::UnparseableTransaction(_)));
    }

    #[test]
    fn test_empty_transaction_is_default_body() {
        assert_eq!(Transaction::default().body().unwrap(), TransactionBody::default());
    }

    #[test]
    fn test_data_kind() {
        let data = TransactionData::ContractCall {
            contract_id: ContractId::new(1),
            gas: 21_000,
            function_parameters: Bytes::new(),
        };
        assert_eq!(data.kind(), Functionality::ContractCall);
        assert_eq!(TransactionData::Unset.kind(), Functionality::None);
    }
}
