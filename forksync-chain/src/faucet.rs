use async_trait::async_trait;
use forksync_core::{Address, BaseUnits, FundServiceError};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::ChainError;
use crate::rpc::JsonRpcClient;

/// Credits balances on the sandbox ledger.
#[async_trait]
pub trait FundingService: Send + Sync {
    /// Credit `amount` base units of `asset` (native currency when `None`) to `recipient`.
    async fn credit(
        &self,
        recipient: Address,
        amount: BaseUnits,
        asset: Option<Address>,
    ) -> Result<(), FundServiceError>;
}

/// Faucet exposed as custom JSON-RPC methods by BuildBear sandboxes.
#[derive(Clone, Debug)]
pub struct BuildBearFaucet {
    rpc: JsonRpcClient,
}

impl BuildBearFaucet {
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }

    fn request_for(
        recipient: Address,
        amount: BaseUnits,
        asset: Option<Address>,
    ) -> (&'static str, JsonValue) {
        match asset {
            Some(token) => (
                "buildbear_ERC20Faucet",
                json!([{
                    "address": recipient.to_string(),
                    "balance": amount.to_string(),
                    "token": token.to_string(),
                }]),
            ),
            None => (
                "buildbear_nativeFaucet",
                json!([{
                    "address": recipient.to_string(),
                    "balance": amount.to_string(),
                }]),
            ),
        }
    }
}

#[async_trait]
impl FundingService for BuildBearFaucet {
    async fn credit(
        &self,
        recipient: Address,
        amount: BaseUnits,
        asset: Option<Address>,
    ) -> Result<(), FundServiceError> {
        let (method, params) = Self::request_for(recipient, amount, asset);
        debug!(method, recipient = %recipient, amount = %amount, "requesting faucet credit");
        match self.rpc.request::<_, JsonValue>(method, params).await {
            Ok(_) => Ok(()),
            Err(ChainError::Rpc { code, message }) => {
                Err(FundServiceError::Rejected { code, message })
            }
            Err(other) => Err(FundServiceError::Transport(other.to_string())),
        }
    }
}
