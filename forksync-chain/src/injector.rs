use std::sync::Arc;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{hex, Bytes, TxKind};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use forksync_core::{Address, BaseUnits, BootstrapError, TxHash};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{ChainError, ChainResult};
use crate::faucet::FundingService;
use crate::rpc::{parse_hash, parse_u128, parse_u64, JsonRpcClient, ReceiptPolicy};

/// Init code whose constructor self-destructs immediately, forwarding the
/// deployment value to the address passed as its single constructor argument.
const SELF_DESTRUCT_INIT_CODE: [u8; 186] = hex!("60806040526040516100ba3803806100ba8339818101604052810190602391906093565b8073ffffffffffffffffffffffffffffffffffffffff16ff5b5f80fd5b5f73ffffffffffffffffffffffffffffffffffffffff82169050919050565b5f6067826040565b9050919050565b607581605f565b8114607e575f80fd5b50565b5f81519050608d81606e565b92915050565b5f6020828403121560a55760a4603c565b5b5f60b0848285016081565b9150509291505056fe");

const DEPLOY_GAS_LIMIT: u64 = 300_000;

/// Places native currency on an address that cannot accept it through a
/// plain transfer, such as a pool contract without a payable fallback.
#[async_trait]
pub trait NativeInjector: Send + Sync {
    async fn inject(&self, target: Address, amount: BaseUnits) -> Result<TxHash, BootstrapError>;
}

/// Funds an operator wallet from the faucet, then deploys a contract that
/// self-destructs into `target`.
pub struct SelfDestructInjector {
    rpc: JsonRpcClient,
    faucet: Arc<dyn FundingService>,
    signer: PrivateKeySigner,
    receipts: ReceiptPolicy,
}

impl SelfDestructInjector {
    pub fn new(
        rpc: JsonRpcClient,
        faucet: Arc<dyn FundingService>,
        signer: PrivateKeySigner,
    ) -> Self {
        Self {
            rpc,
            faucet,
            signer,
            receipts: ReceiptPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_receipt_policy(mut self, receipts: ReceiptPolicy) -> Self {
        self.receipts = receipts;
        self
    }

    pub fn operator(&self) -> Address {
        self.signer.address()
    }

    async fn deploy(&self, target: Address, amount: BaseUnits) -> ChainResult<TxHash> {
        let operator = self.operator();
        let chain_id: String = self.rpc.request("eth_chainId", json!([])).await?;
        let nonce: String = self
            .rpc
            .request(
                "eth_getTransactionCount",
                json!([operator.to_string(), "pending"]),
            )
            .await?;
        let gas_price: String = self.rpc.request("eth_gasPrice", json!([])).await?;

        let mut tx = TxLegacy {
            chain_id: Some(parse_u64(&chain_id)?),
            nonce: parse_u64(&nonce)?,
            gas_price: parse_u128(&gas_price)?,
            gas_limit: DEPLOY_GAS_LIMIT,
            to: TxKind::Create,
            value: amount.raw(),
            input: deployment_input(target),
        };
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|err| ChainError::Decode(format!("signing failed: {err}")))?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        let raw = hex::encode_prefixed(envelope.encoded_2718());

        let submitted: String = self.rpc.request("eth_sendRawTransaction", [raw]).await?;
        let hash = parse_hash(&submitted)?;
        debug!(operator = %operator, tx = %hash, "submitted self-destruct deployment");
        self.rpc.wait_for_receipt(hash, &self.receipts).await?;
        Ok(hash)
    }
}

#[async_trait]
impl NativeInjector for SelfDestructInjector {
    async fn inject(&self, target: Address, amount: BaseUnits) -> Result<TxHash, BootstrapError> {
        let operator = self.operator();
        info!(operator = %operator, amount = %amount, "crediting operator with native currency");
        self.faucet.credit(operator, amount, None).await?;
        let hash = self
            .deploy(target, amount)
            .await
            .map_err(|err| BootstrapError::Deploy(err.to_string()))?;
        info!(target = %target, tx = %hash, "forced native currency into target");
        Ok(hash)
    }
}

fn deployment_input(target: Address) -> Bytes {
    let mut code = SELF_DESTRUCT_INIT_CODE.to_vec();
    code.extend_from_slice(&target.abi_encode());
    code.into()
}
