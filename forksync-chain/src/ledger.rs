use alloy::primitives::Bytes;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use forksync_core::{Address, AssetMetadata, BaseUnits, LedgerKind, ReservePair};
use serde_json::json;
use tracing::debug;

use crate::abi::{self, IERC20, IPair};
use crate::error::{ChainError, ChainResult};
use crate::rpc::{parse_bytes, parse_hash, parse_u256, JsonRpcClient, ReceiptPolicy, TxReceipt};

/// Read-only view of a ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    fn kind(&self) -> LedgerKind;

    /// Current reserve pair of a two-asset pool.
    async fn reserves(&self, pool: Address) -> ChainResult<ReservePair>;

    async fn token_balance(&self, asset: Address, holder: Address) -> ChainResult<BaseUnits>;

    async fn native_balance(&self, holder: Address) -> ChainResult<BaseUnits>;

    async fn asset_metadata(&self, asset: Address) -> ChainResult<AssetMetadata>;
}

/// Sandbox-only write surface. Transactions are sent on behalf of addresses
/// the node has been told to impersonate; callers go through
/// [`crate::ImpersonatedActor`] rather than using this directly.
#[async_trait]
pub trait SandboxLedger: LedgerReader {
    /// Ask the node to accept unsigned transactions from `address`.
    async fn impersonate(&self, address: Address) -> ChainResult<()>;

    /// Execute a call as `from` against the latest state without submitting it.
    /// Empty return data is passed through.
    async fn call_as(&self, from: Address, to: Address, input: Bytes) -> ChainResult<Bytes>;

    /// Submit a call from an impersonated address and wait until it is mined.
    async fn send_as(&self, from: Address, to: Address, input: Bytes) -> ChainResult<TxReceipt>;
}

/// [`LedgerReader`] and [`SandboxLedger`] over an EVM JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct EvmLedger {
    kind: LedgerKind,
    rpc: JsonRpcClient,
    receipts: ReceiptPolicy,
}

impl EvmLedger {
    pub fn new(kind: LedgerKind, rpc: JsonRpcClient) -> Self {
        Self {
            kind,
            rpc,
            receipts: ReceiptPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_receipt_policy(mut self, receipts: ReceiptPolicy) -> Self {
        self.receipts = receipts;
        self
    }

    async fn eth_call(
        &self,
        from: Option<Address>,
        to: Address,
        input: Bytes,
    ) -> ChainResult<Bytes> {
        let mut call = json!({ "to": to.to_string(), "data": input.to_string() });
        if let Some(from) = from {
            call["from"] = json!(from.to_string());
        }
        let raw: String = self.rpc.request("eth_call", json!([call, "latest"])).await?;
        parse_bytes(&raw)
    }

    /// View call that must return data; an empty response means `to` has no code.
    async fn call(&self, to: Address, input: Bytes) -> ChainResult<Bytes> {
        let data = self.eth_call(None, to, input).await?;
        if data.is_empty() {
            return Err(ChainError::Decode(format!("{to} returned no data")));
        }
        Ok(data)
    }
}

#[async_trait]
impl LedgerReader for EvmLedger {
    fn kind(&self) -> LedgerKind {
        self.kind
    }

    async fn reserves(&self, pool: Address) -> ChainResult<ReservePair> {
        let data = self.call(pool, abi::get_reserves()).await?;
        let decoded = IPair::getReservesCall::abi_decode_returns(&data, true)?;
        debug!(
            ledger = %self.kind,
            pool = %pool,
            reserve0 = %decoded.reserve0,
            reserve1 = %decoded.reserve1,
            "fetched reserves"
        );
        Ok(ReservePair::new(decoded.reserve0, decoded.reserve1))
    }

    async fn token_balance(&self, asset: Address, holder: Address) -> ChainResult<BaseUnits> {
        let data = self.call(asset, abi::balance_of(holder)).await?;
        let decoded = IERC20::balanceOfCall::abi_decode_returns(&data, true)?;
        Ok(BaseUnits::new(decoded.balance))
    }

    async fn native_balance(&self, holder: Address) -> ChainResult<BaseUnits> {
        let raw: String = self
            .rpc
            .request("eth_getBalance", json!([holder.to_string(), "latest"]))
            .await?;
        parse_u256(&raw).map(BaseUnits::new)
    }

    async fn asset_metadata(&self, asset: Address) -> ChainResult<AssetMetadata> {
        let decimals = self
            .call(asset, IERC20::decimalsCall {}.abi_encode().into())
            .await?;
        let name = self
            .call(asset, IERC20::nameCall {}.abi_encode().into())
            .await?;
        let symbol = self
            .call(asset, IERC20::symbolCall {}.abi_encode().into())
            .await?;
        Ok(AssetMetadata {
            address: asset,
            decimals: IERC20::decimalsCall::abi_decode_returns(&decimals, true)?.value,
            name: IERC20::nameCall::abi_decode_returns(&name, true)?.value,
            symbol: IERC20::symbolCall::abi_decode_returns(&symbol, true)?.value,
        })
    }
}

#[async_trait]
impl SandboxLedger for EvmLedger {
    async fn impersonate(&self, address: Address) -> ChainResult<()> {
        let _: serde_json::Value = self
            .rpc
            .request("hardhat_impersonateAccount", [address.to_string()])
            .await?;
        debug!(address = %address, "impersonating account on sandbox");
        Ok(())
    }

    async fn call_as(&self, from: Address, to: Address, input: Bytes) -> ChainResult<Bytes> {
        self.eth_call(Some(from), to, input).await
    }

    async fn send_as(&self, from: Address, to: Address, input: Bytes) -> ChainResult<TxReceipt> {
        let raw: String = self
            .rpc
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": from.to_string(),
                    "to": to.to_string(),
                    "data": input.to_string(),
                }]),
            )
            .await?;
        let hash = parse_hash(&raw)?;
        debug!(from = %from, to = %to, tx = %hash, "submitted sandbox transaction");
        self.rpc.wait_for_receipt(hash, &self.receipts).await
    }
}
