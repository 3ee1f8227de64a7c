use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::Bytes;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use forksync_chain::abi::{IERC20, IPair};
use forksync_chain::{ChainError, ChainResult, LedgerReader, SandboxLedger, TxReceipt};
use forksync_core::{Address, AssetMetadata, BaseUnits, LedgerKind, ReservePair, TxHash};
use parking_lot::Mutex;
use tracing::debug;

/// Transaction recorded by [`MockLedger::send_as`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentCall {
    pub from: Address,
    pub to: Address,
    pub selector: [u8; 4],
    pub input: Bytes,
    pub reverted: bool,
}

#[derive(Default)]
struct MockState {
    reserves: HashMap<Address, ReservePair>,
    pair_tokens: HashMap<Address, [Address; 2]>,
    balances: HashMap<(Address, Address), BaseUnits>,
    native: HashMap<Address, BaseUnits>,
    metadata: HashMap<Address, AssetMetadata>,
    impersonated: HashSet<Address>,
    failing_selectors: HashSet<[u8; 4]>,
    false_selectors: HashSet<[u8; 4]>,
    refuse_impersonation: bool,
    unreachable: bool,
    sent: Vec<SentCall>,
    reserve_reads: usize,
    next_tx: u64,
}

impl MockState {
    fn balance(&self, token: Address, holder: Address) -> BaseUnits {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or(BaseUnits::ZERO)
    }

    fn set_balance(&mut self, token: Address, holder: Address, amount: BaseUnits) {
        self.balances.insert((token, holder), amount);
    }

    fn selector(input: &[u8]) -> [u8; 4] {
        let mut selector = [0u8; 4];
        if let Some(prefix) = input.get(..4) {
            selector.copy_from_slice(prefix);
        }
        selector
    }

    fn next_hash(&mut self) -> TxHash {
        self.next_tx += 1;
        TxHash::left_padding_from(&self.next_tx.to_be_bytes())
    }

    /// Apply a call the way a Uniswap V2 pair and a plain ERC-20 would.
    /// Returns `false` when the call reverts.
    fn execute(&mut self, from: Address, to: Address, input: &[u8]) -> bool {
        let Some(selector) = input.get(..4) else {
            return false;
        };
        if selector == IERC20::approveCall::SELECTOR {
            return IERC20::approveCall::abi_decode(input, true).is_ok();
        }
        if selector == IERC20::transferCall::SELECTOR {
            let Ok(call) = IERC20::transferCall::abi_decode(input, true) else {
                return false;
            };
            let amount = BaseUnits::new(call.amount);
            let held = self.balance(to, from);
            if held < amount {
                return false;
            }
            self.set_balance(to, from, held.saturating_sub(amount));
            let credited = self.balance(to, call.to);
            match credited.checked_add(amount) {
                Some(total) => self.set_balance(to, call.to, total),
                None => return false,
            }
            return true;
        }
        if selector == IPair::syncCall::SELECTOR {
            let Some([token0, token1]) = self.pair_tokens.get(&to).copied() else {
                return false;
            };
            let synced = ReservePair::new(self.balance(token0, to), self.balance(token1, to));
            self.reserves.insert(to, synced);
            return true;
        }
        if selector == IPair::skimCall::SELECTOR {
            let Ok(call) = IPair::skimCall::abi_decode(input, true) else {
                return false;
            };
            let Some(tokens) = self.pair_tokens.get(&to).copied() else {
                return false;
            };
            let reserves = self.reserves.get(&to).copied().unwrap_or_default();
            let mut surplus = [BaseUnits::ZERO; 2];
            for (index, token) in tokens.iter().enumerate() {
                let balance = self.balance(*token, to);
                let reserve = [reserves.asset0(), reserves.asset1()][index];
                // Underflow reverts on chain.
                if balance < reserve {
                    return false;
                }
                surplus[index] = balance.saturating_sub(reserve);
            }
            for (index, token) in tokens.iter().enumerate() {
                let balance = self.balance(*token, to);
                self.set_balance(*token, to, balance.saturating_sub(surplus[index]));
                let received = self.balance(*token, call.to);
                let total = received.checked_add(surplus[index]).unwrap_or(received);
                self.set_balance(*token, call.to, total);
            }
            return true;
        }
        false
    }
}

/// In-memory ledger that behaves like a pair contract plus its two tokens.
///
/// Clones share state so a test can keep a handle while the engine owns
/// another.
#[derive(Clone)]
pub struct MockLedger {
    kind: LedgerKind,
    state: Arc<Mutex<MockState>>,
}

impl MockLedger {
    pub fn new(kind: LedgerKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Register a pool whose token balances equal its reserves.
    #[must_use]
    pub fn with_pool(
        self,
        pool: Address,
        asset0: Address,
        asset1: Address,
        reserves: ReservePair,
    ) -> Self {
        {
            let mut state = self.state.lock();
            state.pair_tokens.insert(pool, [asset0, asset1]);
            state.reserves.insert(pool, reserves);
            state.set_balance(asset0, pool, reserves.asset0());
            state.set_balance(asset1, pool, reserves.asset1());
        }
        self
    }

    #[must_use]
    pub fn with_native(self, holder: Address, amount: impl Into<BaseUnits>) -> Self {
        self.set_native(holder, amount.into());
        self
    }

    #[must_use]
    pub fn with_metadata(self, metadata: AssetMetadata) -> Self {
        self.state.lock().metadata.insert(metadata.address, metadata);
        self
    }

    /// Stored reserves, as `getReserves` would report them.
    pub fn reserves_of(&self, pool: Address) -> Option<ReservePair> {
        self.state.lock().reserves.get(&pool).copied()
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> BaseUnits {
        self.state.lock().balance(token, holder)
    }

    pub fn native_of(&self, holder: Address) -> BaseUnits {
        self.state
            .lock()
            .native
            .get(&holder)
            .copied()
            .unwrap_or(BaseUnits::ZERO)
    }

    pub fn set_native(&self, holder: Address, amount: BaseUnits) {
        self.state.lock().native.insert(holder, amount);
    }

    pub fn add_native(&self, holder: Address, amount: BaseUnits) {
        let mut state = self.state.lock();
        let current = state.native.get(&holder).copied().unwrap_or(BaseUnits::ZERO);
        let total = current.checked_add(amount).unwrap_or(current);
        state.native.insert(holder, total);
    }

    /// Add to a token balance without touching reserves.
    pub fn credit(&self, token: Address, holder: Address, amount: BaseUnits) {
        let mut state = self.state.lock();
        let current = state.balance(token, holder);
        let total = current.checked_add(amount).unwrap_or(current);
        state.set_balance(token, holder, total);
    }

    /// Make every call with `selector` revert.
    pub fn fail_selector(&self, selector: [u8; 4]) {
        self.state.lock().failing_selectors.insert(selector);
    }

    /// Make simulated calls with `selector` return `false` instead of reverting,
    /// like a token that reports failure through its return value.
    pub fn return_false(&self, selector: [u8; 4]) {
        self.state.lock().false_selectors.insert(selector);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    pub fn refuse_impersonation(&self) {
        self.state.lock().refuse_impersonation = true;
    }

    pub fn sent_calls(&self) -> Vec<SentCall> {
        self.state.lock().sent.clone()
    }

    /// Number of sent calls (reverted or not) with `selector`.
    pub fn calls_with(&self, selector: [u8; 4]) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|call| call.selector == selector)
            .count()
    }

    pub fn reserve_reads(&self) -> usize {
        self.state.lock().reserve_reads
    }

    fn ensure_reachable(&self) -> ChainResult<()> {
        if self.state.lock().unreachable {
            return Err(ChainError::Transport(format!(
                "{} ledger connection refused",
                self.kind
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    fn kind(&self) -> LedgerKind {
        self.kind
    }

    async fn reserves(&self, pool: Address) -> ChainResult<ReservePair> {
        self.ensure_reachable()?;
        let mut state = self.state.lock();
        state.reserve_reads += 1;
        state
            .reserves
            .get(&pool)
            .copied()
            .ok_or_else(|| ChainError::Decode(format!("{pool} returned no data")))
    }

    async fn token_balance(&self, asset: Address, holder: Address) -> ChainResult<BaseUnits> {
        self.ensure_reachable()?;
        Ok(self.balance_of(asset, holder))
    }

    async fn native_balance(&self, holder: Address) -> ChainResult<BaseUnits> {
        self.ensure_reachable()?;
        Ok(self.native_of(holder))
    }

    async fn asset_metadata(&self, asset: Address) -> ChainResult<AssetMetadata> {
        self.ensure_reachable()?;
        self.state
            .lock()
            .metadata
            .get(&asset)
            .cloned()
            .ok_or_else(|| ChainError::Decode(format!("{asset} returned no data")))
    }
}

#[async_trait]
impl SandboxLedger for MockLedger {
    async fn impersonate(&self, address: Address) -> ChainResult<()> {
        self.ensure_reachable()?;
        let mut state = self.state.lock();
        if state.refuse_impersonation {
            return Err(ChainError::Rpc {
                code: -32601,
                message: "method hardhat_impersonateAccount not found".into(),
            });
        }
        state.impersonated.insert(address);
        Ok(())
    }

    async fn call_as(&self, _from: Address, _to: Address, input: Bytes) -> ChainResult<Bytes> {
        self.ensure_reachable()?;
        let returns_false = self
            .state
            .lock()
            .false_selectors
            .contains(&MockState::selector(&input));
        Ok((!returns_false).abi_encode().into())
    }

    async fn send_as(&self, from: Address, to: Address, input: Bytes) -> ChainResult<TxReceipt> {
        self.ensure_reachable()?;
        let mut state = self.state.lock();
        if !state.impersonated.contains(&from) {
            return Err(ChainError::NotImpersonated(from));
        }
        let selector = MockState::selector(&input);
        let hash = state.next_hash();
        let applied =
            !state.failing_selectors.contains(&selector) && state.execute(from, to, &input);
        state.sent.push(SentCall {
            from,
            to,
            selector,
            input,
            reverted: !applied,
        });
        debug!(from = %from, to = %to, tx = %hash, applied, "mock transaction");
        if applied {
            Ok(TxReceipt {
                hash,
                block_number: Some(state.next_tx),
            })
        } else {
            Err(ChainError::Reverted(hash))
        }
    }
}
