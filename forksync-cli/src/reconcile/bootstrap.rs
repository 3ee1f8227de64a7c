use forksync_chain::{LedgerReader, NativeInjector};
use forksync_core::{Address, BaseUnits, BootstrapError, TxHash};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Disabled,
    AlreadyFunded(BaseUnits),
    Injected { tx: TxHash, balance: BaseUnits },
}

/// Make sure `pool` holds native currency, injecting `amount` if it holds none.
pub async fn ensure_native_funds<L>(
    ledger: &L,
    injector: Option<&dyn NativeInjector>,
    pool: Address,
    amount: BaseUnits,
) -> Result<BootstrapOutcome, BootstrapError>
where
    L: LedgerReader + ?Sized,
{
    let balance = native_balance(ledger, pool).await?;
    if !balance.is_zero() {
        debug!(pool = %pool, balance = %balance, "pool already holds native funds");
        return Ok(BootstrapOutcome::AlreadyFunded(balance));
    }
    let injector = injector.ok_or(BootstrapError::MissingSigner)?;
    info!(pool = %pool, amount = %amount, "pool has no native funds; injecting");
    let tx = injector.inject(pool, amount).await?;
    let balance = native_balance(ledger, pool).await?;
    if balance.is_zero() {
        return Err(BootstrapError::NotApplied(pool));
    }
    info!(pool = %pool, balance = %balance, tx = %tx, "native funds injected");
    Ok(BootstrapOutcome::Injected { tx, balance })
}

async fn native_balance<L>(ledger: &L, pool: Address) -> Result<BaseUnits, BootstrapError>
where
    L: LedgerReader + ?Sized,
{
    ledger
        .native_balance(pool)
        .await
        .map_err(|err| BootstrapError::Balance(err.to_string()))
}
