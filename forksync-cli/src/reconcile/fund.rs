use forksync_chain::{FundingService, LedgerReader};
use forksync_core::{Address, BaseUnits, FundServiceError};
use tracing::{info, warn};

/// Outcome of one funding request. Failures are carried, never raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundResult {
    pub success: bool,
    pub balance_before: Option<BaseUnits>,
    pub balance_after: Option<BaseUnits>,
    pub error: Option<FundServiceError>,
}

/// Credit `amount` base units of `asset` (native when `None`) to `address`.
///
/// The amount goes to the funding service exactly as given; callers holding a
/// human figure convert it once through `DisplayAmount` beforehand.
pub async fn fund<L>(
    ledger: &L,
    faucet: &dyn FundingService,
    address: Address,
    amount: BaseUnits,
    asset: Option<Address>,
) -> FundResult
where
    L: LedgerReader + ?Sized,
{
    let balance_before = read_balance(ledger, address, asset).await;
    match faucet.credit(address, amount, asset).await {
        Ok(()) => {
            let balance_after = read_balance(ledger, address, asset).await;
            info!(
                address = %address,
                asset = %display_asset(asset),
                amount = %amount,
                before = %display_balance(balance_before),
                after = %display_balance(balance_after),
                "funding request applied"
            );
            FundResult {
                success: true,
                balance_before,
                balance_after,
                error: None,
            }
        }
        Err(err) => {
            warn!(
                address = %address,
                asset = %display_asset(asset),
                amount = %amount,
                error = %err,
                "funding request failed"
            );
            FundResult {
                success: false,
                balance_before,
                balance_after: None,
                error: Some(err),
            }
        }
    }
}

async fn read_balance<L>(ledger: &L, holder: Address, asset: Option<Address>) -> Option<BaseUnits>
where
    L: LedgerReader + ?Sized,
{
    let balance = match asset {
        Some(token) => ledger.token_balance(token, holder).await,
        None => ledger.native_balance(holder).await,
    };
    match balance {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                holder = %holder,
                asset = %display_asset(asset),
                error = %err,
                "balance read failed"
            );
            None
        }
    }
}

fn display_asset(asset: Option<Address>) -> String {
    asset.map_or_else(|| "native".to_string(), |token| token.to_string())
}

fn display_balance(balance: Option<BaseUnits>) -> String {
    balance.map_or_else(|| "unknown".to_string(), |value| value.to_string())
}
