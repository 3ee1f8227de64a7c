use std::collections::HashMap;

use forksync_chain::LedgerReader;
use forksync_core::{Address, AssetMetadata, AssetSlot, BaseUnits, PoolIdentity};
use tracing::{debug, warn};

/// Asset metadata resolved for log output only.
#[derive(Clone, Debug, Default)]
pub struct MetadataBook {
    entries: HashMap<Address, AssetMetadata>,
}

impl MetadataBook {
    /// Look up both pool assets. Failures are logged and leave the asset out.
    pub async fn resolve<L>(ledger: &L, identity: &PoolIdentity) -> Self
    where
        L: LedgerReader + ?Sized,
    {
        let mut entries = HashMap::new();
        for slot in AssetSlot::ALL {
            let asset = identity.asset(slot);
            match ledger.asset_metadata(asset).await {
                Ok(metadata) => {
                    debug!(
                        slot = %slot,
                        asset = %asset,
                        symbol = %metadata.symbol,
                        decimals = metadata.decimals,
                        "resolved asset metadata"
                    );
                    entries.insert(asset, metadata);
                }
                Err(err) => warn!(
                    slot = %slot,
                    asset = %asset,
                    error = %err,
                    "asset metadata unavailable; amounts will be logged in base units"
                ),
            }
        }
        Self { entries }
    }

    pub fn get(&self, asset: Address) -> Option<&AssetMetadata> {
        self.entries.get(&asset)
    }

    pub fn describe(&self, asset: Address, amount: BaseUnits) -> String {
        match self.get(asset) {
            Some(metadata) => metadata.describe(amount),
            None => format!("{amount} base units of {asset}"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetMetadata> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forksync_core::LedgerKind;
    use forksync_test_utils::{pool_identity, MockLedger, ASSET0, ASSET1};

    #[tokio::test]
    async fn falls_back_to_base_units_when_lookup_fails() {
        let ledger = MockLedger::new(LedgerKind::Sandbox).with_metadata(AssetMetadata {
            address: ASSET0,
            decimals: 6,
            name: "USD Coin".into(),
            symbol: "USDC".into(),
        });
        let book = MetadataBook::resolve(&ledger, &pool_identity()).await;
        assert_eq!(
            book.describe(ASSET0, BaseUnits::from(1_500_000u64)),
            "1.5 USDC"
        );
        assert_eq!(
            book.describe(ASSET1, BaseUnits::from(7u64)),
            format!("7 base units of {ASSET1}")
        );
    }
}
