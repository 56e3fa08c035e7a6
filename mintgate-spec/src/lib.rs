use serde::{Deserialize, Serialize};

/// Whitelist snapshot document: two parallel sequences, one allowance per
/// address. Semantic validation (lengths, duplicates, zero allowances) is the
/// consumer's job; this crate only parses.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SnapshotFile {
    pub addresses: Vec<String>,
    pub allowances: Vec<u64>,
}

/// Optional sale parameter overrides.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SaleParamsFile {
    /// Flat price per token in wei (fits a TOML integer)
    pub unit_price_wei: Option<u64>,
    /// Global mint cap
    pub supply_cap: Option<u64>,
    /// Per-wallet cap on the public path
    pub wallet_cap: Option<u64>,
}

impl Default for SaleParamsFile {
    fn default() -> Self {
        Self { unit_price_wei: None, supply_cap: None, wallet_cap: None }
    }
}

/// Parse a whitelist snapshot from TOML text
pub fn load_snapshot_toml(input: &str) -> Result<SnapshotFile, toml::de::Error> {
    toml::from_str::<SnapshotFile>(input)
}

/// Parse sale parameter overrides from TOML text
pub fn load_sale_params_toml(input: &str) -> Result<SaleParamsFile, toml::de::Error> {
    toml::from_str::<SaleParamsFile>(input)
}
