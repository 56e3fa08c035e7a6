//! Boundary of the external sale contract: the error conditions, receipts and
//! configuration surface its clients observe, plus an in-memory double
//! (`MockSale`) for exercising the whitelist protocol end to end. The real
//! contract's pricing tiers and storage are not modeled here.

use std::collections::BTreeMap;

use mintgate_hash::Digest;
use mintgate_whitelist::{Address, MembershipProof};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaleError {
    #[error("sale is not active")]
    SaleNotActive,
    #[error("whitelist is still open")]
    WhitelistOpen,
    #[error("whitelist ended")]
    WhitelistEnded,
    #[error("not whitelisted")]
    NotWhitelisted,
    #[error("can't mint that amount")]
    MintCapExceeded,
    #[error("not enough ether supplied")]
    InsufficientPayment,
    #[error("sold out")]
    SoldOut,
    #[error("caller is not the owner")]
    NotOwner,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SaleParams {
    /// Flat price per token in wei.
    pub unit_price_wei: u128,
    /// Global mint cap across all buyers.
    pub supply_cap: u64,
    /// Per-wallet cap on the public (non-whitelisted) path.
    pub wallet_cap: u64,
}

impl Default for SaleParams {
    fn default() -> Self {
        Self {
            unit_price_wei: 50_000_000_000_000_000, // 0.05 ether
            supply_cap: 9917,
            wallet_cap: 5,
        }
    }
}

impl SaleParams {
    /// Defaults with any file-provided overrides applied on top.
    pub fn with_overrides(file: &mintgate_spec::SaleParamsFile) -> Self {
        let base = Self::default();
        Self {
            unit_price_wei: file
                .unit_price_wei
                .map(u128::from)
                .unwrap_or(base.unit_price_wei),
            supply_cap: file.supply_cap.unwrap_or(base.supply_cap),
            wallet_cap: file.wallet_cap.unwrap_or(base.wallet_cap),
        }
    }
}

/// Outcome of a capped purchase. A request that exceeds the remaining supply
/// fills partially and refunds the unused payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub minted: u64,
    pub charged_wei: u128,
    pub refunded_wei: u128,
}

/// In-memory double of the sale contract. Mint quantities, caps, payment and
/// whitelist gating behave as the contract's clients observe them; everything
/// else is plain state.
#[derive(Clone, Debug)]
pub struct MockSale {
    params: SaleParams,
    owner: Address,
    sale_active: bool,
    block: u64,
    whitelist_end_block: u64,
    whitelist_root: Option<Digest>,
    minted_total: u64,
    minted_by: BTreeMap<Address, u64>,
    balance_wei: u128,
}

impl MockSale {
    pub fn new(owner: Address, params: SaleParams) -> Self {
        Self {
            params,
            owner,
            sale_active: false,
            block: 0,
            whitelist_end_block: 0,
            whitelist_root: None,
            minted_total: 0,
            minted_by: BTreeMap::new(),
            balance_wei: 0,
        }
    }

    pub fn quote(&self, quantity: u64) -> u128 {
        self.params.unit_price_wei * quantity as u128
    }

    pub fn minted_total(&self) -> u64 {
        self.minted_total
    }

    pub fn minted_by(&self, addr: &Address) -> u64 {
        self.minted_by.get(addr).copied().unwrap_or(0)
    }

    pub fn balance_wei(&self) -> u128 {
        self.balance_wei
    }

    pub fn whitelist_root(&self) -> Option<Digest> {
        self.whitelist_root
    }

    pub fn current_block(&self) -> u64 {
        self.block
    }

    pub fn advance_blocks(&mut self, n: u64) {
        self.block += n;
    }

    pub fn trigger_sale(&mut self, caller: &Address, active: bool) -> Result<(), SaleError> {
        self.only_owner(caller)?;
        self.sale_active = active;
        Ok(())
    }

    /// Publish a fresh whitelist root. Proofs generated for an older root
    /// stop verifying from this point on.
    pub fn set_whitelist_root(&mut self, caller: &Address, root: Digest) -> Result<(), SaleError> {
        self.only_owner(caller)?;
        self.whitelist_root = Some(root);
        Ok(())
    }

    pub fn set_whitelist_end_block(&mut self, caller: &Address, block: u64) -> Result<(), SaleError> {
        self.only_owner(caller)?;
        self.whitelist_end_block = block;
        Ok(())
    }

    /// Public mint path, open once the whitelist window has closed.
    pub fn mint(&mut self, buyer: &Address, quantity: u64, value_wei: u128) -> Result<MintReceipt, SaleError> {
        if !self.sale_active {
            return Err(SaleError::SaleNotActive);
        }
        if self.block <= self.whitelist_end_block {
            return Err(SaleError::WhitelistOpen);
        }
        self.fill(buyer, quantity, self.params.wallet_cap, value_wei)
    }

    /// Whitelisted mint path, open while the window is. The proof must bind
    /// `buyer` to `allowance` under the published root; the proven allowance
    /// is the buyer's cap.
    pub fn mint_whitelisted(
        &mut self,
        buyer: &Address,
        quantity: u64,
        allowance: u64,
        proof: &MembershipProof,
        value_wei: u128,
    ) -> Result<MintReceipt, SaleError> {
        if !self.sale_active {
            return Err(SaleError::SaleNotActive);
        }
        if self.block > self.whitelist_end_block {
            return Err(SaleError::WhitelistEnded);
        }
        let root = self.whitelist_root.ok_or(SaleError::NotWhitelisted)?;
        if !proof.verify(&root, buyer, allowance) {
            return Err(SaleError::NotWhitelisted);
        }
        self.fill(buyer, quantity, allowance, value_wei)
    }

    /// Owner-only drain of the collected payments.
    pub fn withdraw(&mut self, caller: &Address) -> Result<u128, SaleError> {
        self.only_owner(caller)?;
        Ok(std::mem::take(&mut self.balance_wei))
    }

    fn only_owner(&self, caller: &Address) -> Result<(), SaleError> {
        if *caller != self.owner {
            return Err(SaleError::NotOwner);
        }
        Ok(())
    }

    fn fill(&mut self, buyer: &Address, quantity: u64, wallet_cap: u64, value_wei: u128) -> Result<MintReceipt, SaleError> {
        let already = self.minted_by(buyer);
        let wallet_remaining = wallet_cap.saturating_sub(already);
        if quantity == 0 || wallet_remaining == 0 {
            return Err(SaleError::MintCapExceeded);
        }
        let supply_remaining = self.params.supply_cap - self.minted_total;
        if supply_remaining == 0 {
            return Err(SaleError::SoldOut);
        }
        let minted = quantity.min(wallet_remaining).min(supply_remaining);
        let charged = self.quote(minted);
        if value_wei < charged {
            return Err(SaleError::InsufficientPayment);
        }

        self.minted_total += minted;
        *self.minted_by.entry(*buyer).or_insert(0) += minted;
        self.balance_wei += charged;

        Ok(MintReceipt {
            minted,
            charged_wei: charged,
            refunded_wei: value_wei - charged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintgate_hash::ADDRESS_LEN;
    use mintgate_whitelist::{Commitment, Whitelist};

    fn addr(i: u8) -> Address {
        Address([i; ADDRESS_LEN])
    }

    const OWNER: u8 = 1;

    fn open_sale(params: SaleParams) -> MockSale {
        let owner = addr(OWNER);
        let mut sale = MockSale::new(owner, params);
        // Window already over: public sale from block 1 on
        sale.set_whitelist_end_block(&owner, 0).unwrap();
        sale.trigger_sale(&owner, true).unwrap();
        sale.advance_blocks(1);
        sale
    }

    fn whitelist_sale(pairs: &[(u8, u64)]) -> (MockSale, Commitment) {
        let owner = addr(OWNER);
        let addresses: Vec<Address> = pairs.iter().map(|&(i, _)| addr(i)).collect();
        let allowances: Vec<u64> = pairs.iter().map(|&(_, n)| n).collect();
        let wl = Whitelist::from_pairs(&addresses, &allowances).unwrap();
        let commitment = Commitment::build(&wl);

        let mut sale = MockSale::new(owner, SaleParams::default());
        sale.set_whitelist_end_block(&owner, 100).unwrap();
        sale.set_whitelist_root(&owner, commitment.root()).unwrap();
        sale.trigger_sale(&owner, true).unwrap();
        (sale, commitment)
    }

    #[test]
    fn mints_five_and_keeps_only_the_charge() {
        let mut sale = open_sale(SaleParams::default());
        let buyer = addr(2);
        let price = sale.quote(5);

        let receipt = sale.mint(&buyer, 5, price * 1000).unwrap();
        assert_eq!(receipt.minted, 5);
        assert_eq!(receipt.charged_wei, price);
        assert_eq!(receipt.refunded_wei, price * 999);
        assert_eq!(sale.minted_total(), 5);
        assert_eq!(sale.minted_by(&buyer), 5);
        assert_eq!(sale.balance_wei(), price);
    }

    #[test]
    fn rejects_minting_past_the_wallet_cap() {
        let mut sale = open_sale(SaleParams::default());
        let buyer = addr(2);
        let price = sale.quote(5);

        sale.mint(&buyer, 5, price).unwrap();
        assert_eq!(
            sale.mint(&buyer, 1, price),
            Err(SaleError::MintCapExceeded)
        );
        assert_eq!(sale.mint(&buyer, 0, price), Err(SaleError::MintCapExceeded));
    }

    #[test]
    fn rejects_underpayment() {
        let mut sale = open_sale(SaleParams::default());
        let price = sale.quote(5);
        assert_eq!(
            sale.mint(&addr(2), 5, price / 2),
            Err(SaleError::InsufficientPayment)
        );
        assert_eq!(sale.minted_total(), 0);
    }

    #[test]
    fn second_purchase_fills_up_to_the_cap() {
        let mut sale = open_sale(SaleParams::default());
        let buyer = addr(2);
        let price3 = sale.quote(3);

        assert_eq!(sale.mint(&buyer, 3, price3).unwrap().minted, 3);

        // Only 2 of 3 fit under the cap; the third token's payment comes back
        let receipt = sale.mint(&buyer, 3, price3).unwrap();
        assert_eq!(receipt.minted, 2);
        assert_eq!(receipt.charged_wei, sale.quote(2));
        assert_eq!(receipt.refunded_wei, sale.quote(1));
        assert_eq!(sale.minted_by(&buyer), 5);
    }

    #[test]
    fn over_supply_purchase_fills_partially_and_refunds() {
        let mut sale = open_sale(SaleParams {
            supply_cap: 4,
            ..SaleParams::default()
        });
        let buyer = addr(2);
        let price5 = sale.quote(5);

        let receipt = sale.mint(&buyer, 5, price5).unwrap();
        assert_eq!(receipt.minted, 4);
        assert_eq!(receipt.refunded_wei, sale.quote(1));
        assert_eq!(sale.balance_wei(), price5 - sale.quote(1));

        assert_eq!(sale.mint(&addr(3), 1, price5), Err(SaleError::SoldOut));
    }

    #[test]
    fn public_path_respects_sale_and_window_gates() {
        let owner = addr(OWNER);
        let mut sale = MockSale::new(owner, SaleParams::default());
        let price = sale.quote(1);

        assert_eq!(sale.mint(&addr(2), 1, price), Err(SaleError::SaleNotActive));

        sale.trigger_sale(&owner, true).unwrap();
        sale.set_whitelist_end_block(&owner, 50).unwrap();
        assert_eq!(sale.mint(&addr(2), 1, price), Err(SaleError::WhitelistOpen));

        sale.advance_blocks(51);
        assert!(sale.mint(&addr(2), 1, price).is_ok());
    }

    #[test]
    fn whitelisted_mint_spends_the_proven_allowance() {
        // Snapshot from the end-to-end scenario: allowances 4/3/5/4
        let (mut sale, commitment) = whitelist_sale(&[(2, 4), (3, 3), (4, 5), (5, 4)]);
        let buyer = addr(3);
        let proof = commitment.membership(&buyer).unwrap();

        let r = sale
            .mint_whitelisted(&buyer, 2, 3, &proof, sale.quote(2))
            .unwrap();
        assert_eq!(r.minted, 2);

        let r = sale
            .mint_whitelisted(&buyer, 1, 3, &proof, sale.quote(1))
            .unwrap();
        assert_eq!(r.minted, 1);

        // Allowance fully spent
        assert_eq!(
            sale.mint_whitelisted(&buyer, 1, 3, &proof, sale.quote(1)),
            Err(SaleError::MintCapExceeded)
        );
    }

    #[test]
    fn inflated_allowance_claim_is_not_whitelisted() {
        let (mut sale, commitment) = whitelist_sale(&[(2, 4), (3, 3), (4, 5), (5, 4)]);
        let buyer = addr(3);
        let proof = commitment.membership(&buyer).unwrap();

        assert_eq!(
            sale.mint_whitelisted(&buyer, 1, 5, &proof, sale.quote(1)),
            Err(SaleError::NotWhitelisted)
        );
    }

    #[test]
    fn outsider_with_borrowed_proof_is_not_whitelisted() {
        let (mut sale, commitment) = whitelist_sale(&[(2, 4), (3, 3), (4, 5)]);
        let outsider = addr(9);
        let borrowed = commitment.membership(&addr(2)).unwrap();

        assert_eq!(
            sale.mint_whitelisted(&outsider, 1, 4, &borrowed, sale.quote(1)),
            Err(SaleError::NotWhitelisted)
        );
    }

    #[test]
    fn no_published_root_means_nobody_is_whitelisted() {
        let owner = addr(OWNER);
        let mut sale = MockSale::new(owner, SaleParams::default());
        sale.set_whitelist_end_block(&owner, 100).unwrap();
        sale.trigger_sale(&owner, true).unwrap();

        let wl = Whitelist::from_pairs(&[addr(2)], &[4]).unwrap();
        let commitment = Commitment::build(&wl);
        let proof = commitment.membership(&addr(2)).unwrap();

        assert_eq!(
            sale.mint_whitelisted(&addr(2), 1, 4, &proof, sale.quote(1)),
            Err(SaleError::NotWhitelisted)
        );
    }

    #[test]
    fn republished_root_invalidates_stale_proofs() {
        let (mut sale, old_commitment) = whitelist_sale(&[(2, 4), (3, 3)]);
        let owner = addr(OWNER);
        let stale = old_commitment.membership(&addr(3)).unwrap();

        // Same addresses, one allowance bumped: fresh snapshot, fresh root
        let wl = Whitelist::from_pairs(&[addr(2), addr(3)], &[4, 4]).unwrap();
        let fresh = Commitment::build(&wl);
        sale.set_whitelist_root(&owner, fresh.root()).unwrap();

        assert_eq!(
            sale.mint_whitelisted(&addr(3), 1, 3, &stale, sale.quote(1)),
            Err(SaleError::NotWhitelisted)
        );
        let proof = fresh.membership(&addr(3)).unwrap();
        assert!(sale
            .mint_whitelisted(&addr(3), 1, 4, &proof, sale.quote(1))
            .is_ok());
    }

    #[test]
    fn whitelist_path_closes_with_the_window() {
        let (mut sale, commitment) = whitelist_sale(&[(2, 4)]);
        let proof = commitment.membership(&addr(2)).unwrap();

        sale.advance_blocks(101);
        assert_eq!(
            sale.mint_whitelisted(&addr(2), 1, 4, &proof, sale.quote(1)),
            Err(SaleError::WhitelistEnded)
        );
    }

    #[test]
    fn withdraw_is_owner_only_and_drains() {
        let mut sale = open_sale(SaleParams::default());
        let owner = addr(OWNER);
        let price = sale.quote(5);
        sale.mint(&addr(2), 5, price).unwrap();

        assert_eq!(sale.withdraw(&addr(2)), Err(SaleError::NotOwner));
        assert_eq!(sale.withdraw(&owner), Ok(price));
        assert_eq!(sale.balance_wei(), 0);
        assert_eq!(sale.withdraw(&owner), Ok(0));
    }

    #[test]
    fn params_file_overrides_defaults() {
        let file = mintgate_spec::load_sale_params_toml("supply_cap = 4").unwrap();
        let params = SaleParams::with_overrides(&file);
        assert_eq!(params.supply_cap, 4);
        assert_eq!(params.wallet_cap, SaleParams::default().wallet_cap);
        assert_eq!(params.unit_price_wei, SaleParams::default().unit_price_wei);
    }

    #[test]
    fn config_surface_is_owner_gated() {
        let mut sale = MockSale::new(addr(OWNER), SaleParams::default());
        let stranger = addr(7);
        assert_eq!(
            sale.trigger_sale(&stranger, true),
            Err(SaleError::NotOwner)
        );
        assert_eq!(
            sale.set_whitelist_root(&stranger, mintgate_hash::ZERO_DIGEST),
            Err(SaleError::NotOwner)
        );
        assert_eq!(
            sale.set_whitelist_end_block(&stranger, 10),
            Err(SaleError::NotOwner)
        );
    }
}
