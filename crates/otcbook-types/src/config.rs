//! Configuration snapshot consumed by the escrow engine.
//!
//! The host owns configuration (an external provider per the system
//! boundary); the engine holds a read-only snapshot and replaces it
//! wholesale on demand. Coin allow-lists and mappings are keyed by symbol
//! *code*; the precision authority is the mapped [`Symbol`] value itself.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{AccountId, OtcError, Result, Side, Symbol};

/// Whether mutating entry points accept work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Running,
    Maintenance,
}

/// The full configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    pub status: ServiceStatus,
    /// The one fiat symbol order prices must quote in.
    pub fiat: Symbol,
    /// Quoted coin code → its stake (collateral) asset.
    pub coin_as_stake: BTreeMap<String, Symbol>,
    /// Coin codes allowed for buy orders.
    pub buy_coins: BTreeSet<String>,
    /// Coin codes allowed for sell orders.
    pub sell_coins: BTreeSet<String>,
    /// Allowed payment methods.
    pub pay_methods: BTreeSet<String>,
    /// Fee, in 1/10000ths (30 = 0.3%).
    pub fee_pct: u32,
    /// Stake requirement, in 1/10000ths (200 = 2%).
    pub stake_pct: u32,
    /// Window the taker gets to cancel after maker acceptance.
    pub accepted_timeout_secs: i64,
    /// Window the taker gets before a forced close after maker payment.
    pub payed_timeout_secs: i64,
    pub admin: AccountId,
    /// Settlement recorder account, if deployed.
    pub settlement: Option<AccountId>,
    /// Stake asset code → custody contract executing its transfers.
    pub stake_contracts: BTreeMap<String, AccountId>,
    /// The reference stake asset; deals settling in it are reported to the
    /// settlement recorder.
    pub settle_symbol: Symbol,
    /// Plan handle passed to the fee-split collaborator.
    pub fee_split_plan_id: u64,
}

impl BookConfig {
    /// Refuse work while in maintenance.
    pub fn require_operational(&self) -> Result<()> {
        match self.status {
            ServiceStatus::Running => Ok(()),
            ServiceStatus::Maintenance => Err(OtcError::ServiceMaintenance),
        }
    }

    /// The stake asset configured for a quoted coin.
    pub fn stake_symbol(&self, coin: &Symbol) -> Result<&Symbol> {
        self.coin_as_stake
            .get(&coin.code)
            .ok_or_else(|| OtcError::StakeAssetUnset(coin.clone()))
    }

    /// Whether a coin may be quoted on the given order side.
    pub fn check_coin_allowed(&self, side: Side, coin: &Symbol) -> Result<()> {
        let allowed = match side {
            Side::Buy => self.buy_coins.contains(&coin.code),
            Side::Sell => self.sell_coins.contains(&coin.code),
        };
        if allowed {
            Ok(())
        } else {
            Err(OtcError::CoinNotAllowed {
                side,
                symbol: coin.clone(),
            })
        }
    }

    /// Whether every requested payment method is in the allow-list.
    pub fn check_pay_methods<'a>(&self, methods: impl IntoIterator<Item = &'a String>) -> Result<()> {
        for method in methods {
            if !self.pay_methods.contains(method) {
                return Err(OtcError::PayMethodNotAllowed(method.clone()));
            }
        }
        Ok(())
    }

    /// Custody contract for a stake asset.
    pub fn stake_contract(&self, stake: &Symbol) -> Result<&AccountId> {
        self.stake_contracts
            .get(&stake.code)
            .ok_or_else(|| OtcError::StakeAssetUnset(stake.clone()))
    }

    #[must_use]
    pub fn accepted_timeout(&self) -> Duration {
        Duration::seconds(self.accepted_timeout_secs)
    }

    #[must_use]
    pub fn payed_timeout(&self) -> Duration {
        Duration::seconds(self.payed_timeout_secs)
    }

    /// A canned configuration for tests and demos: AMAX quoted against CNY
    /// with MUSDT collateral, 0.3% fee, 2% stake, 30-minute windows.
    ///
    /// # Panics
    /// Never; the embedded symbols are statically valid.
    #[must_use]
    pub fn demo() -> Self {
        let amax = Symbol::new("AMAX", 4).expect("static symbol");
        let musdt = Symbol::new("MUSDT", 4).expect("static symbol");
        let cny = Symbol::new("CNY", 2).expect("static symbol");
        Self {
            status: ServiceStatus::Running,
            fiat: cny,
            coin_as_stake: BTreeMap::from([(amax.code.clone(), musdt.clone())]),
            buy_coins: BTreeSet::from([amax.code.clone()]),
            sell_coins: BTreeSet::from([amax.code]),
            pay_methods: BTreeSet::from([
                "bank".to_string(),
                "alipay".to_string(),
                "wechat".to_string(),
            ]),
            fee_pct: 30,
            stake_pct: 200,
            accepted_timeout_secs: 1_800,
            payed_timeout_secs: 1_800,
            admin: AccountId::from("otcadmin"),
            settlement: Some(AccountId::from("otcsettle")),
            stake_contracts: BTreeMap::from([(musdt.code.clone(), AccountId::from("amax.mtoken"))]),
            settle_symbol: musdt,
            fee_split_plan_id: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_is_operational() {
        let cfg = BookConfig::demo();
        assert!(cfg.require_operational().is_ok());
        let amax = Symbol::new("AMAX", 4).unwrap();
        assert_eq!(cfg.stake_symbol(&amax).unwrap().code, "MUSDT");
        assert!(cfg.check_coin_allowed(Side::Buy, &amax).is_ok());
        assert!(cfg.check_coin_allowed(Side::Sell, &amax).is_ok());
    }

    #[test]
    fn maintenance_refuses_work() {
        let mut cfg = BookConfig::demo();
        cfg.status = ServiceStatus::Maintenance;
        assert!(matches!(
            cfg.require_operational(),
            Err(OtcError::ServiceMaintenance)
        ));
    }

    #[test]
    fn unknown_coin_rejected() {
        let cfg = BookConfig::demo();
        let btc = Symbol::new("BTC", 8).unwrap();
        assert!(matches!(
            cfg.stake_symbol(&btc),
            Err(OtcError::StakeAssetUnset(_))
        ));
        assert!(matches!(
            cfg.check_coin_allowed(Side::Buy, &btc),
            Err(OtcError::CoinNotAllowed { .. })
        ));
    }

    #[test]
    fn pay_method_allow_list() {
        let cfg = BookConfig::demo();
        let good = vec!["bank".to_string(), "alipay".to_string()];
        assert!(cfg.check_pay_methods(&good).is_ok());
        let bad = vec!["cash".to_string()];
        assert!(matches!(
            cfg.check_pay_methods(&bad),
            Err(OtcError::PayMethodNotAllowed(_))
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = BookConfig::demo();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: BookConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fee_pct, 30);
        assert_eq!(back.settle_symbol.code, "MUSDT");
        assert_eq!(back.admin, cfg.admin);
    }
}
