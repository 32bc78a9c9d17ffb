//! Mirrored ERP entity categories

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::impl_wire_name_conversions;
use crate::SyncError;

/// One of the ERP record categories mirrored into the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Items,
    Dispatches,
    GoodsReceipts,
    ProcurementOrders,
}

impl_wire_name_conversions!(EntityType {
    Items => "ITEMS",
    Dispatches => "DISPATCHES",
    GoodsReceipts => "GOODS_RECEIPTS",
    ProcurementOrders => "PROCUREMENT_ORDERS",
});

impl EntityType {
    /// Every entity type, in seed order.
    pub const ALL: [Self; 4] =
        [Self::Items, Self::Dispatches, Self::GoodsReceipts, Self::ProcurementOrders];

    /// ERP resource path used when a config row is first seeded.
    pub const fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Items => "/MasterData/Items",
            Self::Dispatches => "/Transaction/Orders",
            Self::GoodsReceipts => "/Transaction/GoodsReceipt",
            Self::ProcurementOrders => "/Transaction/ProcurementOrders",
        }
    }

    /// Whether records of this entity own a line collection.
    pub const fn has_lines(&self) -> bool {
        !matches!(self, Self::Items)
    }

    /// Parse a wire name, reporting unknown names as configuration errors.
    pub fn parse(value: &str) -> Result<Self, SyncError> {
        Self::from_str(value).map_err(SyncError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&EntityType::GoodsReceipts).unwrap();
        assert_eq!(json, "\"GOODS_RECEIPTS\"");

        let parsed: EntityType = serde_json::from_str("\"PROCUREMENT_ORDERS\"").unwrap();
        assert_eq!(parsed, EntityType::ProcurementOrders);
    }

    #[test]
    fn display_matches_serde_name() {
        for entity in EntityType::ALL {
            let json = serde_json::to_value(entity).unwrap();
            assert_eq!(json.as_str().unwrap(), entity.to_string());
        }
    }

    #[test]
    fn parse_unknown_is_config_error() {
        assert_eq!(EntityType::parse("dispatches").unwrap(), EntityType::Dispatches);
        assert!(matches!(EntityType::parse("DELIVERY_NOTES"), Err(SyncError::Config(_))));
    }

    #[test]
    fn only_items_have_no_lines() {
        assert!(!EntityType::Items.has_lines());
        assert!(EntityType::Dispatches.has_lines());
        assert!(EntityType::GoodsReceipts.has_lines());
        assert!(EntityType::ProcurementOrders.has_lines());
    }
}
