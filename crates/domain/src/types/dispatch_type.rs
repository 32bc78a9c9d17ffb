//! Dispatch type catalogue exposed to the console

use serde::Serialize;

/// ERP dispatch type code with its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchType {
    pub code: i64,
    pub name: &'static str,
}

impl DispatchType {
    /// Known dispatch types, ordered by code.
    pub const CATALOGUE: [Self; 4] = [
        Self { code: 201, name: "Normal" },
        Self { code: 202, name: "Urgente" },
        Self { code: 203, name: "Express" },
        Self { code: 204, name: "Transferencia" },
    ];

    /// Look up a dispatch type by its ERP code.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::CATALOGUE.iter().copied().find(|dt| dt.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_lookup() {
        assert_eq!(DispatchType::from_code(203).map(|dt| dt.name), Some("Express"));
        assert!(DispatchType::from_code(299).is_none());
    }
}
