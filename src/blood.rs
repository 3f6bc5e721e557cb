/// Blood types and per-type stock levels
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default threshold below which a blood type counts as low stock
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// ABO/Rh blood type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
}

impl BloodType {
    /// All types in canonical order
    pub const ALL: [BloodType; 8] = [
        BloodType::OPositive,
        BloodType::ONegative,
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
        }
    }

    /// Parse a canonical blood type; surrounding whitespace and letter case are ignored
    pub fn from_str(s: &str) -> AppResult<Self> {
        let normalized = s.trim().to_uppercase();
        BloodType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| AppError::InvalidBloodType(s.to_string()))
    }

    /// Column of `blood_bank` holding this type's units
    pub(crate) fn stock_column(&self) -> &'static str {
        match self {
            BloodType::OPositive => "stock_o_pos",
            BloodType::ONegative => "stock_o_neg",
            BloodType::APositive => "stock_a_pos",
            BloodType::ANegative => "stock_a_neg",
            BloodType::BPositive => "stock_b_pos",
            BloodType::BNegative => "stock_b_neg",
            BloodType::AbPositive => "stock_ab_pos",
            BloodType::AbNegative => "stock_ab_neg",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Units on hand for every blood type
///
/// Always holds all eight keys; values are unsigned so a negative level
/// cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BloodStock(BTreeMap<BloodType, u32>);

impl Default for BloodStock {
    fn default() -> Self {
        Self(BloodType::ALL.into_iter().map(|t| (t, 0)).collect())
    }
}

impl BloodStock {
    pub fn get(&self, blood_type: BloodType) -> u32 {
        self.0.get(&blood_type).copied().unwrap_or(0)
    }

    pub fn set(&mut self, blood_type: BloodType, units: u32) {
        self.0.insert(blood_type, units);
    }

    /// Apply a stock operation in place, returning the new level
    pub fn apply(&mut self, blood_type: BloodType, op: StockOperation, quantity: u32) -> u32 {
        let units = op.apply(self.get(blood_type), quantity);
        self.set(blood_type, units);
        units
    }

    /// Sum of all units
    pub fn total_units(&self) -> u64 {
        self.0.values().map(|&u| u as u64).sum()
    }

    /// Blood types with fewer than `threshold` units, in canonical order
    pub fn low_stock_types(&self, threshold: u32) -> Vec<BloodType> {
        self.0
            .iter()
            .filter(|(_, units)| **units < threshold)
            .map(|(&t, _)| t)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BloodType, u32)> + '_ {
        self.0.iter().map(|(&t, &u)| (t, u))
    }
}

/// How a stock update combines with the current level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    Set,
    Add,
    Subtract,
}

impl StockOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOperation::Set => "set",
            StockOperation::Add => "add",
            StockOperation::Subtract => "subtract",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "set" => Ok(StockOperation::Set),
            "add" => Ok(StockOperation::Add),
            "subtract" => Ok(StockOperation::Subtract),
            _ => Err(AppError::invalid_field(
                "operation",
                format!("Invalid stock operation: {}", s),
            )),
        }
    }

    /// New level after applying this operation; never below zero
    pub fn apply(&self, current: u32, quantity: u32) -> u32 {
        match self {
            StockOperation::Set => quantity,
            StockOperation::Add => current.saturating_add(quantity),
            StockOperation::Subtract => current.saturating_sub(quantity),
        }
    }

    /// SQL expression computing the new value of `column` from bound parameter `?`
    pub(crate) fn sql_expression(&self, column: &str) -> String {
        match self {
            StockOperation::Set => "MAX(0, ?)".to_string(),
            StockOperation::Add => format!("{column} + ?"),
            StockOperation::Subtract => format!("MAX(0, {column} - ?)"),
        }
    }
}
