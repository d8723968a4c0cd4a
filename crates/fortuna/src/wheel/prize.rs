use super::SpinError;
use derive_more::{AsRef, Deref, Display, From, Into};
use palette::Srgb;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct PrizeLabel(String);

crate::impl_string_newtype!(PrizeLabel);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct IconRef(String);

crate::impl_string_newtype!(IconRef);

/// Identity used to tally prize hits. Two slots carrying the same prize share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Deref, From, Into, AsRef)]
pub struct PrizeKey(String);

crate::impl_string_newtype!(PrizeKey);

/// Sector fill color, written as `#rrggbb` or `#rgb` in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub struct SlotColor(Srgb<u8>);

impl SlotColor {
    pub fn rgb(&self) -> (u8, u8, u8) {
        self.0.into_components()
    }

    pub fn as_srgb(&self) -> Srgb<u8> {
        self.0
    }
}

impl FromStr for SlotColor {
    type Err = palette::rgb::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Srgb::from_str(s.trim()).map(Self)
    }
}

impl fmt::Display for SlotColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.rgb();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prize {
    pub label: PrizeLabel,
    pub value: f64,
    #[serde(default = "default_icon")]
    pub icon: IconRef,
    #[serde(default)]
    pub color: Option<SlotColor>,
}

fn default_icon() -> IconRef {
    IconRef::new("")
}

impl Prize {
    pub fn new(label: impl Into<String>, value: f64, icon: impl Into<String>) -> Self {
        Self {
            label: PrizeLabel::new(label),
            value,
            icon: IconRef::new(icon),
            color: None,
        }
    }

    pub fn with_color(mut self, color: SlotColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn key(&self) -> PrizeKey {
        PrizeKey::new(format!("{}:{}", self.label, self.value))
    }
}

/// Prizes in slot order. With fewer prizes than slots the table repeats.
#[derive(Debug, Clone, PartialEq)]
pub struct PrizeTable(Vec<Prize>);

impl PrizeTable {
    pub fn new(prizes: Vec<Prize>) -> Result<Self, SpinError> {
        if prizes.is_empty() {
            return Err(SpinError::NotConfigured("prize table is empty"));
        }
        Ok(Self(prizes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn prize_for_slot(&self, slot: usize) -> &Prize {
        &self.0[slot % self.0.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prize> {
        self.0.iter()
    }

    /// One prize per slot, as a renderer would draw them.
    pub fn for_slots(&self, slot_count: usize) -> impl Iterator<Item = &Prize> {
        (0..slot_count).map(|slot| self.prize_for_slot(slot))
    }
}
