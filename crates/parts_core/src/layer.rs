//! Layers and tags used to filter scene queries

use serde::{Deserialize, Serialize};
use std::fmt;

/// A collision layer index (0..32)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layer(pub u8);

impl Layer {
    /// Default layer
    pub const DEFAULT: Self = Self(0);
    /// Player layer
    pub const PLAYER: Self = Self(1);
    /// Enemy layer
    pub const ENEMIES: Self = Self(2);
    /// Ammo layer
    pub const AMMO: Self = Self(3);
    /// Trigger/zone layer
    pub const TRIGGERS: Self = Self(4);
    /// Static environment layer
    pub const ENVIRONMENT: Self = Self(5);
    /// Pickup layer
    pub const PICKUPS: Self = Self(6);

    /// Get the layer as a single-bit mask
    pub fn mask(self) -> LayerMask {
        LayerMask(1u32 << (self.0 as u32 & 31))
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Bitmask of layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches every layer
    pub const ALL: Self = Self(u32::MAX);
    /// Matches nothing
    pub const NONE: Self = Self(0);

    /// Build a mask from a list of layers
    pub fn from_layers(layers: &[Layer]) -> Self {
        Self(layers.iter().fold(0u32, |acc, l| acc | l.mask().0))
    }

    /// Check if a layer is part of the mask
    #[inline]
    pub fn contains(self, layer: Layer) -> bool {
        self.0 & layer.mask().0 != 0
    }

    /// Add a layer
    pub fn with(self, layer: Layer) -> Self {
        Self(self.0 | layer.mask().0)
    }

    /// Remove a layer
    pub fn without(self, layer: Layer) -> Self {
        Self(self.0 & !layer.mask().0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// A free-form tag ("Player", "Enemy", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Optional tag requirement; an empty filter lets everything through
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter(pub Option<Tag>);

impl TagFilter {
    /// Filter that passes everything
    pub const fn any() -> Self {
        Self(None)
    }

    /// Filter that requires a tag
    pub fn tag(tag: impl Into<String>) -> Self {
        Self(Some(Tag::new(tag)))
    }

    /// Check a candidate's tag against the filter
    pub fn passes(&self, tag: Option<&str>) -> bool {
        match &self.0 {
            None => true,
            Some(required) => tag == Some(required.as_str()),
        }
    }
}
