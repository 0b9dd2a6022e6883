//! RS4xx product identifiers
//!
//! USB product ids of the RS4xx family and the display-name lookup.
//! Unknown ids are not an error anywhere: they fall back to the generic
//! family name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// USB product id of one RS4xx unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u16);

pub const RS400: ProductId = ProductId(0x0ad1);
pub const RS410: ProductId = ProductId(0x0ad2);
pub const RS415: ProductId = ProductId(0x0ad3);
pub const RS430: ProductId = ProductId(0x0ad4);
pub const RS430_MM: ProductId = ProductId(0x0ad5);
pub const RS420: ProductId = ProductId(0x0af6);
pub const RS420_MM: ProductId = ProductId(0x0afe);
pub const RS410_MM: ProductId = ProductId(0x0aff);
pub const RS400_MM: ProductId = ProductId(0x0b00);
pub const RS430_MM_RGB: ProductId = ProductId(0x0b01);
pub const RS460: ProductId = ProductId(0x0b03);
pub const RS435_RGB: ProductId = ProductId(0x0b07);

const SKU_NAMES: &[(ProductId, &str)] = &[
    (RS400, "RS400"),
    (RS410, "RS410"),
    (RS415, "RS415"),
    (RS430, "RS430"),
    (RS430_MM, "RS430 with Motion Module"),
    (RS420, "RS420"),
    (RS420_MM, "RS420 with Motion Module"),
    (RS410_MM, "RS410 with Motion Module"),
    (RS400_MM, "RS400 with Motion Module"),
    (RS430_MM_RGB, "RS430 with Motion Module and RGB"),
    (RS460, "RS460"),
    (RS435_RGB, "RS435 with RGB"),
];

impl ProductId {
    /// Display name for the sku; unknown ids get the generic family name.
    pub fn display_name(&self) -> &'static str {
        SKU_NAMES
            .iter()
            .find(|(pid, _)| pid == self)
            .map(|(_, name)| *name)
            .unwrap_or("RS4xx")
    }

    /// Uppercase hex rendering used in the info map.
    pub fn hex_string(&self) -> String {
        format!("{:04X}", self.0)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
