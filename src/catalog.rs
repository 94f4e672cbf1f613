//! Static mode catalog
//!
//! Maps every known mode id to a human-readable descriptor and the set of
//! device families able to run it. Loaded once, immutable. The numeric ids
//! match the firmware's mode registers.
//!
//! Key tables for device implementers:
//! - [`MODE_CATALOG`]: descriptor and capability lookup
//! - [`LAMP_RING`]: the closed lamp-cycling table for NXT sensors
//! - [`Color`]: the 8-entry color label table

use crate::error::{Error, Result};
use std::fmt;

/// Opaque device operating-mode identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeId(u8);

impl ModeId {
    /// The underlying firmware mode register value
    pub const fn raw(self) -> u8 {
        self.0
    }

    pub(crate) const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device family. The three mode spaces are disjoint; a mode is only ever
/// applied to a port whose bound family supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// First-generation sensors (drive the illumination LED)
    Nxt,
    /// Second-generation sensors
    Ev3,
    /// Motor ports
    Motor,
}

impl Family {
    /// Parse the user-facing family tag ("NXT" or "EV3")
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "NXT" => Ok(Family::Nxt),
            "EV3" => Ok(Family::Ev3),
            _ => Err(Error::UnknownFamily(tag.to_string())),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Nxt => write!(f, "NXT"),
            Family::Ev3 => write!(f, "EV3"),
            Family::Motor => write!(f, "motor"),
        }
    }
}

/// Neutral/off port state shared by both sensor families
pub const PORT_OFF: ModeId = ModeId(0);
/// NXT light sensor with its LED on (reflected light)
pub const NXT_LIGHT_ON: ModeId = ModeId(9);
/// NXT full color measurement
pub const NXT_COLOR_FULL: ModeId = ModeId(36);
/// NXT red lamp
pub const NXT_LAMP_RED: ModeId = ModeId(37);
/// NXT green lamp
pub const NXT_LAMP_GREEN: ModeId = ModeId(38);
/// NXT blue lamp
pub const NXT_LAMP_BLUE: ModeId = ModeId(39);
/// NXT lamp off
pub const NXT_LAMP_OFF: ModeId = ModeId(40);
/// EV3 reflected light
pub const EV3_REFLECTED: ModeId = ModeId(50);
/// EV3 ambient light
pub const EV3_AMBIENT: ModeId = ModeId(51);
/// EV3 color measurement
pub const EV3_COLOR: ModeId = ModeId(52);
/// EV3 raw reflected light
pub const EV3_RAW_REFLECTED: ModeId = ModeId(53);
/// EV3 raw color components
pub const EV3_RAW_COLOR: ModeId = ModeId(54);
/// Motor disabled
pub const MOTOR_OFF: ModeId = ModeId(60);
/// Motor enabled
pub const MOTOR_ON: ModeId = ModeId(61);

/// One catalog row: descriptor plus the families able to run the mode
pub struct ModeEntry {
    /// Mode identifier
    pub id: ModeId,
    /// Human-readable mode name
    pub descriptor: &'static str,
    /// Capability set: families this mode may be applied to
    pub families: &'static [Family],
}

/// The static mode catalog
pub static MODE_CATALOG: &[ModeEntry] = &[
    ModeEntry {
        id: PORT_OFF,
        descriptor: "Port off",
        families: &[Family::Nxt, Family::Ev3],
    },
    ModeEntry {
        id: NXT_LIGHT_ON,
        descriptor: "NXT light mode",
        families: &[Family::Nxt],
    },
    ModeEntry {
        id: NXT_COLOR_FULL,
        descriptor: "NXT color mode",
        families: &[Family::Nxt],
    },
    ModeEntry {
        id: NXT_LAMP_RED,
        descriptor: "NXT Red mode",
        families: &[Family::Nxt],
    },
    ModeEntry {
        id: NXT_LAMP_GREEN,
        descriptor: "NXT Green mode",
        families: &[Family::Nxt],
    },
    ModeEntry {
        id: NXT_LAMP_BLUE,
        descriptor: "NXT Blue mode",
        families: &[Family::Nxt],
    },
    ModeEntry {
        id: NXT_LAMP_OFF,
        descriptor: "NXT off mode",
        families: &[Family::Nxt],
    },
    ModeEntry {
        id: EV3_REFLECTED,
        descriptor: "EV3 Reflected light mode",
        families: &[Family::Ev3],
    },
    ModeEntry {
        id: EV3_AMBIENT,
        descriptor: "EV3 Ambient light mode",
        families: &[Family::Ev3],
    },
    ModeEntry {
        id: EV3_COLOR,
        descriptor: "EV3 Color mode",
        families: &[Family::Ev3],
    },
    ModeEntry {
        id: EV3_RAW_REFLECTED,
        descriptor: "EV3 Raw reflected light mode",
        families: &[Family::Ev3],
    },
    ModeEntry {
        id: EV3_RAW_COLOR,
        descriptor: "EV3 Raw color mode",
        families: &[Family::Ev3],
    },
    ModeEntry {
        id: MOTOR_OFF,
        descriptor: "Motor disabled",
        families: &[Family::Motor],
    },
    ModeEntry {
        id: MOTOR_ON,
        descriptor: "Motor enabled",
        families: &[Family::Motor],
    },
];

/// Human-readable name for a mode id
pub fn descriptor(id: ModeId) -> Option<&'static str> {
    MODE_CATALOG
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| entry.descriptor)
}

/// Whether `family` may run mode `id`
pub fn supports(id: ModeId, family: Family) -> bool {
    MODE_CATALOG
        .iter()
        .find(|entry| entry.id == id)
        .is_some_and(|entry| entry.families.contains(&family))
}

/// Neutral mode a port is returned to when its handle is released
pub(crate) fn neutral_mode(family: Family) -> ModeId {
    match family {
        Family::Nxt => NXT_LAMP_OFF,
        Family::Ev3 => PORT_OFF,
        Family::Motor => MOTOR_OFF,
    }
}

/// Measurement request, independent of sensor generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalMode {
    /// Read color labels
    Color,
    /// Read reflected light levels
    ReflectedLight,
    /// Read ambient light levels
    AmbientLight,
    /// Raw reflected light
    RawReflectedLight,
    /// Raw color components
    RawColorComponents,
}

impl LogicalMode {
    /// The family-specific mode id, if the family supports the request
    pub fn mode_for(self, family: Family) -> Option<ModeId> {
        match (family, self) {
            (Family::Ev3, LogicalMode::Color) => Some(EV3_COLOR),
            (Family::Ev3, LogicalMode::ReflectedLight) => Some(EV3_REFLECTED),
            (Family::Ev3, LogicalMode::AmbientLight) => Some(EV3_AMBIENT),
            (Family::Ev3, LogicalMode::RawReflectedLight) => Some(EV3_RAW_REFLECTED),
            (Family::Ev3, LogicalMode::RawColorComponents) => Some(EV3_RAW_COLOR),
            (Family::Nxt, LogicalMode::Color) => Some(NXT_COLOR_FULL),
            (Family::Nxt, LogicalMode::ReflectedLight) => Some(NXT_LIGHT_ON),
            _ => None,
        }
    }

    /// Request name used in error reports
    pub fn name(self) -> &'static str {
        match self {
            LogicalMode::Color => "color-reading mode",
            LogicalMode::ReflectedLight => "reflected-light mode",
            LogicalMode::AmbientLight => "ambient-light mode",
            LogicalMode::RawReflectedLight => "raw reflected-light mode",
            LogicalMode::RawColorComponents => "raw color-components mode",
        }
    }
}

/// Lamp selection for the NXT illumination LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lamp {
    /// LED off
    Off,
    /// Red LED
    Red,
    /// Green LED
    Green,
    /// Blue LED
    Blue,
}

impl Lamp {
    pub(crate) fn mode(self) -> ModeId {
        match self {
            Lamp::Off => NXT_LAMP_OFF,
            Lamp::Red => NXT_LAMP_RED,
            Lamp::Green => NXT_LAMP_GREEN,
            Lamp::Blue => NXT_LAMP_BLUE,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Lamp::Off => "lamp off",
            Lamp::Red => "red lamp",
            Lamp::Green => "green lamp",
            Lamp::Blue => "blue lamp",
        }
    }
}

/// Closed lamp-cycling table with wraparound: off, red, green, blue
pub static LAMP_RING: [ModeId; 4] = [NXT_LAMP_OFF, NXT_LAMP_RED, NXT_LAMP_GREEN, NXT_LAMP_BLUE];

/// Color label table, indexed by the raw sensor value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// No color detected
    None,
    /// Black
    Black,
    /// Blue
    Blue,
    /// Green
    Green,
    /// Yellow
    Yellow,
    /// Red
    Red,
    /// White
    White,
    /// Brown
    Brown,
}

impl Color {
    /// Map a raw reading through the label table. Out-of-table values are
    /// reported to the caller, never defaulted.
    pub fn from_raw(raw: i32) -> Option<Color> {
        match raw {
            0 => Some(Color::None),
            1 => Some(Color::Black),
            2 => Some(Color::Blue),
            3 => Some(Color::Green),
            4 => Some(Color::Yellow),
            5 => Some(Color::Red),
            6 => Some(Color::White),
            7 => Some(Color::Brown),
            _ => None,
        }
    }

    /// The printable label
    pub fn label(self) -> &'static str {
        match self {
            Color::None => "None",
            Color::Black => "Black",
            Color::Blue => "Blue",
            Color::Green => "Green",
            Color::Yellow => "Yellow",
            Color::Red => "Red",
            Color::White => "White",
            Color::Brown => "Brown",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parse() {
        assert_eq!(Family::parse("NXT").unwrap(), Family::Nxt);
        assert_eq!(Family::parse("EV3").unwrap(), Family::Ev3);
        assert!(matches!(
            Family::parse("EV2"),
            Err(Error::UnknownFamily(tag)) if tag == "EV2"
        ));
    }

    #[test]
    fn test_descriptor_lookup() {
        assert_eq!(descriptor(EV3_COLOR), Some("EV3 Color mode"));
        assert_eq!(descriptor(NXT_LAMP_RED), Some("NXT Red mode"));
        assert_eq!(descriptor(ModeId::from_raw(99)), None);
    }

    #[test]
    fn test_capability_sets() {
        assert!(supports(NXT_LAMP_BLUE, Family::Nxt));
        assert!(!supports(NXT_LAMP_BLUE, Family::Ev3));
        assert!(supports(PORT_OFF, Family::Nxt));
        assert!(supports(PORT_OFF, Family::Ev3));
        assert!(supports(MOTOR_ON, Family::Motor));
        assert!(!supports(MOTOR_ON, Family::Nxt));
    }

    #[test]
    fn test_logical_mode_mapping() {
        assert_eq!(LogicalMode::Color.mode_for(Family::Ev3), Some(EV3_COLOR));
        assert_eq!(
            LogicalMode::Color.mode_for(Family::Nxt),
            Some(NXT_COLOR_FULL)
        );
        assert_eq!(
            LogicalMode::ReflectedLight.mode_for(Family::Nxt),
            Some(NXT_LIGHT_ON)
        );
        assert_eq!(LogicalMode::AmbientLight.mode_for(Family::Nxt), None);
        assert_eq!(LogicalMode::Color.mode_for(Family::Motor), None);
    }

    #[test]
    fn test_color_table_bounds() {
        assert_eq!(Color::from_raw(0), Some(Color::None));
        assert_eq!(Color::from_raw(7), Some(Color::Brown));
        assert_eq!(Color::from_raw(8), None);
        assert_eq!(Color::from_raw(-1), None);
    }

    #[test]
    fn test_lamp_ring_is_closed_over_nxt_lamp_modes() {
        for mode in LAMP_RING {
            assert!(supports(mode, Family::Nxt));
        }
        assert_eq!(LAMP_RING[0], NXT_LAMP_OFF);
    }
}
