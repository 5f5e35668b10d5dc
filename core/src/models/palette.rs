//! Fixed appearance palettes for note cards.
//!
//! Entries are stored by value under their display name. Older records stored
//! the whole entry as an object (`{ "name": "Pink", "bg": ... }`), so both
//! shapes are accepted when reading.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An sRGB colour used for presentation attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Serialized shape of a palette entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PaletteEntry {
    Name(String),
    Entry { name: String },
}

impl PaletteEntry {
    fn name(&self) -> &str {
        match self {
            PaletteEntry::Name(name) | PaletteEntry::Entry { name } => name,
        }
    }
}

macro_rules! palette {
    ($(#[$meta:meta])* $ty:ident (default $default:ident) { $($variant:ident => $name:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "PaletteEntry", into = "String")]
        pub enum $ty {
            $($variant),+
        }

        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }

            /// Case-insensitive lookup by display name
            pub fn from_name(name: &str) -> Option<Self> {
                let name = name.trim();
                Self::ALL.iter().copied().find(|entry| entry.name().eq_ignore_ascii_case(name))
            }

            /// The entry after this one, wrapping around
            pub fn next(&self) -> Self {
                let index = Self::ALL.iter().position(|entry| entry == self).unwrap_or(0);
                Self::ALL[(index + 1) % Self::ALL.len()]
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                $ty::$default
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.name())
            }
        }

        impl From<$ty> for String {
            fn from(entry: $ty) -> Self {
                entry.name().to_string()
            }
        }

        impl TryFrom<PaletteEntry> for $ty {
            type Error = String;

            fn try_from(entry: PaletteEntry) -> Result<Self, Self::Error> {
                $ty::from_name(entry.name())
                    .ok_or_else(|| format!("unknown {} `{}`", stringify!($ty), entry.name()))
            }
        }
    };
}

palette! {
    /// Card background colours
    NoteColor (default Yellow) {
        Yellow => "Yellow",
        Pink => "Pink",
        Blue => "Blue",
        Green => "Green",
        Purple => "Purple",
        Gray => "Gray",
    }
}

palette! {
    /// Text colours
    FontColor (default Black) {
        Black => "Black",
        Slate => "Slate",
        Gray => "Gray",
        Red => "Red",
        Orange => "Orange",
        Amber => "Amber",
        Yellow => "Yellow",
        Lime => "Lime",
        Green => "Green",
        Emerald => "Emerald",
        Teal => "Teal",
        Cyan => "Cyan",
        Sky => "Sky",
        Blue => "Blue",
        Indigo => "Indigo",
        Violet => "Violet",
        Purple => "Purple",
        Fuchsia => "Fuchsia",
        Pink => "Pink",
        Rose => "Rose",
        White => "White",
    }
}

palette! {
    /// Text sizes
    FontSize (default Medium) {
        Small => "Small",
        Medium => "Medium",
        Large => "Large",
        ExtraLarge => "XL",
    }
}

impl NoteColor {
    pub fn background(&self) -> Rgb {
        match self {
            NoteColor::Yellow => Rgb(0xfe, 0xf0, 0x8a),
            NoteColor::Pink => Rgb(0xfb, 0xcf, 0xe8),
            NoteColor::Blue => Rgb(0xbf, 0xdb, 0xfe),
            NoteColor::Green => Rgb(0xbb, 0xf7, 0xd0),
            NoteColor::Purple => Rgb(0xe9, 0xd5, 0xff),
            NoteColor::Gray => Rgb(0xe5, 0xe7, 0xeb),
        }
    }

    /// Colour for chrome drawn on top of the card (labels, controls)
    pub fn text(&self) -> Rgb {
        match self {
            NoteColor::Yellow => Rgb(0x85, 0x4d, 0x0e),
            NoteColor::Pink => Rgb(0x9d, 0x17, 0x4d),
            NoteColor::Blue => Rgb(0x1e, 0x40, 0xaf),
            NoteColor::Green => Rgb(0x16, 0x65, 0x34),
            NoteColor::Purple => Rgb(0x6b, 0x21, 0xa8),
            NoteColor::Gray => Rgb(0x1f, 0x29, 0x37),
        }
    }

    pub fn border(&self) -> Rgb {
        match self {
            NoteColor::Yellow => Rgb(0xfa, 0xcc, 0x15),
            NoteColor::Pink => Rgb(0xf4, 0x72, 0xb6),
            NoteColor::Blue => Rgb(0x60, 0xa5, 0xfa),
            NoteColor::Green => Rgb(0x4a, 0xde, 0x80),
            NoteColor::Purple => Rgb(0xc0, 0x84, 0xfc),
            NoteColor::Gray => Rgb(0x9c, 0xa3, 0xaf),
        }
    }
}

impl FontColor {
    pub fn swatch(&self) -> Rgb {
        match self {
            FontColor::Black => Rgb(0x00, 0x00, 0x00),
            FontColor::Slate => Rgb(0x33, 0x41, 0x55),
            FontColor::Gray => Rgb(0x6b, 0x72, 0x80),
            FontColor::Red => Rgb(0xdc, 0x26, 0x26),
            FontColor::Orange => Rgb(0xea, 0x58, 0x0c),
            FontColor::Amber => Rgb(0xd9, 0x77, 0x06),
            FontColor::Yellow => Rgb(0xca, 0x8a, 0x04),
            FontColor::Lime => Rgb(0x65, 0xa3, 0x0d),
            FontColor::Green => Rgb(0x16, 0xa3, 0x4a),
            FontColor::Emerald => Rgb(0x05, 0x96, 0x69),
            FontColor::Teal => Rgb(0x0d, 0x94, 0x88),
            FontColor::Cyan => Rgb(0x08, 0x91, 0xb2),
            FontColor::Sky => Rgb(0x02, 0x84, 0xc7),
            FontColor::Blue => Rgb(0x25, 0x63, 0xeb),
            FontColor::Indigo => Rgb(0x4f, 0x46, 0xe5),
            FontColor::Violet => Rgb(0x7c, 0x3a, 0xed),
            FontColor::Purple => Rgb(0x93, 0x33, 0xea),
            FontColor::Fuchsia => Rgb(0xc0, 0x26, 0xd3),
            FontColor::Pink => Rgb(0xdb, 0x27, 0x77),
            FontColor::Rose => Rgb(0xe1, 0x1d, 0x48),
            FontColor::White => Rgb(0xff, 0xff, 0xff),
        }
    }
}

impl FontSize {
    /// Short size token (`sm`, `base`, `lg`, `xl`)
    pub fn value(&self) -> &'static str {
        match self {
            FontSize::Small => "sm",
            FontSize::Medium => "base",
            FontSize::Large => "lg",
            FontSize::ExtraLarge => "xl",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(NoteColor::default(), NoteColor::Yellow);
        assert_eq!(FontColor::default(), FontColor::Black);
        assert_eq!(FontSize::default(), FontSize::Medium);
    }

    #[test]
    fn test_palette_sizes() {
        assert_eq!(NoteColor::ALL.len(), 6);
        assert_eq!(FontColor::ALL.len(), 21);
        assert_eq!(FontSize::ALL.len(), 4);
    }

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(NoteColor::from_name("pink"), Some(NoteColor::Pink));
        assert_eq!(FontSize::from_name(" xl "), Some(FontSize::ExtraLarge));
        assert_eq!(FontColor::from_name("Mauve"), None);
    }

    #[test]
    fn test_next_wraps() {
        assert_eq!(NoteColor::Yellow.next(), NoteColor::Pink);
        assert_eq!(NoteColor::Gray.next(), NoteColor::Yellow);
    }

    #[test]
    fn test_serializes_as_name() {
        let json = serde_json::to_string(&FontSize::ExtraLarge).unwrap();
        assert_eq!(json, "\"XL\"");
    }

    #[test]
    fn test_accepts_legacy_object_entries() {
        let color: NoteColor = serde_json::from_str(
            r#"{ "name": "Blue", "bg": "bg-blue-200", "text": "text-blue-800", "border": "border-blue-400" }"#,
        )
        .unwrap();
        assert_eq!(color, NoteColor::Blue);

        let size: FontSize =
            serde_json::from_str(r#"{ "name": "Large", "class": "text-lg", "value": "lg" }"#).unwrap();
        assert_eq!(size, FontSize::Large);
    }

    #[test]
    fn test_rejects_unknown_entry() {
        let result: Result<FontColor, _> = serde_json::from_str("\"Chartreuse\"");
        assert!(result.is_err());
    }
}
