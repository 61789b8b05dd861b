//! Legacy TMF field types and their canonical manifest wire types.
//!
//! TMF field lines end in an `Item*` token naming how the WPP preprocessor
//! formatted the argument. Manifest-based decoders instead describe fields
//! with `win:*` in-types. [`TypeMapper`] bridges the two with a fixed table.
//!
//! Types that have no faithful manifest equivalent (hex dumps, SCSI sense
//! data, socket addresses, ...) are listed as [`TypeMapping::Unmapped`] and,
//! like tokens missing from the table entirely, decode as
//! [`DEFAULT_WIRE_TYPE`].

use std::fmt;

/// Canonical manifest wire types produced by the mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// `win:Int8`
    Int8,
    /// `win:UInt8`
    UInt8,
    /// `win:Int16`
    Int16,
    /// `win:UInt16`
    UInt16,
    /// `win:Int32`
    Int32,
    /// `win:UInt32`
    UInt32,
    /// `win:Int64`
    Int64,
    /// `win:UInt64`
    UInt64,
    /// `win:Double`
    Double,
    /// `win:GUID`
    Guid,
    /// `win:SID`
    Sid,
    /// `win:AnsiString`
    AnsiString,
    /// `win:UnicodeString`
    UnicodeString,
    /// `win:AnsiStringPref`, a length-prefixed ANSI string
    AnsiStringPref,
    /// `win:UnicodeStringPref`, a length-prefixed UTF-16 string
    UnicodeStringPref,
}

impl WireType {
    /// Returns the manifest spelling, e.g. `win:UInt32`
    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::Int8 => "win:Int8",
            WireType::UInt8 => "win:UInt8",
            WireType::Int16 => "win:Int16",
            WireType::UInt16 => "win:UInt16",
            WireType::Int32 => "win:Int32",
            WireType::UInt32 => "win:UInt32",
            WireType::Int64 => "win:Int64",
            WireType::UInt64 => "win:UInt64",
            WireType::Double => "win:Double",
            WireType::Guid => "win:GUID",
            WireType::Sid => "win:SID",
            WireType::AnsiString => "win:AnsiString",
            WireType::UnicodeString => "win:UnicodeString",
            WireType::AnsiStringPref => "win:AnsiStringPref",
            WireType::UnicodeStringPref => "win:UnicodeStringPref",
        }
    }

    /// Returns true for the string-like wire types
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            WireType::AnsiString
                | WireType::UnicodeString
                | WireType::AnsiStringPref
                | WireType::UnicodeStringPref
        )
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire type used for unknown and structurally complex legacy types
pub const DEFAULT_WIRE_TYPE: WireType = WireType::UnicodeString;

/// One entry of the legacy type table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMapping {
    /// The token has a direct manifest equivalent
    Mapped(WireType),
    /// The token is known but has no faithful equivalent
    Unmapped,
}

use self::TypeMapping::{Mapped, Unmapped};
use self::WireType::*;

/// Legacy `Item*` tokens as they appear in TMF files.
///
/// Keys are matched byte-for-byte, including the odd `ItemListwin:UInt8`
/// spellings found in shipped TMFs.
const TYPE_TABLE: &[(&str, TypeMapping)] = &[
    ("ItemChar", Mapped(UInt8)),
    ("ItemUChar", Mapped(UInt8)),
    ("ItemCharShort", Mapped(UInt8)),
    ("ItemCharSign", Mapped(UInt8)),
    ("ItemShort", Mapped(Int16)),
    ("ItemUShort", Mapped(UInt16)),
    ("ItemLong", Mapped(Int32)),
    ("ItemULong", Mapped(UInt32)),
    ("ItemULongX", Mapped(UInt32)),
    ("ItemLongLong", Mapped(Int64)),
    ("ItemULongLong", Mapped(UInt64)),
    ("ItemLongLongX", Mapped(UInt64)),
    ("ItemLongLongXX", Mapped(UInt64)),
    ("ItemLongLongO", Mapped(UInt64)),
    ("ItemString", Mapped(AnsiString)),
    ("ItemWString", Mapped(UnicodeString)),
    ("ItemRString", Mapped(AnsiString)),
    ("ItemRWString", Mapped(UnicodeString)),
    ("ItemPString", Mapped(AnsiStringPref)),
    ("ItemPWString", Mapped(UnicodeStringPref)),
    ("ItemPII", Mapped(UnicodeString)),
    ("ItemDSString", Mapped(AnsiStringPref)),
    ("ItemDSWString", Mapped(UnicodeStringPref)),
    ("ItemSid", Mapped(Sid)),
    ("ItemChar4", Unmapped),
    ("ItemIPAddr", Mapped(UInt32)),
    ("ItemIPV6Addr", Unmapped),
    ("ItemMACAddr", Mapped(Guid)),
    ("ItemPort", Mapped(UInt16)),
    ("ItemMLString", Mapped(AnsiStringPref)),
    ("ItemNWString", Mapped(UnicodeString)),
    ("ItemPtr", Mapped(UInt64)),
    ("ItemListLong", Mapped(Int32)),
    ("ItemListShort", Mapped(Int16)),
    ("ItemListwin:UInt8", Mapped(Int8)),
    ("ItemNTerror", Unmapped),
    ("ItemMerror", Unmapped),
    ("ItemTimestamp", Mapped(UInt64)),
    ("ItemTimeStamp", Mapped(UInt64)),
    ("ItemGuid", Mapped(Guid)),
    ("ItemNTSTATUS", Mapped(UInt16)),
    ("ItemWINERROR", Mapped(UInt16)),
    ("ItemNETEVENT", Unmapped),
    ("ItemWaitTime", Unmapped),
    ("ItemTimeDelta", Unmapped),
    ("ItemSetLong", Unmapped),
    ("ItemSetShort", Unmapped),
    ("ItemSetwin:UInt8", Unmapped),
    ("ItemDouble", Mapped(Double)),
    ("ItemHRESULT", Mapped(UInt16)),
    ("ItemCharHidden", Mapped(UInt8)),
    ("ItemWChar", Mapped(UInt16)),
    ("ItemHexDump", Unmapped),
    ("ItemEventLog", Unmapped),
    ("ItemSRB", Unmapped),
    ("ItemSenseData", Unmapped),
    ("ItemEnum", Mapped(Int32)),
    ("ItemResource", Unmapped),
    ("ItemCLSID", Mapped(Guid)),
    ("ItemIID", Mapped(Guid)),
    ("ItemLIBID", Mapped(Guid)),
    ("ItemSockAddr", Unmapped),
    ("ItemKSid", Unmapped),
    ("ItemCWString", Unmapped),
    ("ItemNStrings", Unmapped),
    ("ItemFQDN", Mapped(UnicodeString)),
    ("ItemURI", Mapped(UnicodeString)),
    ("ItemURIums", Mapped(UnicodeString)),
    ("ItemE164ums", Mapped(UnicodeString)),
    ("ItemIP", Mapped(UnicodeString)),
    ("ItemHOST", Mapped(UnicodeString)),
    ("ItemListLong(false,true)", Mapped(UnicodeString)),
];

/// Maps legacy field type tokens to manifest wire types
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMapper;

impl TypeMapper {
    /// Looks a token up in the table without applying the fallback
    pub fn lookup(raw_type: &str) -> Option<TypeMapping> {
        TYPE_TABLE
            .iter()
            .find(|(token, _)| *token == raw_type)
            .map(|&(_, mapping)| mapping)
    }

    /// Returns the wire type for `raw_type`.
    ///
    /// Unknown and unmapped tokens become [`DEFAULT_WIRE_TYPE`]; this never
    /// fails.
    pub fn map(raw_type: &str) -> WireType {
        match Self::lookup(raw_type) {
            Some(Mapped(wire_type)) => wire_type,
            Some(Unmapped) | None => DEFAULT_WIRE_TYPE,
        }
    }

    /// Returns true if `raw_type` has a direct manifest equivalent
    pub fn is_mapped(raw_type: &str) -> bool {
        matches!(Self::lookup(raw_type), Some(Mapped(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_tokens() {
        assert_eq!(TypeMapper::map("ItemLong"), WireType::Int32);
        assert_eq!(TypeMapper::map("ItemULongLong"), WireType::UInt64);
        assert_eq!(TypeMapper::map("ItemGuid"), WireType::Guid);
        assert_eq!(TypeMapper::map("ItemPWString"), WireType::UnicodeStringPref);
        assert_eq!(TypeMapper::map("ItemListwin:UInt8"), WireType::Int8);
    }

    #[test]
    fn test_fallback_to_unicode_string() {
        assert_eq!(TypeMapper::map("ItemHexDump"), DEFAULT_WIRE_TYPE);
        assert_eq!(TypeMapper::map("ItemSockAddr"), DEFAULT_WIRE_TYPE);
        assert_eq!(TypeMapper::map("unknown-token"), DEFAULT_WIRE_TYPE);
        assert_eq!(TypeMapper::map(""), DEFAULT_WIRE_TYPE);
        assert_eq!(DEFAULT_WIRE_TYPE.as_str(), "win:UnicodeString");
    }

    #[test]
    fn test_lookup_distinguishes_unmapped_from_unknown() {
        assert_eq!(TypeMapper::lookup("ItemSRB"), Some(TypeMapping::Unmapped));
        assert_eq!(TypeMapper::lookup("ItemBogus"), None);
        assert!(TypeMapper::is_mapped("ItemDouble"));
        assert!(!TypeMapper::is_mapped("ItemIPV6Addr"));
    }

    #[test]
    fn test_table_has_no_duplicate_keys() {
        let mut keys: Vec<_> = TYPE_TABLE.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), TYPE_TABLE.len());
    }

    #[test]
    fn test_wire_type_display() {
        assert_eq!(WireType::UInt16.to_string(), "win:UInt16");
        assert!(WireType::AnsiString.is_string());
        assert!(!WireType::Sid.is_string());
    }
}
