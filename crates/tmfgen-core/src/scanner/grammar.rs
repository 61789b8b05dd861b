//! Line grammars of the TMF format.
//!
//! ## Preamble
//!
//! The third line of every TMF file names the provider:
//!
//! ```text
//! f73bbb29-e2f0-93e7-ee22-e396f8fe1570 RgsClientsLib // SRC=matchmakinglocator.cs MJ= MN=
//! ```
//!
//! ## Event headers
//!
//! Two layouts are in circulation; the second carries one extra token
//! before the opcode:
//!
//! ```text
//! #typev <locator> <opcode> "<description>" // ... FUNC=<function> ...
//! #typev <locator> <extra> <opcode> "<description>" // ... FUNC=<function> ...
//! ```
//!
//! ## Fields
//!
//! ```text
//! <free text, may contain commas>, <type token>
//! ```

/// Captures of the preamble line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreambleMatch<'a> {
    /// Provider GUID text
    pub provider_id: &'a str,
    /// Component name
    pub component_name: &'a str,
    /// Source file name following `SRC=`
    pub source_file: &'a str,
}

/// Which event header layout matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVariant {
    /// `#typev <locator> <opcode> ...`
    Short,
    /// `#typev <locator> <extra> <opcode> ...`
    Extended,
}

/// Captures of an event header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHeaderMatch<'a> {
    /// Layout that matched
    pub variant: HeaderVariant,
    /// Source file plus line token
    pub locator: &'a str,
    /// Opcode digits (may be empty)
    pub opcode: &'a str,
    /// Format string between the quotes; not part of the schema
    pub description: &'a str,
    /// Token following the last `FUNC=`
    pub function: &'a str,
}

/// Captures of a field line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch<'a> {
    /// Everything before the last `", "`
    pub name: &'a str,
    /// Type token after the last `", "`
    pub type_token: &'a str,
}

const EVENT_HEADER_MARKER: &str = "#typev";
const FUNC_KEY: &str = "FUNC=";
const SRC_KEY: &str = "SRC=";
const COMMENT: &str = "//";
const FIELD_SEPARATOR: &str = ", ";

/// Returns the leading run of non-whitespace characters
fn leading_token(s: &str) -> &str {
    s.split(char::is_whitespace).next().unwrap_or("")
}

/// Finds the last `key` in `s` that is followed by a non-empty token
fn last_keyed_token<'a>(s: &'a str, key: &str) -> Option<&'a str> {
    s.rmatch_indices(key)
        .map(|(pos, _)| leading_token(&s[pos + key.len()..]))
        .find(|token| !token.is_empty())
}

/// Matches the preamble grammar `<provider> <component> //...SRC=<file>`.
///
/// Provider and component are separated by exactly one space each; only
/// the last `SRC=` with a non-empty value counts.
pub fn match_preamble(line: &str) -> Option<PreambleMatch<'_>> {
    let (provider_id, rest) = line.split_once(' ')?;
    let (component_name, rest) = rest.split_once(' ')?;
    if provider_id.contains(char::is_whitespace) || component_name.contains(char::is_whitespace)
    {
        return None;
    }

    let comment = rest.strip_prefix(COMMENT)?;
    let source_file = last_keyed_token(comment, SRC_KEY)?;

    Some(PreambleMatch {
        provider_id,
        component_name,
        source_file,
    })
}

/// Splits `"<description>" <ws> //...FUNC=<function>` into description and
/// function. The description runs to the last quote that is followed by
/// whitespace and a comment holding `FUNC=`.
fn match_description_and_function(quoted: &str) -> Option<(&str, &str)> {
    let body = quoted.strip_prefix('"')?;

    body.rmatch_indices('"').find_map(|(close, _)| {
        let after = &body[close + 1..];
        let trimmed = after.trim_start();
        if trimmed.len() == after.len() {
            return None;
        }
        let comment = trimmed.strip_prefix(COMMENT)?;
        let (pos, _) = comment.rmatch_indices(FUNC_KEY).next()?;
        let function = leading_token(&comment[pos + FUNC_KEY.len()..]);
        Some((&body[..close], function))
    })
}

/// Positional captures between `#typev` and the description
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Any run of non-whitespace, possibly empty
    Token,
    /// A run of ASCII digits, possibly empty
    Digits,
}

impl Slot {
    fn accepts(self, c: char) -> bool {
        match self {
            Slot::Token => !c.is_whitespace(),
            Slot::Digits => c.is_ascii_digit(),
        }
    }
}

impl HeaderVariant {
    fn slots(self) -> &'static [Slot] {
        match self {
            HeaderVariant::Short => &[Slot::Token, Slot::Digits],
            HeaderVariant::Extended => &[Slot::Token, Slot::Token, Slot::Digits],
        }
    }
}

/// Matches `<ws> <slot> <ws> <slot> ... <ws> "<description>" ...`.
///
/// Each whitespace run is tried longest first and may give up characters
/// to the next run, so `a  "x"` fills a trailing slot with the empty
/// string. Slot captures are pushed onto `captures`.
fn match_slots<'a>(
    s: &'a str,
    slots: &[Slot],
    captures: &mut Vec<&'a str>,
) -> Option<(&'a str, &'a str)> {
    let run_ends: Vec<usize> = s
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .collect();

    for &end in run_ends.iter().rev() {
        let rest = &s[end..];
        let Some((&slot, remaining)) = slots.split_first() else {
            if let Some(found) = match_description_and_function(rest) {
                return Some(found);
            }
            continue;
        };

        // A shorter capture would be followed by a non-whitespace char.
        let len = rest.find(|c: char| !slot.accepts(c)).unwrap_or(rest.len());
        captures.push(&rest[..len]);
        if let Some(found) = match_slots(&rest[len..], remaining, captures) {
            return Some(found);
        }
        captures.pop();
    }
    None
}

/// Matches an event header against one layout
fn match_event_header_variant(line: &str, variant: HeaderVariant) -> Option<EventHeaderMatch<'_>> {
    let rest = line.strip_prefix(EVENT_HEADER_MARKER)?;
    let mut captures = Vec::with_capacity(3);
    let (description, function) = match_slots(rest, variant.slots(), &mut captures)?;
    let (locator, opcode) = match captures.as_slice() {
        [locator, .., opcode] => (*locator, *opcode),
        _ => return None,
    };

    Some(EventHeaderMatch {
        variant,
        locator,
        opcode,
        description,
        function,
    })
}

/// Matches an assembled event header, trying the short layout first and
/// the extended layout second
pub fn match_event_header(line: &str) -> Option<EventHeaderMatch<'_>> {
    match_event_header_variant(line, HeaderVariant::Short)
        .or_else(|| match_event_header_variant(line, HeaderVariant::Extended))
}

/// Splits a field line on its last `", "`
pub fn match_field(line: &str) -> Option<FieldMatch<'_>> {
    let (name, rest) = line.rsplit_once(FIELD_SEPARATOR)?;
    Some(FieldMatch {
        name,
        type_token: leading_token(rest),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble() {
        let m = match_preamble(
            "f73bbb29-e2f0-93e7-ee22-e396f8fe1570 RgsClientsLib // SRC=matchmakinglocator.cs MJ= MN=",
        )
        .unwrap();
        assert_eq!(m.provider_id, "f73bbb29-e2f0-93e7-ee22-e396f8fe1570");
        assert_eq!(m.component_name, "RgsClientsLib");
        assert_eq!(m.source_file, "matchmakinglocator.cs");
    }

    #[test]
    fn test_preamble_rejects_malformed() {
        assert!(match_preamble("PDB: c:\\foo.pdb").is_none());
        assert!(match_preamble("guid comp SRC=foo.c").is_none());
        assert!(match_preamble("guid comp // MJ= MN=").is_none());
        assert!(match_preamble("guid comp // SRC= MJ=").is_none());
    }

    #[test]
    fn test_preamble_uses_last_non_empty_src() {
        let m = match_preamble("g c // SRC=a.c SRC=b.c SRC=").unwrap();
        assert_eq!(m.source_file, "b.c");
    }

    #[test]
    fn test_short_header() {
        let m = match_event_header(
            "#typev matchmakinglocator_cs120 11 \"%0Locating %10!s!\" //   LEVEL=Info FUNC=MatchMakingLocator.Locate",
        )
        .unwrap();
        assert_eq!(m.variant, HeaderVariant::Short);
        assert_eq!(m.locator, "matchmakinglocator_cs120");
        assert_eq!(m.opcode, "11");
        assert_eq!(m.description, "%0Locating %10!s!");
        assert_eq!(m.function, "MatchMakingLocator.Locate");
    }

    #[test]
    fn test_extended_header() {
        let m = match_event_header(
            "#typev  sipstack_cpp88 DEADBEEF 17 \"%0Sent %10!d! bytes\" // LEVEL=Verbose FUNC=CSipStack::Send",
        )
        .unwrap();
        assert_eq!(m.variant, HeaderVariant::Extended);
        assert_eq!(m.locator, "sipstack_cpp88");
        assert_eq!(m.opcode, "17");
        assert_eq!(m.function, "CSipStack::Send");
    }

    #[test]
    fn test_header_description_with_quotes() {
        let m = match_event_header(
            "#typev f_c1 2 \"said \"hi\" // not yet\" // FUNC=Greet",
        )
        .unwrap();
        assert_eq!(m.description, "said \"hi\" // not yet");
        assert_eq!(m.function, "Greet");
    }

    #[test]
    fn test_header_with_empty_opcode() {
        let m = match_event_header("#typev foo_c10  \"%0x\" // FUNC=Open").unwrap();
        assert_eq!(m.variant, HeaderVariant::Short);
        assert_eq!(m.locator, "foo_c10");
        assert_eq!(m.opcode, "");
        assert_eq!(m.function, "Open");

        let m = match_event_header("#typev foo_c10 Extra  \"%0x\" // FUNC=Open").unwrap();
        assert_eq!(m.variant, HeaderVariant::Extended);
        assert_eq!(m.locator, "foo_c10");
        assert_eq!(m.opcode, "");
    }

    #[test]
    fn test_header_locator_may_contain_quote() {
        let m = match_event_header("#typev a\"b 4 \"%0x\" // FUNC=F").unwrap();
        assert_eq!(m.locator, "a\"b");
        assert_eq!(m.opcode, "4");
        assert_eq!(m.description, "%0x");
    }

    #[test]
    fn test_header_rejects_malformed() {
        assert!(match_event_header("#typev f_c1 \"x\" // FUNC=F").is_none());
        assert!(match_event_header("#typev f_c1 12 \"x\" // LEVEL=1").is_none());
        assert!(match_event_header("#typev f_c1 1a \"x\" // FUNC=F").is_none());
        assert!(match_event_header("#typevf_c1 12 \"x\" // FUNC=F").is_none());
        assert!(match_event_header("f_c1 12 \"x\" // FUNC=F").is_none());
        assert!(match_event_header("#typev f_c1 12 \"x\"// FUNC=F").is_none());
    }

    #[test]
    fn test_field_split_on_last_separator() {
        let m = match_field("Some, Name, win:Int32").unwrap();
        assert_eq!(m.name, "Some, Name");
        assert_eq!(m.type_token, "win:Int32");

        let m = match_field("bytes, ItemLong -- 10").unwrap();
        assert_eq!(m.name, "bytes");
        assert_eq!(m.type_token, "ItemLong");
    }

    #[test]
    fn test_field_without_separator() {
        assert!(match_field("justtext").is_none());
        assert!(match_field("a,b").is_none());
    }
}
