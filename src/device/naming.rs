use super::ModeSuffix;
use lazy_regex::regex_captures;

/// Names that share the `st` prefix but are never tape devices
const RESERVED_NAMES: &[&str] = &["stdin", "stdout", "stderr"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName {
    pub drive_number: u32,
    pub rewinding: bool,
    pub mode: ModeSuffix,
}

/// Parse a `/dev` entry name of the form `st<N>[alm]` or `nst<N>[alm]`.
pub fn parse_device_name(name: &str) -> Option<ParsedName> {
    if RESERVED_NAMES.contains(&name) {
        return None;
    }

    let (_, no_rewind, number, suffix) = regex_captures!(r"^(n?)st(\d+)([alm]?)$", name)?;
    let drive_number = number.parse().ok()?;
    let mode = match suffix.chars().next() {
        None => ModeSuffix::Default,
        Some(letter) => ModeSuffix::from_letter(letter)?,
    };

    Some(ParsedName {
        drive_number,
        rewinding: no_rewind.is_empty(),
        mode,
    })
}

/// True when the file name ends in one of the mode letters
pub fn ends_with_mode_letter(name: &str) -> bool {
    name.chars()
        .last()
        .and_then(ModeSuffix::from_letter)
        .is_some()
}
