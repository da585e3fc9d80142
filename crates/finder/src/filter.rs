use once_cell::sync::Lazy;
use regex::Regex;

/// Address prefixes treated as PO boxes. Kept exactly as the dataset
/// maintainers documented it, including the bare "Box" alternative.
static POBOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(PO Box)|(P.? ?O.? Box)|(Box))").expect("static PO box pattern")
});

/// Options narrowing which duplicates are reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinderFilters {
    /// Keep only groups with at least one record entered by this operator.
    pub entry_recorded_by: Option<String>,
    /// Ignore records whose primary address is a PO box.
    pub no_pobox: bool,
}

impl FinderFilters {
    pub fn new(entry_recorded_by: Option<String>, no_pobox: bool) -> Self {
        Self {
            entry_recorded_by: entry_recorded_by.filter(|s| !s.is_empty()),
            no_pobox,
        }
    }
}

/// Case-insensitive PO box match anchored at the start of the address.
pub fn is_pobox(address: &str) -> bool {
    POBOX_RE.is_match(address)
}
