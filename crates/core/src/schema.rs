// Column schema of the repository dataset

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Name of the identifier column. Always the first column on disk.
pub const ID_COLUMN: &str = "id";

/// Full column list in file order, identifier first.
pub const COLUMNS: [&str; Field::COUNT + 1] = [
    ID_COLUMN,
    "repository_name_unauthorized",
    "name_notes",
    "parent_org_unauthorized",
    "repository_name_authorized",
    "repository_identifier_authorized",
    "repository_type",
    "location_type",
    "street_address_1",
    "street_address_2",
    "st_city",
    "st_zip_code_5_numbers",
    "st_zip_code_4_following_numbers",
    "street_address_county",
    "state",
    "url",
    "latitude",
    "longitude",
    "language_of_entry",
    "date_entry_recorded",
    "entry_recorded_by",
    "source_of_repository_data",
    "url_of_source_of_repository_data",
    "geocode_confidence",
    "notes",
    "date_entry_updated",
];

/// A writable (non-identifier) column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    RepositoryNameUnauthorized,
    NameNotes,
    ParentOrgUnauthorized,
    RepositoryNameAuthorized,
    RepositoryIdentifierAuthorized,
    RepositoryType,
    LocationType,
    StreetAddress1,
    StreetAddress2,
    City,
    ZipCode5,
    ZipCode4,
    County,
    State,
    Url,
    Latitude,
    Longitude,
    LanguageOfEntry,
    DateEntryRecorded,
    EntryRecordedBy,
    SourceOfRepositoryData,
    UrlOfSourceOfRepositoryData,
    GeocodeConfidence,
    Notes,
    DateEntryUpdated,
}

impl Field {
    pub const COUNT: usize = 25;

    /// All fields in schema order.
    pub const ALL: [Field; Field::COUNT] = [
        Field::RepositoryNameUnauthorized,
        Field::NameNotes,
        Field::ParentOrgUnauthorized,
        Field::RepositoryNameAuthorized,
        Field::RepositoryIdentifierAuthorized,
        Field::RepositoryType,
        Field::LocationType,
        Field::StreetAddress1,
        Field::StreetAddress2,
        Field::City,
        Field::ZipCode5,
        Field::ZipCode4,
        Field::County,
        Field::State,
        Field::Url,
        Field::Latitude,
        Field::Longitude,
        Field::LanguageOfEntry,
        Field::DateEntryRecorded,
        Field::EntryRecordedBy,
        Field::SourceOfRepositoryData,
        Field::UrlOfSourceOfRepositoryData,
        Field::GeocodeConfidence,
        Field::Notes,
        Field::DateEntryUpdated,
    ];

    /// Composite key: name.
    pub const NAME: Field = Field::RepositoryNameUnauthorized;
    /// Composite key: city.
    pub const CITY: Field = Field::City;
    /// Composite key: state.
    pub const STATE: Field = Field::State;
    /// Primary address; records without one are never compared.
    pub const PRIMARY_ADDRESS: Field = Field::StreetAddress1;
    /// Operator who entered the record.
    pub const RECORDED_BY: Field = Field::EntryRecordedBy;
    /// Stamped when a record is edited.
    pub const UPDATED: Field = Field::DateEntryUpdated;

    /// Position in [`Field::ALL`] (0-based).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column header as it appears on disk.
    pub fn name(self) -> &'static str {
        COLUMNS[self.index() + 1]
    }

    /// Date-time typed columns.
    pub fn is_timestamp(self) -> bool {
        matches!(self, Field::DateEntryRecorded | Field::DateEntryUpdated)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A column name that is not a writable schema field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A displayed column: the identifier or a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Field(Field),
}

impl Column {
    /// Resolve a 1-based schema position (1 = `id`).
    pub fn at(position: usize) -> Option<Column> {
        match position {
            0 => None,
            1 => Some(Column::Id),
            n => Field::ALL.get(n - 2).copied().map(Column::Field),
        }
    }

    /// All columns in display order.
    pub fn all() -> impl Iterator<Item = Column> {
        std::iter::once(Column::Id).chain(Field::ALL.iter().copied().map(Column::Field))
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::Id => ID_COLUMN,
            Column::Field(f) => f.name(),
        }
    }

    /// The writable field, or `UnknownField` for the identifier.
    pub fn writable(self) -> Result<Field, UnknownField> {
        match self {
            Column::Id => Err(UnknownField(ID_COLUMN.to_string())),
            Column::Field(f) => Ok(f),
        }
    }
}
