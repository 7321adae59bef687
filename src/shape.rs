//! Record shapes: the two leak layouts the ingester understands.
//!
//! A shape is fixed for a whole run and carries everything the other
//! components need to know about it as data: delimiter, arity, column order,
//! table name and the SQL used against the store.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordShape {
    /// `user:pass` lines.
    Combolist,
    /// `url,user,pass` lines harvested by infostealer malware.
    Infostealer,
}

impl RecordShape {
    pub const ALL: [RecordShape; 2] = [RecordShape::Combolist, RecordShape::Infostealer];

    pub fn delimiter(self) -> char {
        match self {
            RecordShape::Combolist => ':',
            RecordShape::Infostealer => ',',
        }
    }

    pub fn arity(self) -> usize {
        self.columns().len()
    }

    /// Field names in the order they are parsed, hashed and stored.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            RecordShape::Combolist => &["user", "pass"],
            RecordShape::Infostealer => &["url", "user", "pass"],
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            RecordShape::Combolist => "combolist_leaks",
            RecordShape::Infostealer => "infostealer_leaks",
        }
    }

    /// Store file used when the caller does not name one.
    pub fn default_store_file(self) -> &'static str {
        match self {
            RecordShape::Combolist => "combolists-leaks.sqlite",
            RecordShape::Infostealer => "infostealer-leaks.sqlite",
        }
    }

    /// Command-line flag that selects this shape.
    pub fn flag(self) -> &'static str {
        match self {
            RecordShape::Combolist => "--combolist",
            RecordShape::Infostealer => "--infostealer",
        }
    }

    pub(crate) fn create_table_sql(self) -> &'static str {
        match self {
            RecordShape::Combolist => {
                r#"
                CREATE TABLE IF NOT EXISTS combolist_leaks (
                    id INTEGER PRIMARY KEY,
                    timestamp TIMESTAMP,
                    hash TEXT,
                    user TEXT,
                    pass TEXT
                )
                "#
            }
            RecordShape::Infostealer => {
                r#"
                CREATE TABLE IF NOT EXISTS infostealer_leaks (
                    id INTEGER PRIMARY KEY,
                    timestamp TIMESTAMP,
                    hash TEXT,
                    url TEXT,
                    user TEXT,
                    pass TEXT
                )
                "#
            }
        }
    }

    pub(crate) fn insert_sql(self) -> &'static str {
        match self {
            RecordShape::Combolist => {
                "INSERT INTO combolist_leaks (timestamp, hash, user, pass) VALUES (?1, ?2, ?3, ?4)"
            }
            RecordShape::Infostealer => {
                "INSERT INTO infostealer_leaks (timestamp, hash, url, user, pass) VALUES (?1, ?2, ?3, ?4, ?5)"
            }
        }
    }

    pub(crate) fn select_hashes_sql(self) -> &'static str {
        match self {
            RecordShape::Combolist => "SELECT hash FROM combolist_leaks",
            RecordShape::Infostealer => "SELECT hash FROM infostealer_leaks",
        }
    }

    pub(crate) fn count_sql(self) -> &'static str {
        match self {
            RecordShape::Combolist => "SELECT COUNT(*) FROM combolist_leaks",
            RecordShape::Infostealer => "SELECT COUNT(*) FROM infostealer_leaks",
        }
    }
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordShape::Combolist => f.write_str("combolist"),
            RecordShape::Infostealer => f.write_str("infostealer"),
        }
    }
}
