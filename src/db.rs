use crate::i18n::{StoreError, SubtagRecord, SubtagStore, COLLECTION_SCOPE};
use crate::registry::{RecordType, RegistryData, RegistryRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

const SCHEMA: &[(&str, &str)] = &[
    (
        "zlsSubtagData",
        "CREATE TABLE IF NOT EXISTS zlsSubtagData (
            id INTEGER PRIMARY KEY,
            value TEXT NOT NULL UNIQUE
        )",
    ),
    (
        "zlsSubtags",
        "CREATE TABLE IF NOT EXISTS zlsSubtags (
            seq INTEGER PRIMARY KEY,
            subtag INT,
            tag INT,
            type INT NOT NULL,
            suppressscript INT,
            scope INT,
            preferredvalue INT,
            macrolanguage INT,
            added INT,
            description INT,
            deprecated INT,
            comment INT,
            prefix INT
        )",
    ),
    (
        "isoTagMap",
        "CREATE TABLE IF NOT EXISTS isoTagMap (
            iso TEXT PRIMARY KEY,
            iana TEXT NOT NULL
        )",
    ),
    (
        "unicodeScriptMap",
        "CREATE TABLE IF NOT EXISTS unicodeScriptMap (
            fromCode INT PRIMARY KEY,
            toCode INT NOT NULL,
            script TEXT NOT NULL
        )",
    ),
    (
        "unicodeScriptMap_toCode",
        "CREATE INDEX IF NOT EXISTS unicodeScriptMap_toCode ON unicodeScriptMap(toCode)",
    ),
    (
        "zlsMeta",
        "CREATE TABLE IF NOT EXISTS zlsMeta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    ),
];

const FILE_DATE_KEY: &str = "fileDate";

// Registry entries repeat once per prefix; the lowest seq is the first one imported.
const SUBTAG_QUERY: &str = "SELECT TA.value, D.value FROM zlsSubtags S
     LEFT JOIN zlsSubtagData TA ON S.subtag = TA.id
     LEFT JOIN zlsSubtagData TY ON S.type = TY.id
     LEFT JOIN zlsSubtagData D ON S.description = D.id
     WHERE TY.value = ?1 AND TA.value = ?2
     ORDER BY S.seq LIMIT 1";

const LANGUAGE_QUERY: &str = "SELECT TA.value, D.value FROM zlsSubtags S
     LEFT JOIN zlsSubtagData TA ON S.subtag = TA.id
     LEFT JOIN zlsSubtagData TY ON S.type = TY.id
     LEFT JOIN zlsSubtagData D ON S.description = D.id
     LEFT JOIN zlsSubtagData SC ON S.scope = SC.id
     WHERE TY.value = ?1 AND TA.value = ?2
       AND (S.scope IS NULL OR NOT SC.value = ?3)
     ORDER BY S.seq LIMIT 1";

const TAG_QUERY: &str = "SELECT TA.value, D.value FROM zlsSubtags S
     LEFT JOIN zlsSubtagData TA ON S.tag = TA.id
     LEFT JOIN zlsSubtagData TY ON S.type = TY.id
     LEFT JOIN zlsSubtagData D ON S.description = D.id
     WHERE TY.value = ?1 AND TA.value = ?2
     ORDER BY S.seq LIMIT 1";

/// Row counts written by [`Database::import_registry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub records: usize,
    pub subtag_rows: usize,
    pub values: usize,
    pub iso_aliases: usize,
    pub script_ranges: usize,
}

/// SQLite-backed subtag reference tables.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database and make sure the tables exist
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .context(format!("Failed to open database at {}", database_path))?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests and one-off imports
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        for (name, sql) in SCHEMA {
            conn.execute(sql, [])
                .context(format!("Failed to create {}", name))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the reference tables with freshly parsed registry data.
    ///
    /// Runs in a single transaction: on failure the previous contents are kept.
    pub fn import_registry(&self, data: &RegistryData) -> Result<ImportSummary> {
        let conn = self.lock();
        conn.execute("BEGIN TRANSACTION", [])?;

        match Self::import_registry_inner(&conn, data) {
            Ok(summary) => {
                conn.execute("COMMIT", [])?;
                info!(
                    "Imported {} registry records ({} rows, {} values), {} ISO 639-2 aliases, {} script ranges",
                    summary.records,
                    summary.subtag_rows,
                    summary.values,
                    summary.iso_aliases,
                    summary.script_ranges
                );
                Ok(summary)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e).context("Registry import failed and was rolled back")
            }
        }
    }

    fn import_registry_inner(conn: &Connection, data: &RegistryData) -> Result<ImportSummary> {
        for table in ["zlsSubtags", "zlsSubtagData", "isoTagMap", "unicodeScriptMap", "zlsMeta"] {
            conn.execute(&format!("DELETE FROM {}", table), [])
                .context(format!("Failed to clear {}", table))?;
        }

        let mut interner = Interner::new(conn);
        let mut summary = ImportSummary::default();

        for record in &data.records {
            summary.subtag_rows += insert_record(conn, &mut interner, record)
                .context(format!("Failed to import registry record {:?}", record.key()))?;
            summary.records += 1;
        }
        summary.values = interner.len();

        for alias in &data.iso_aliases {
            conn.execute(
                "INSERT OR REPLACE INTO isoTagMap (iso, iana) VALUES (?1, ?2)",
                params![alias.iso, alias.iana],
            )
            .context(format!("Failed to import ISO 639-2 alias {}", alias.iso))?;
            summary.iso_aliases += 1;
        }

        for range in &data.script_ranges {
            conn.execute(
                "INSERT OR REPLACE INTO unicodeScriptMap (fromCode, toCode, script) VALUES (?1, ?2, ?3)",
                params![range.from, range.to, range.script],
            )
            .context(format!("Failed to import script range {:X}", range.from))?;
            summary.script_ranges += 1;
        }

        if let Some(date) = data.file_date {
            conn.execute(
                "INSERT OR REPLACE INTO zlsMeta (key, value) VALUES (?1, ?2)",
                params![FILE_DATE_KEY, date.format("%Y-%m-%d").to_string()],
            )
            .context("Failed to store registry file date")?;
        }

        Ok(summary)
    }

    /// `File-Date` of the last imported registry, if any
    pub fn registry_file_date(&self) -> Result<Option<NaiveDate>> {
        let conn = self.lock();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM zlsMeta WHERE key = ?1",
                params![FILE_DATE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|date| {
                NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .context(format!("Stored registry date '{}' is invalid", date))
            })
            .transpose()
    }

    /// Number of distinct registry entries, ignoring per-prefix duplicates
    pub fn subtag_count(&self) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT type, subtag, tag FROM zlsSubtags)",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Assigns ids to distinct values in `zlsSubtagData`.
struct Interner<'a> {
    conn: &'a Connection,
    ids: HashMap<String, i64>,
}

impl<'a> Interner<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            ids: HashMap::new(),
        }
    }

    fn id(&mut self, value: Option<&str>) -> rusqlite::Result<Option<i64>> {
        let value = match value {
            Some(value) => value,
            None => return Ok(None),
        };
        if let Some(id) = self.ids.get(value) {
            return Ok(Some(*id));
        }

        let id = self.ids.len() as i64 + 1;
        self.conn.execute(
            "INSERT INTO zlsSubtagData (id, value) VALUES (?1, ?2)",
            params![id, value],
        )?;
        self.ids.insert(value.to_string(), id);
        Ok(Some(id))
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Write one row per prefix (or a single row without one). Returns rows written.
fn insert_record(
    conn: &Connection,
    interner: &mut Interner<'_>,
    record: &RegistryRecord,
) -> rusqlite::Result<usize> {
    let subtag = interner.id(record.subtag.as_deref())?;
    let tag = interner.id(record.tag.as_deref())?;
    let record_type = interner.id(Some(record.record_type.as_str()))?;
    let suppress_script = interner.id(record.suppress_script.as_deref())?;
    let scope = interner.id(record.scope.as_deref())?;
    let preferred_value = interner.id(record.preferred_value.as_deref())?;
    let macrolanguage = interner.id(record.macrolanguage.as_deref())?;
    let added = interner.id(record.added.as_deref())?;
    let description = interner.id(record.description.as_deref())?;
    let deprecated = interner.id(record.deprecated.as_deref())?;
    let comment = interner.id(record.comments.as_deref())?;

    let prefixes: Vec<Option<&str>> = if record.prefixes.is_empty() {
        vec![None]
    } else {
        record.prefixes.iter().map(|p| Some(p.as_str())).collect()
    };

    for prefix in &prefixes {
        let prefix = interner.id(*prefix)?;
        conn.execute(
            "INSERT INTO zlsSubtags (subtag, tag, type, suppressscript, scope, preferredvalue,
                macrolanguage, added, description, deprecated, comment, prefix)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                subtag,
                tag,
                record_type,
                suppress_script,
                scope,
                preferred_value,
                macrolanguage,
                added,
                description,
                deprecated,
                comment,
                prefix
            ],
        )?;
    }

    Ok(prefixes.len())
}

impl SubtagStore for Database {
    fn iso639_2_alias(&self, code: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let iana = conn
            .query_row(
                "SELECT iana FROM isoTagMap WHERE iso = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(iana)
    }

    fn find_subtag(
        &self,
        record_type: RecordType,
        value: &str,
    ) -> Result<Option<SubtagRecord>, StoreError> {
        let conn = self.lock();
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(SubtagRecord {
                subtag: row.get(0)?,
                description: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        };

        let record = match record_type {
            RecordType::Language => conn
                .query_row(
                    LANGUAGE_QUERY,
                    params![record_type.as_str(), value, COLLECTION_SCOPE],
                    map_row,
                )
                .optional()?,
            RecordType::Grandfathered => conn
                .query_row(TAG_QUERY, params![record_type.as_str(), value], map_row)
                .optional()?,
            _ => conn
                .query_row(SUBTAG_QUERY, params![record_type.as_str(), value], map_row)
                .optional()?,
        };

        if record.is_none() {
            debug!("No {} entry for '{}'", record_type, value);
        }
        Ok(record)
    }

    fn script_for_code_point(&self, code_point: u32) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let script = conn
            .query_row(
                "SELECT script FROM unicodeScriptMap WHERE fromCode <= ?1 AND toCode >= ?1",
                params![code_point],
                |row| row.get(0),
            )
            .optional()?;
        Ok(script)
    }
}
