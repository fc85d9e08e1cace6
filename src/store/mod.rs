//! Versioned XML persistence for target collections.
//!
//! One file per target kind. The root element records which release wrote the
//! file; files from older releases are patched forward on load (see
//! [`schema`]) and immediately rewritten with current markers. Saves are full
//! delete-then-rewrite operations: the store never holds partial state between
//! rewrites, and an interruption between delete and write is an accepted
//! failure mode (the next load simply bootstraps).

pub mod schema;

use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::capture::{DisplayInfo, ImageFormat};
use crate::targets::{Region, Screen, Target, TargetCollection};
use schema::MigrationStep;

const ROOT_TAG: &str = "autoshot";
const VERSION_ATTR: &str = "version";
const CODENAME_ATTR: &str = "codename";
const INDENT: usize = 2;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid value {value:?} for field \"{tag}\"")]
    InvalidField { tag: String, value: String },
}

fn invalid_field(tag: &str, value: &str) -> StoreError {
    StoreError::InvalidField { tag: tag.to_string(), value: value.to_string() }
}

pub(crate) fn parse_bool(tag: &str, value: &str) -> Result<bool, StoreError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid_field(tag, value)),
    }
}

pub(crate) fn parse_num<T: FromStr>(tag: &str, value: &str) -> Result<T, StoreError> {
    value.trim().parse().map_err(|_| invalid_field(tag, value))
}

pub(crate) fn parse_uuid(tag: &str, value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value.trim()).map_err(|_| invalid_field(tag, value))
}

pub(crate) fn parse_format(tag: &str, value: &str) -> Result<ImageFormat, StoreError> {
    ImageFormat::from_name(value).ok_or_else(|| invalid_field(tag, value))
}

/// What the loader needs to synthesize defaults when no store file exists.
#[derive(Debug, Clone)]
pub struct BootstrapEnv {
    pub displays: Vec<DisplayInfo>,
    /// Destination folder for bootstrapped targets, separator-terminated.
    pub screenshots_folder: String,
    pub filename_macro: String,
}

/// Persistence surface a target kind implements to live in a [`TargetStore`].
pub trait StoreRecord: Target + Default + Clone {
    const LIST_TAG: &'static str;
    const ENTRY_TAG: &'static str;

    fn set_active(&mut self, active: bool);

    /// Apply one decoded field. Unknown tags are ignored; undecodable values
    /// are errors that abort the load.
    fn apply_field(&mut self, tag: &str, value: &str) -> Result<(), StoreError>;

    /// Encoded fields in the fixed on-disk order.
    fn fields(&self) -> Vec<(&'static str, String)>;

    /// Entities synthesized when no store file exists.
    fn bootstrap(env: &BootstrapEnv) -> Vec<Self>;
}

/// Versioned file store for one target kind.
pub struct TargetStore<T: StoreRecord> {
    path: Option<PathBuf>,
    default_path: PathBuf,
    _kind: PhantomData<T>,
}

pub type ScreenStore = TargetStore<Screen>;
pub type RegionStore = TargetStore<Region>;

impl<T: StoreRecord> TargetStore<T> {
    /// `path` is the configured file location; `default_path` is used when no
    /// location has been configured yet (first run).
    pub fn new(path: Option<PathBuf>, default_path: PathBuf) -> Self {
        Self { path, default_path, _kind: PhantomData }
    }

    /// The resolved file location, once known.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Materialize the collection from disk, or bootstrap defaults (and
    /// immediately save them) when no file exists.
    ///
    /// On error the collection keeps whatever was appended before the
    /// failure; nothing is rolled back.
    pub fn load(
        &mut self,
        collection: &mut TargetCollection<T>,
        env: &BootstrapEnv,
    ) -> Result<(), StoreError> {
        match self.path.clone() {
            Some(path) if path.exists() => {
                let result = self.load_file(&path, collection);
                if let Err(err) = &result {
                    error!(
                        file = %path.display(),
                        error = %err,
                        "failed to load {} store", T::LIST_TAG
                    );
                }
                result
            }
            _ => {
                debug!("no {} store on disk; bootstrapping defaults", T::LIST_TAG);
                for target in T::bootstrap(env) {
                    collection.add(target);
                }
                // Establishes the file for the next run.
                self.save(collection)
            }
        }
    }

    fn load_file(
        &mut self,
        path: &Path,
        collection: &mut TargetCollection<T>,
    ) -> Result<(), StoreError> {
        let text = fs::read_to_string(path)?;
        let doc = parse_document(&text, T::ENTRY_TAG)?;

        let outdated = schema::is_outdated(doc.codename.as_deref(), doc.version.as_deref());
        // Patches apply only when the file names a release we know; an
        // unrecognized marker still gets the normalizing re-save below.
        let pending: Vec<MigrationStep> = doc
            .codename
            .as_deref()
            .zip(doc.version.as_deref())
            .and_then(|(codename, version)| schema::find_release(codename, version))
            .map(|release| schema::pending_migrations(release.number))
            .unwrap_or_default();

        if !pending.is_empty() {
            debug!(
                version = doc.version.as_deref().unwrap_or("?"),
                "{} store predates the current schema; patching entries forward",
                T::LIST_TAG
            );
        }

        for entry in &doc.entries {
            let mut target = T::default();
            for (tag, value) in entry {
                target.apply_field(tag, value)?;
            }
            for step in &pending {
                match step {
                    MigrationStep::ForceActive => target.set_active(true),
                }
            }
            if target.name().is_empty() {
                debug!("discarding {} entry with empty name", T::ENTRY_TAG);
            } else {
                collection.add(target);
            }
        }

        if outdated {
            info!(
                file = %path.display(),
                "{} store written by an older release; rewriting with current markers",
                T::LIST_TAG
            );
            self.save(collection)?;
        }

        Ok(())
    }

    /// Full rewrite: delete any existing file, then write a fresh document
    /// with current version markers and one entry per target in collection
    /// order. No retry on failure.
    pub fn save(&mut self, collection: &TargetCollection<T>) -> Result<(), StoreError> {
        let result = self.write_file(collection);
        if let Err(err) = &result {
            error!(error = %err, "failed to save {} store", T::LIST_TAG);
        }
        result
    }

    fn write_file(&mut self, collection: &TargetCollection<T>) -> Result<(), StoreError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                info!(
                    file = %self.default_path.display(),
                    "{} store path unset; using default", T::LIST_TAG
                );
                self.path = Some(self.default_path.clone());
                self.default_path.clone()
            }
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if path.exists() {
            fs::remove_file(&path)?;
        }

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut root = BytesStart::new(ROOT_TAG);
        root.push_attribute((VERSION_ATTR, schema::CURRENT.number.to_string().as_str()));
        root.push_attribute((CODENAME_ATTR, schema::CURRENT.codename));
        writer.write_event(Event::Start(root))?;
        writer.write_event(Event::Start(BytesStart::new(T::LIST_TAG)))?;

        for target in collection {
            writer.write_event(Event::Start(BytesStart::new(T::ENTRY_TAG)))?;
            for (tag, value) in target.fields() {
                writer.write_event(Event::Start(BytesStart::new(tag)))?;
                writer.write_event(Event::Text(BytesText::from_escaped(entitize(&value))))?;
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
            }
            writer.write_event(Event::End(BytesEnd::new(T::ENTRY_TAG)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(T::LIST_TAG)))?;
        writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;

        fs::write(&path, writer.into_inner())?;
        Ok(())
    }
}

struct ParsedDocument {
    version: Option<String>,
    codename: Option<String>,
    entries: Vec<BTreeMap<String, String>>,
}

/// Parse the whole document into version markers plus one tag->text map per
/// entry element. Field order on disk does not matter; repeated tags keep the
/// last value.
fn parse_document(text: &str, entry_tag: &str) -> Result<ParsedDocument, StoreError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut doc = ParsedDocument { version: None, codename: None, entries: Vec::new() };
    let mut current: Option<BTreeMap<String, String>> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                if name == ROOT_TAG {
                    for attr in element.attributes() {
                        let attr = attr?;
                        let value = String::from_utf8_lossy(&attr.value).into_owned();
                        match attr.key.as_ref() {
                            key if key == VERSION_ATTR.as_bytes() => doc.version = Some(value),
                            key if key == CODENAME_ATTR.as_bytes() => doc.codename = Some(value),
                            _ => {}
                        }
                    }
                } else if name == entry_tag && current.is_none() {
                    current = Some(BTreeMap::new());
                } else if current.is_some() {
                    field = Some(name);
                }
            }
            Event::Text(value) => {
                if let (Some(entry), Some(tag)) = (current.as_mut(), field.as_ref()) {
                    entry.insert(tag.clone(), value.unescape()?.into_owned());
                }
            }
            Event::End(element) => {
                if element.name().as_ref() == entry_tag.as_bytes() && field.is_none() {
                    if let Some(entry) = current.take() {
                        doc.entries.push(entry);
                    }
                } else {
                    field = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

/// Escape text content, entitizing newlines so multi-line values survive
/// indented output.
fn entitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}
