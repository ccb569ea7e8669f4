// crates/strata-core/src/store/object_store.rs
// ============================================================================
// Module: Strata Object Store Catalog
// Description: Object registration, lookup, and payload persistence.
// Purpose: Maintain the metastore catalog and its filesystem payloads.
// Dependencies: arrow, prost, tracing, crate::{core, proto}
// ============================================================================

//! ## Overview
//! [`ObjectStore`] owns the catalog message and an id index over it. Menus,
//! configurations, and datasets are top-level objects; files, tables,
//! histogram and t-digest collections, job records, and logs are nested
//! under their dataset and indexed by id as well.
//!
//! Invariants:
//! - every indexed id resolves to exactly one catalog entry;
//! - partition files are only accepted for partitions registered on the
//!   dataset;
//! - content-hash collisions are disambiguated with a `_N` suffix, while an
//!   explicit id that is already present is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use arrow::ipc::reader::FileReader;
use arrow::ipc::reader::StreamReader;
use prost::Message;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::StoreError;
use super::backend::FilesystemKv;
use super::backend::path_from_address;
use super::meta::ContentKeys;
use super::meta::MetaObject;
use crate::core::generate_uuid;
use crate::core::hashing::hash_hex;
use crate::core::hashing::hash_reader;
use crate::core::identifiers;
use crate::core::now_timestamp;
use crate::core::wildcard_match;
use crate::proto::BlockInfo;
use crate::proto::ConfigObjectInfo;
use crate::proto::Configuration;
use crate::proto::CronusObject;
use crate::proto::CronusObjectStore;
use crate::proto::CronusStoreInfo;
use crate::proto::DatasetObjectInfo;
use crate::proto::FileObjectInfo;
use crate::proto::FileType;
use crate::proto::JobState;
use crate::proto::LogObjectInfo;
use crate::proto::Menu;
use crate::proto::MenuObjectInfo;
use crate::proto::TableObjectInfo;
use crate::proto::Transform;
use crate::proto::cronus_object::Info;

// ============================================================================
// SECTION: Catalog Locations
// ============================================================================

/// Child collection of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildKind {
    /// Partition and registered files.
    Files,
    /// Tables.
    Tables,
    /// Histogram collections.
    Hists,
    /// T-digest collections.
    Tdigests,
    /// Job records.
    Jobs,
    /// Job logs.
    Logs,
}

impl ChildKind {
    /// Returns the child kind that stores objects with this info.
    const fn for_info(info: &Info) -> Option<Self> {
        match info {
            Info::File(_) => Some(Self::Files),
            Info::Table(_) => Some(Self::Tables),
            Info::Hists(_) => Some(Self::Hists),
            Info::Tdigests(_) => Some(Self::Tdigests),
            Info::Job(_) => Some(Self::Jobs),
            Info::Log(_) => Some(Self::Logs),
            Info::Menu(_) | Info::Config(_) | Info::Dataset(_) => None,
        }
    }

    /// Borrows the matching collection.
    const fn collection(self, ds: &DatasetObjectInfo) -> &Vec<CronusObject> {
        match self {
            Self::Files => &ds.files,
            Self::Tables => &ds.tables,
            Self::Hists => &ds.hists,
            Self::Tdigests => &ds.tdigests,
            Self::Jobs => &ds.jobs,
            Self::Logs => &ds.logs,
        }
    }

    /// Mutably borrows the matching collection.
    const fn collection_mut(self, ds: &mut DatasetObjectInfo) -> &mut Vec<CronusObject> {
        match self {
            Self::Files => &mut ds.files,
            Self::Tables => &mut ds.tables,
            Self::Hists => &mut ds.hists,
            Self::Tdigests => &mut ds.tdigests,
            Self::Jobs => &mut ds.jobs,
            Self::Logs => &mut ds.logs,
        }
    }
}

/// Position of an object inside the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// Index into the top-level objects.
    Top(usize),
    /// Index into a dataset child collection.
    Child {
        /// Dataset position among top-level objects.
        dataset: usize,
        /// Child collection.
        kind: ChildKind,
        /// Index within the collection.
        index: usize,
    },
}

// ============================================================================
// SECTION: Streams
// ============================================================================

/// Reader returned by [`ObjectStore::open`], chosen by file type.
pub enum StoreStream {
    /// Arrow IPC file reader.
    Arrow(FileReader<BufReader<File>>),
    /// Arrow IPC stream reader.
    ArrowStream(StreamReader<BufReader<File>>),
    /// Plain buffered byte stream.
    Bytes(BufReader<File>),
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// Catalog plus payload directory.
#[derive(Debug)]
pub struct ObjectStore {
    /// Payload directory.
    kv: FilesystemKv,
    /// Catalog root.
    root: CronusObjectStore,
    /// Object id to catalog position.
    index: BTreeMap<String, Location>,
    /// Duplicate counters per colliding content hash.
    dups: BTreeMap<String, u64>,
}

impl ObjectStore {
    /// Opens an existing store when `uuid` is given, otherwise creates one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory or metastore cannot be read.
    pub fn new(root_path: &Path, name: &str, uuid: Option<&str>) -> Result<Self, StoreError> {
        match uuid {
            Some(uuid) => Self::load(root_path, name, uuid),
            None => Self::create(root_path, name),
        }
    }

    /// Creates a fresh, empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the root cannot be created.
    pub fn create(root_path: &Path, name: &str) -> Result<Self, StoreError> {
        let kv = FilesystemKv::open(root_path)?;
        let uuid = generate_uuid();
        let file_name = identifiers::store_name(&uuid, name);
        let address = kv.url_for(&file_name)?;
        let root = CronusObjectStore {
            name: file_name,
            uuid,
            parent_uuid: String::new(),
            address,
            info: Some(CronusStoreInfo {
                created: Some(now_timestamp()),
                objects: Vec::new(),
            }),
        };
        info!(store = %root.name, root = %kv.root().display(), "created object store");
        Ok(Self {
            kv,
            root,
            index: BTreeMap::new(),
            dups: BTreeMap::new(),
        })
    }

    /// Loads a persisted store and verifies its identity.
    ///
    /// `name` may be the bare store name or the full metastore file name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the metastore is absent and
    /// [`StoreError::Corrupt`] when it fails to decode or names another store.
    pub fn load(root_path: &Path, name: &str, uuid: &str) -> Result<Self, StoreError> {
        let kv = FilesystemKv::open(root_path)?;
        let file_name = if name.ends_with(".cronus.pb") {
            name.to_string()
        } else {
            identifiers::store_name(uuid, name)
        };
        let bytes = kv.get(&file_name)?;
        let root = CronusObjectStore::decode(bytes.as_slice())
            .map_err(|err| StoreError::Corrupt(format!("{file_name}: {err}")))?;
        if root.name != file_name || root.uuid != uuid {
            return Err(StoreError::Corrupt(format!(
                "metastore {file_name} holds store {} ({})",
                root.name, root.uuid
            )));
        }
        let mut store = Self {
            kv,
            root,
            index: BTreeMap::new(),
            dups: BTreeMap::new(),
        };
        store.rebuild_index()?;
        info!(store = %store.root.name, objects = store.index.len(), "loaded object store");
        Ok(store)
    }

    /// Rebuilds the id index from the catalog.
    fn rebuild_index(&mut self) -> Result<(), StoreError> {
        let mut index = BTreeMap::new();
        for (pos, obj) in self.objects().iter().enumerate() {
            insert_unique(&mut index, &obj.uuid, Location::Top(pos))?;
            if let Some(Info::Dataset(ds)) = &obj.info {
                for kind in [
                    ChildKind::Files,
                    ChildKind::Tables,
                    ChildKind::Hists,
                    ChildKind::Tdigests,
                    ChildKind::Jobs,
                    ChildKind::Logs,
                ] {
                    for (idx, child) in kind.collection(ds).iter().enumerate() {
                        let loc = Location::Child {
                            dataset: pos,
                            kind,
                            index: idx,
                        };
                        insert_unique(&mut index, &child.uuid, loc)?;
                    }
                }
            }
        }
        self.index = index;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    /// Metastore file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.root.name
    }

    /// Store id.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.root.uuid
    }

    /// Root directory.
    #[must_use]
    pub fn root_path(&self) -> &Path {
        self.kv.root()
    }

    /// Number of catalogued objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no objects are catalogued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// True when the id is catalogued.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The catalog root message.
    #[must_use]
    pub const fn catalog(&self) -> &CronusObjectStore {
        &self.root
    }

    /// Persists the catalog under its metastore name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the write fails.
    pub fn save_store(&self) -> Result<(), StoreError> {
        let bytes = self.root.encode_to_vec();
        self.kv.put(&self.root.name, &bytes)?;
        debug!(store = %self.root.name, bytes = bytes.len(), "saved metastore");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers a payload with typed info and writes its bytes.
    ///
    /// Menus and configurations take their id from the embedded message (or
    /// the content hash when empty) and attach to the store. Every other kind
    /// attaches to the dataset named in `keys`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Invalid`] for datasets and logs, which have dedicated
    ///   registration calls, and for undecodable menu or config payloads.
    /// - [`StoreError::InvalidParent`] when a required parent key is missing
    ///   or the partition is not registered.
    /// - [`StoreError::NotFound`] when the dataset or described file is absent.
    /// - [`StoreError::DuplicateKey`] when an explicit id is already present.
    pub fn register_content(
        &mut self,
        content: &[u8],
        info: Info,
        keys: &ContentKeys<'_>,
    ) -> Result<MetaObject, StoreError> {
        match info {
            Info::Dataset(_) => {
                Err(StoreError::Invalid("datasets are registered with register_dataset".to_string()))
            }
            Info::Log(_) => {
                Err(StoreError::Invalid("logs are registered with register_log".to_string()))
            }
            Info::Menu(_) => {
                let menu = Menu::decode(content)
                    .map_err(|err| StoreError::Invalid(format!("menu payload: {err}")))?;
                let info = Info::Menu(MenuObjectInfo {
                    created: Some(now_timestamp()),
                });
                self.register_top(content, &menu.uuid, &menu.name, info)
            }
            Info::Config(_) => {
                let config = Configuration::decode(content)
                    .map_err(|err| StoreError::Invalid(format!("config payload: {err}")))?;
                let info = Info::Config(ConfigObjectInfo {
                    created: Some(now_timestamp()),
                });
                self.register_top(content, &config.uuid, &config.name, info)
            }
            info @ (Info::File(_) | Info::Table(_) | Info::Hists(_) | Info::Tdigests(_) | Info::Job(_)) => {
                self.register_child(content, info, keys)
            }
        }
    }

    /// Encodes and registers a menu.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::register_content`].
    pub fn register_menu(&mut self, menu: &Menu) -> Result<MetaObject, StoreError> {
        let info = Info::Menu(MenuObjectInfo::default());
        self.register_content(&menu.encode_to_vec(), info, &ContentKeys::default())
    }

    /// Encodes and registers a configuration.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::register_content`].
    pub fn register_config(&mut self, config: &Configuration) -> Result<MetaObject, StoreError> {
        let info = Info::Config(ConfigObjectInfo::default());
        self.register_content(&config.encode_to_vec(), info, &ContentKeys::default())
    }

    /// Registers a top-level menu or configuration.
    fn register_top(
        &mut self,
        content: &[u8],
        embedded_uuid: &str,
        embedded_name: &str,
        info: Info,
    ) -> Result<MetaObject, StoreError> {
        let uuid = if embedded_uuid.is_empty() {
            self.disambiguate(&hash_hex(content))
        } else if self.index.contains_key(embedded_uuid) {
            return Err(StoreError::DuplicateKey(embedded_uuid.to_string()));
        } else {
            embedded_uuid.to_string()
        };
        let name = match info {
            Info::Menu(_) => identifiers::menu_name(&uuid),
            _ => identifiers::config_name(&uuid),
        };
        debug!(kind = info.kind(), label = embedded_name, uuid = %uuid, "registering top-level object");
        let obj = self.new_object(name, uuid, self.root.uuid.clone(), info)?;
        self.kv.put(&obj.name, content)?;
        Ok(self.install_top(obj))
    }

    /// Registers a dataset-scoped artifact.
    fn register_child(
        &mut self,
        content: &[u8],
        info: Info,
        keys: &ContentKeys<'_>,
    ) -> Result<MetaObject, StoreError> {
        let dataset_id = keys
            .dataset_id
            .ok_or_else(|| StoreError::InvalidParent(format!("{} requires a dataset", info.kind())))?;
        let job_id = keys
            .job_id
            .ok_or_else(|| StoreError::InvalidParent(format!("{} requires a job id", info.kind())))?;
        let ds_pos = self.dataset_position(dataset_id)?;
        let uuid = self.disambiguate(&generate_uuid());
        let name = match &info {
            Info::File(file) => {
                let partition = self.require_partition(ds_pos, keys)?;
                let ext = FileType::try_from(file.file_type).unwrap_or(FileType::Unknown).extension();
                identifiers::partition_file_name(dataset_id, job_id, partition, &uuid, ext)
            }
            Info::Table(_) => {
                let partition = self.require_partition(ds_pos, keys)?;
                let file_id = keys
                    .file_id
                    .ok_or_else(|| StoreError::InvalidParent("table requires a file id".to_string()))?;
                if !self.index.contains_key(file_id) {
                    return Err(StoreError::NotFound(file_id.to_string()));
                }
                identifiers::table_name(dataset_id, job_id, partition, file_id, &uuid)
            }
            Info::Hists(_) => identifiers::hists_name(dataset_id, job_id, &uuid),
            Info::Tdigests(_) => identifiers::tdigests_name(dataset_id, job_id, &uuid),
            Info::Job(_) => identifiers::job_name(dataset_id, job_id, &uuid),
            other => {
                return Err(StoreError::Invalid(format!("{} is not a dataset child", other.kind())));
            }
        };
        let obj = self.new_object(name, uuid, dataset_id.to_string(), info)?;
        self.kv.put(&obj.name, content)?;
        self.install_child(ds_pos, obj)
    }

    /// Registers a dataset produced by a menu and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when a referenced object is absent.
    pub fn register_dataset(
        &mut self,
        menu_id: Option<&str>,
        config_id: Option<&str>,
    ) -> Result<MetaObject, StoreError> {
        let menu = menu_id.map(|id| self.object(id).cloned()).transpose()?;
        let config = config_id.map(|id| self.object(id).cloned()).transpose()?;
        let uuid = self.disambiguate(&generate_uuid());
        let info = Info::Dataset(DatasetObjectInfo {
            transform: Some(Transform {
                menu: menu.map(Box::new),
                config: config.map(Box::new),
            }),
            ..DatasetObjectInfo::default()
        });
        let obj = self.new_object(identifiers::dataset_name(&uuid), uuid, self.root.uuid.clone(), info)?;
        info!(dataset = %obj.uuid, "registered dataset");
        Ok(self.install_top(obj))
    }

    /// Registers an empty log object for a job; the caller writes it later.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::InvalidParent`] for
    /// a missing or non-dataset parent.
    pub fn register_log(&mut self, dataset_id: &str, job_id: u64) -> Result<MetaObject, StoreError> {
        let ds_pos = self.dataset_position(dataset_id)?;
        let uuid = self.disambiguate(&generate_uuid());
        let name = identifiers::log_name(dataset_id, job_id, &uuid);
        let obj = self.new_object(name, uuid, dataset_id.to_string(), Info::Log(LogObjectInfo { job_id }))?;
        self.install_child(ds_pos, obj)
    }

    /// Registers a table describing a partition file; the payload is the
    /// IPC-serialized Arrow schema.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::register_content`].
    pub fn register_table(
        &mut self,
        info: TableObjectInfo,
        schema_bytes: &[u8],
        keys: &ContentKeys<'_>,
    ) -> Result<MetaObject, StoreError> {
        self.register_content(schema_bytes, Info::Table(info), keys)
    }

    /// Registers a file already on disk, addressed by its content hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the file or dataset is absent.
    pub fn register_file(
        &mut self,
        path: &Path,
        info: FileObjectInfo,
        dataset_id: &str,
        partition_key: &str,
    ) -> Result<MetaObject, StoreError> {
        let ds_pos = self.dataset_position(dataset_id)?;
        let path = fs::canonicalize(path)?;
        let meta = fs::metadata(&path)?;
        let hash = hash_reader(BufReader::new(File::open(&path)?))?;
        let uuid = self.disambiguate(&hash);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::Invalid(format!("no file name: {}", path.display())))?;
        let name = identifiers::disk_file_name(dataset_id, partition_key, &uuid, &file_name);
        let address = url::Url::from_file_path(&path)
            .map(String::from)
            .map_err(|()| StoreError::Invalid(format!("not an absolute path: {}", path.display())))?;
        let info = Info::File(FileObjectInfo {
            size_bytes: meta.len(),
            ..info
        });
        let obj = CronusObject {
            name,
            uuid,
            parent_uuid: dataset_id.to_string(),
            address,
            info: Some(info),
        };
        self.install_child(ds_pos, obj)
    }

    /// Registers every file in `dir` whose name matches `pattern`, in name order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing or registering fails.
    pub fn register_dir(
        &mut self,
        dir: &Path,
        pattern: &str,
        info: &FileObjectInfo,
        dataset_id: &str,
        partition_key: &str,
    ) -> Result<Vec<MetaObject>, StoreError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name().is_some_and(|n| wildcard_match(pattern, &n.to_string_lossy()))
            })
            .collect();
        paths.sort();
        paths
            .iter()
            .map(|path| self.register_file(path, info.clone(), dataset_id, partition_key))
            .collect()
    }

    /// Merges children from a serialized dataset info into a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] for undecodable input and
    /// [`StoreError::DuplicateKey`] when a child id already exists.
    pub fn update_dataset(&mut self, dataset_id: &str, buf: &[u8]) -> Result<Vec<MetaObject>, StoreError> {
        let ds_pos = self.dataset_position(dataset_id)?;
        let update = DatasetObjectInfo::decode(buf)
            .map_err(|err| StoreError::Corrupt(format!("dataset update: {err}")))?;
        let mut merged = Vec::new();
        for obj in update
            .files
            .into_iter()
            .chain(update.tables)
            .chain(update.hists)
            .chain(update.tdigests)
            .chain(update.jobs)
            .chain(update.logs)
        {
            if self.index.contains_key(&obj.uuid) {
                return Err(StoreError::DuplicateKey(obj.uuid));
            }
            merged.push(self.install_child(ds_pos, obj)?);
        }
        if let Some(ds) = self.dataset_info_mut(ds_pos) {
            for key in update.partitions {
                if !ds.partitions.contains(&key) {
                    error!(dataset = dataset_id, partition = %key, "merged partition missing from dataset");
                    ds.partitions.push(key);
                }
            }
        }
        Ok(merged)
    }

    /// Starts a job on a dataset and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn new_job(&mut self, dataset_id: &str) -> Result<u64, StoreError> {
        let ds_pos = self.dataset_position(dataset_id)?;
        let ds = self
            .dataset_info_mut(ds_pos)
            .ok_or_else(|| StoreError::InvalidParent(dataset_id.to_string()))?;
        let job_id = ds.job_idx;
        ds.job_idx += 1;
        Ok(job_id)
    }

    /// Registers a partition key on a dataset; existing keys are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn new_partition(&mut self, dataset_id: &str, key: &str) -> Result<(), StoreError> {
        let ds_pos = self.dataset_position(dataset_id)?;
        let ds = self
            .dataset_info_mut(ds_pos)
            .ok_or_else(|| StoreError::InvalidParent(dataset_id.to_string()))?;
        if !ds.partitions.iter().any(|p| p == key) {
            ds.partitions.push(key.to_string());
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Payload Access
    // ------------------------------------------------------------------------

    /// Returns the payload bytes of an object.
    ///
    /// Payloads outside the store directory are read from the object address.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids or missing payloads.
    pub fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let obj = self.object(id)?;
        if self.kv.contains(&obj.name) {
            return self.kv.get(&obj.name);
        }
        let path = path_from_address(&obj.address)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(format!("{id}: no payload at {}", obj.address)));
        }
        fs::read(&path).map_err(StoreError::from)
    }

    /// Returns the payload decoded as a message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when decoding fails.
    pub fn get_message<M: Message + Default>(&self, id: &str) -> Result<M, StoreError> {
        let bytes = self.get(id)?;
        M::decode(bytes.as_slice()).map_err(|err| StoreError::Corrupt(format!("{id}: {err}")))
    }

    /// Overwrites the payload of an object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let obj = self.object(id)?;
        self.kv.put(&obj.name, bytes)
    }

    /// Overwrites the payload of an object with an encoded message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn put_message<M: Message>(&self, id: &str, message: &M) -> Result<(), StoreError> {
        self.put(id, &message.encode_to_vec())
    }

    /// Returns the filesystem path of an object payload.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn path_of(&self, id: &str) -> Result<PathBuf, StoreError> {
        let obj = self.object(id)?;
        path_from_address(&obj.address)
    }

    /// Opens an object payload as a plain file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids or missing payloads.
    pub fn open_raw(&self, id: &str) -> Result<File, StoreError> {
        let path = self.path_of(id)?;
        File::open(&path).map_err(StoreError::from)
    }

    /// Opens an object payload with a reader matching its file type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when an IPC payload fails to open.
    pub fn open(&self, id: &str) -> Result<StoreStream, StoreError> {
        let file_type = match &self.object(id)?.info {
            Some(Info::File(file)) => FileType::try_from(file.file_type).unwrap_or(FileType::Unknown),
            _ => FileType::Unknown,
        };
        let reader = BufReader::new(self.open_raw(id)?);
        match file_type {
            FileType::Arrow => FileReader::try_new(reader, None)
                .map(StoreStream::Arrow)
                .map_err(|err| StoreError::Corrupt(format!("{id}: {err}"))),
            FileType::ArrowStream => StreamReader::try_new(reader, None)
                .map(StoreStream::ArrowStream)
                .map_err(|err| StoreError::Corrupt(format!("{id}: {err}"))),
            _ => Ok(StoreStream::Bytes(reader)),
        }
    }

    // ------------------------------------------------------------------------
    // Lookup and Listing
    // ------------------------------------------------------------------------

    /// Returns a catalogued object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn object(&self, id: &str) -> Result<&CronusObject, StoreError> {
        let loc = self.index.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.resolve(*loc).ok_or_else(|| StoreError::Corrupt(format!("dangling index entry {id}")))
    }

    /// Returns the descriptor of a catalogued object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn meta(&self, id: &str) -> Result<MetaObject, StoreError> {
        self.object(id).map(MetaObject::from)
    }

    /// Lists objects whose names match a prefix and suffix, sorted by name.
    #[must_use]
    pub fn list(&self, prefix: &str, suffix: &str) -> Vec<MetaObject> {
        let mut out: Vec<MetaObject> = self
            .index
            .values()
            .filter_map(|loc| self.resolve(*loc))
            .filter(|obj| obj.name.starts_with(prefix) && obj.name.ends_with(suffix))
            .map(MetaObject::from)
            .collect();
        out.sort();
        out
    }

    /// Returns the info of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn dataset_info(&self, dataset_id: &str) -> Result<&DatasetObjectInfo, StoreError> {
        match &self.object(dataset_id)?.info {
            Some(Info::Dataset(ds)) => Ok(ds),
            _ => Err(StoreError::InvalidParent(format!("{dataset_id} is not a dataset"))),
        }
    }

    /// Lists the partition keys of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn list_partitions(&self, dataset_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.dataset_info(dataset_id)?.partitions.clone())
    }

    /// Lists the job records of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn list_jobs(&self, dataset_id: &str) -> Result<Vec<MetaObject>, StoreError> {
        Ok(self.dataset_info(dataset_id)?.jobs.iter().map(MetaObject::from).collect())
    }

    /// Lists the histogram collections of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn list_histograms(&self, dataset_id: &str) -> Result<Vec<MetaObject>, StoreError> {
        Ok(self.dataset_info(dataset_id)?.hists.iter().map(MetaObject::from).collect())
    }

    /// Lists the t-digest collections of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn list_tdigests(&self, dataset_id: &str) -> Result<Vec<MetaObject>, StoreError> {
        Ok(self.dataset_info(dataset_id)?.tdigests.iter().map(MetaObject::from).collect())
    }

    /// Lists the files of a dataset, optionally restricted to one partition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn list_files(&self, dataset_id: &str, partition: Option<&str>) -> Result<Vec<MetaObject>, StoreError> {
        let needle = partition.map(|p| format!(".part_{p}."));
        Ok(self
            .dataset_info(dataset_id)?
            .files
            .iter()
            .filter(|obj| needle.as_ref().is_none_or(|n| obj.name.contains(n.as_str())))
            .map(MetaObject::from)
            .collect())
    }

    /// Lists the tables of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing or non-dataset id.
    pub fn list_tables(&self, dataset_id: &str) -> Result<Vec<MetaObject>, StoreError> {
        Ok(self.dataset_info(dataset_id)?.tables.iter().map(MetaObject::from).collect())
    }

    // ------------------------------------------------------------------------
    // File Info Updates
    // ------------------------------------------------------------------------

    /// Records the size of a file object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for non-file objects.
    pub fn set_file_size(&mut self, id: &str, size_bytes: u64) -> Result<(), StoreError> {
        self.file_info_mut(id)?.size_bytes = size_bytes;
        Ok(())
    }

    /// Records the blocks of a file object as `(offset, length)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for non-file objects.
    pub fn set_file_blocks(&mut self, id: &str, blocks: &[(u64, u64)]) -> Result<(), StoreError> {
        let file = self.file_info_mut(id)?;
        file.blocks = blocks
            .iter()
            .zip(0_u64 ..)
            .map(|(&(offset, size_bytes), index)| BlockInfo {
                index,
                offset,
                size_bytes,
            })
            .collect();
        Ok(())
    }

    /// Records the column names of a file object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for non-file objects.
    pub fn set_file_columns(&mut self, id: &str, columns: &[String]) -> Result<(), StoreError> {
        self.file_info_mut(id)?.columns = columns.to_vec();
        Ok(())
    }

    /// Records the state of a job record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for non-job objects.
    pub fn set_job_state(&mut self, id: &str, state: JobState) -> Result<(), StoreError> {
        let loc = *self.index.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match self.resolve_mut(loc).and_then(|obj| obj.info.as_mut()) {
            Some(Info::Job(job)) => {
                job.state = state as i32;
                Ok(())
            }
            _ => Err(StoreError::Invalid(format!("{id} is not a job"))),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Top-level objects.
    fn objects(&self) -> &[CronusObject] {
        self.root.info.as_ref().map_or(&[], |info| info.objects.as_slice())
    }

    /// Mutable top-level objects.
    fn objects_mut(&mut self) -> &mut Vec<CronusObject> {
        &mut self.root.info.get_or_insert_with(CronusStoreInfo::default).objects
    }

    /// Resolves a location to its object.
    fn resolve(&self, loc: Location) -> Option<&CronusObject> {
        match loc {
            Location::Top(pos) => self.objects().get(pos),
            Location::Child {
                dataset,
                kind,
                index,
            } => match &self.objects().get(dataset)?.info {
                Some(Info::Dataset(ds)) => kind.collection(ds).get(index),
                _ => None,
            },
        }
    }

    /// Resolves a location to its object mutably.
    fn resolve_mut(&mut self, loc: Location) -> Option<&mut CronusObject> {
        match loc {
            Location::Top(pos) => self.objects_mut().get_mut(pos),
            Location::Child {
                dataset,
                kind,
                index,
            } => match &mut self.objects_mut().get_mut(dataset)?.info {
                Some(Info::Dataset(ds)) => kind.collection_mut(ds).get_mut(index),
                _ => None,
            },
        }
    }

    /// Returns the position of a dataset among top-level objects.
    fn dataset_position(&self, dataset_id: &str) -> Result<usize, StoreError> {
        match self.index.get(dataset_id) {
            None => Err(StoreError::NotFound(format!("dataset {dataset_id}"))),
            Some(Location::Top(pos)) => match self.objects().get(*pos).and_then(|o| o.info.as_ref()) {
                Some(Info::Dataset(_)) => Ok(*pos),
                _ => Err(StoreError::InvalidParent(format!("{dataset_id} is not a dataset"))),
            },
            Some(Location::Child { .. }) => {
                Err(StoreError::InvalidParent(format!("{dataset_id} is not a dataset")))
            }
        }
    }

    /// Mutable dataset info at a top-level position.
    fn dataset_info_mut(&mut self, pos: usize) -> Option<&mut DatasetObjectInfo> {
        match &mut self.objects_mut().get_mut(pos)?.info {
            Some(Info::Dataset(ds)) => Some(ds),
            _ => None,
        }
    }

    /// Mutable file info of an object.
    fn file_info_mut(&mut self, id: &str) -> Result<&mut FileObjectInfo, StoreError> {
        let loc = *self.index.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match self.resolve_mut(loc).and_then(|obj| obj.info.as_mut()) {
            Some(Info::File(file)) => Ok(file),
            _ => Err(StoreError::Invalid(format!("{id} is not a file"))),
        }
    }

    /// Validates that the requested partition is registered on the dataset.
    fn require_partition<'k>(&self, ds_pos: usize, keys: &ContentKeys<'k>) -> Result<&'k str, StoreError> {
        let partition = keys
            .partition_key
            .ok_or_else(|| StoreError::InvalidParent("partition key required".to_string()))?;
        let registered = match self.objects().get(ds_pos).and_then(|o| o.info.as_ref()) {
            Some(Info::Dataset(ds)) => ds.partitions.iter().any(|p| p == partition),
            _ => false,
        };
        if registered {
            Ok(partition)
        } else {
            Err(StoreError::InvalidParent(format!("partition {partition} is not registered")))
        }
    }

    /// Builds a catalog entry addressed inside the store directory.
    fn new_object(
        &self,
        name: String,
        uuid: String,
        parent_uuid: String,
        info: Info,
    ) -> Result<CronusObject, StoreError> {
        let address = self.kv.url_for(&name)?;
        Ok(CronusObject {
            name,
            uuid,
            parent_uuid,
            address,
            info: Some(info),
        })
    }

    /// Appends a top-level object and indexes it.
    fn install_top(&mut self, obj: CronusObject) -> MetaObject {
        let meta = MetaObject::from(&obj);
        let objects = self.objects_mut();
        objects.push(obj);
        let pos = objects.len() - 1;
        self.index.insert(meta.uuid.clone(), Location::Top(pos));
        debug!(name = %meta.name, uuid = %meta.uuid, "registered object");
        meta
    }

    /// Appends a dataset child and indexes it.
    fn install_child(&mut self, ds_pos: usize, obj: CronusObject) -> Result<MetaObject, StoreError> {
        let kind = obj
            .info
            .as_ref()
            .and_then(ChildKind::for_info)
            .ok_or_else(|| StoreError::Invalid(format!("{} cannot be a dataset child", obj.name)))?;
        let meta = MetaObject::from(&obj);
        let ds = self
            .dataset_info_mut(ds_pos)
            .ok_or_else(|| StoreError::InvalidParent(meta.parent_uuid.clone()))?;
        let collection = kind.collection_mut(ds);
        collection.push(obj);
        let index = collection.len() - 1;
        self.index.insert(meta.uuid.clone(), Location::Child {
            dataset: ds_pos,
            kind,
            index,
        });
        debug!(name = %meta.name, uuid = %meta.uuid, "registered object");
        Ok(meta)
    }

    /// Returns `uuid`, or `uuid_N` with the next free duplicate counter.
    fn disambiguate(&mut self, uuid: &str) -> String {
        if !self.index.contains_key(uuid) {
            return uuid.to_string();
        }
        loop {
            let counter = self
                .dups
                .entry(uuid.to_string())
                .and_modify(|c| *c += 1)
                .or_insert(0);
            let candidate = identifiers::with_duplicate_suffix(uuid, *counter);
            if !self.index.contains_key(&candidate) {
                debug!(uuid, candidate = %candidate, "disambiguated duplicate id");
                return candidate;
            }
        }
    }
}

/// Inserts an index entry, rejecting duplicates.
fn insert_unique(
    index: &mut BTreeMap<String, Location>,
    uuid: &str,
    loc: Location,
) -> Result<(), StoreError> {
    if index.insert(uuid.to_string(), loc).is_some() {
        return Err(StoreError::Corrupt(format!("duplicate id in metastore: {uuid}")));
    }
    Ok(())
}
