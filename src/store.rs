//! zarr v2 directory store built on `zarrs`: groups, 2-D `<f4` arrays chunked
//! by row with zlib compression, and group attributes.

use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::{Map, Value, json};
use zarrs::array::{Array, ArrayMetadata, ArrayMetadataV2};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::{Group, GroupMetadata};
use zarrs::metadata::v2::GroupMetadataV2;
use zarrs::storage::{ReadableWritableListableStorage, ReadableWritableListableStorageTraits};

use crate::error::ConvertError;
use crate::fs_util::remove_existing;

const ZARR_FORMAT: u8 = 2;
const F32_DTYPE: &str = "<f4";
const COMPRESSOR_ID: &str = "zlib";

/// Shape and storage settings for a `(samples, bins)` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySpec {
    pub rows: u64,
    pub width: u64,
    pub chunk_width: u64,
    pub compression_level: u32,
}

impl ArraySpec {
    /// `.zarray` document: one row per chunk, NaN fill, zlib.
    fn metadata(&self) -> Value {
        json!({
            "zarr_format": ZARR_FORMAT,
            "shape": [self.rows, self.width],
            "chunks": [1, self.width.min(self.chunk_width).max(1)],
            "dtype": F32_DTYPE,
            "compressor": {"id": COMPRESSOR_ID, "level": self.compression_level},
            "fill_value": "NaN",
            "order": "C",
            "filters": null,
            "dimension_separator": ".",
        })
    }
}

fn node_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

fn store_err(path: &str, err: impl fmt::Display) -> ConvertError {
    ConvertError::Store(format!("{}: {err}", node_path(path)))
}

pub struct ZarrStore {
    root: Utf8PathBuf,
    storage: ReadableWritableListableStorage,
}

impl fmt::Debug for ZarrStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZarrStore").field("root", &self.root).finish()
    }
}

impl ZarrStore {
    /// Creates an empty store at `root`, replacing anything already there.
    pub fn create(root: impl Into<Utf8PathBuf>) -> Result<Self, ConvertError> {
        let root = root.into();
        let unwritable = |err: &dyn fmt::Display| ConvertError::StoreUnwritable {
            path: root.to_string(),
            message: err.to_string(),
        };
        remove_existing(&root)?;
        std::fs::create_dir_all(root.as_std_path()).map_err(|err| unwritable(&err))?;
        let storage: ReadableWritableListableStorage =
            Arc::new(FilesystemStore::new(root.as_std_path()).map_err(|err| unwritable(&err))?);
        let store = Self { root, storage };
        store.create_group("")?;
        Ok(store)
    }

    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, ConvertError> {
        let root = root.into();
        let storage: ReadableWritableListableStorage = Arc::new(
            FilesystemStore::new(root.as_std_path())
                .map_err(|err| ConvertError::Store(format!("{root}: {err}")))?,
        );
        let store = Self { root, storage };
        if !store.is_group("") {
            return Err(ConvertError::Store(format!(
                "{} is not a zarr group",
                store.root
            )));
        }
        Ok(store)
    }

    fn group(
        &self,
        path: &str,
    ) -> Result<Group<dyn ReadableWritableListableStorageTraits>, ConvertError> {
        Group::open(self.storage.clone(), &node_path(path)).map_err(|err| store_err(path, err))
    }

    pub fn create_group(&self, path: &str) -> Result<(), ConvertError> {
        let metadata: GroupMetadataV2 = serde_json::from_value(json!({ "zarr_format": ZARR_FORMAT }))
            .map_err(|err| store_err(path, err))?;
        let group = Group::new_with_metadata(
            self.storage.clone(),
            &node_path(path),
            GroupMetadata::V2(metadata),
        )
        .map_err(|err| store_err(path, err))?;
        group.store_metadata().map_err(|err| ConvertError::StoreUnwritable {
            path: self.root.join(path.trim_matches('/')).to_string(),
            message: err.to_string(),
        })
    }

    pub fn is_group(&self, path: &str) -> bool {
        self.group(path).is_ok()
    }

    pub fn create_array(&self, path: &str, spec: ArraySpec) -> Result<ZarrArray, ConvertError> {
        let metadata: ArrayMetadataV2 =
            serde_json::from_value(spec.metadata()).map_err(|err| store_err(path, err))?;
        let array = Array::new_with_metadata(
            self.storage.clone(),
            &node_path(path),
            ArrayMetadata::V2(metadata),
        )
        .map_err(|err| store_err(path, err))?;
        array.store_metadata().map_err(|err| ConvertError::StoreUnwritable {
            path: self.root.join(path.trim_matches('/')).to_string(),
            message: err.to_string(),
        })?;
        ZarrArray::new(path, array)
    }

    pub fn array(&self, path: &str) -> Result<ZarrArray, ConvertError> {
        let array =
            Array::open(self.storage.clone(), &node_path(path)).map_err(|err| store_err(path, err))?;
        ZarrArray::new(path, array)
    }

    /// Replaces the attributes of the group at `path`.
    pub fn write_attributes<T: Serialize>(&self, path: &str, attrs: &T) -> Result<(), ConvertError> {
        let Value::Object(attrs) = serde_json::to_value(attrs).map_err(|err| store_err(path, err))?
        else {
            return Err(store_err(path, "attributes must be a JSON object"));
        };
        let mut group = self.group(path)?;
        *group.attributes_mut() = attrs;
        group.store_metadata().map_err(|err| ConvertError::StoreUnwritable {
            path: self.root.join(path.trim_matches('/')).to_string(),
            message: err.to_string(),
        })
    }

    /// Attributes of the group at `path`; an empty object when none were written.
    pub fn read_attributes(&self, path: &str) -> Result<Value, ConvertError> {
        let attrs: Map<String, Value> = self.group(path)?.attributes().clone();
        Ok(Value::Object(attrs))
    }
}

/// Handle to one 2-D float array. Each chunk holds a slice of a single row,
/// so writers of different rows never touch the same chunk.
pub struct ZarrArray {
    path: String,
    rows: u64,
    width: u64,
    array: Array<dyn ReadableWritableListableStorageTraits>,
}

impl fmt::Debug for ZarrArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZarrArray")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .field("width", &self.width)
            .finish()
    }
}

impl ZarrArray {
    fn new(
        path: &str,
        array: Array<dyn ReadableWritableListableStorageTraits>,
    ) -> Result<Self, ConvertError> {
        let path = path.trim_matches('/').to_string();
        let &[rows, width] = array.shape() else {
            return Err(ConvertError::Store(format!("{path}: expected a 2-D array")));
        };
        Ok(Self {
            path,
            rows,
            width,
            array,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn width(&self) -> u64 {
        self.width
    }

    fn row_subset(&self, row: u64) -> Result<ArraySubset, ConvertError> {
        if row >= self.rows {
            return Err(ConvertError::Store(format!(
                "{}: row {row} out of range ({} rows)",
                self.path, self.rows
            )));
        }
        Ok(ArraySubset::new_with_ranges(&[row..row + 1, 0..self.width]))
    }

    /// Replaces row `row` with `values`. Chunks left holding only the fill
    /// value are erased and read back as NaN.
    pub fn write_row(&self, row: u64, values: &[f32]) -> Result<(), ConvertError> {
        let subset = self.row_subset(row)?;
        if values.len() as u64 != self.width {
            return Err(ConvertError::ShapeMismatch {
                array: self.path.clone(),
                expected: self.width,
                actual: values.len() as u64,
            });
        }
        self.array
            .store_array_subset_elements::<f32>(&subset, values)
            .map_err(|err| ConvertError::StoreUnwritable {
                path: format!("{}[{row}]", self.path),
                message: err.to_string(),
            })
    }

    pub fn read_row(&self, row: u64) -> Result<Vec<f32>, ConvertError> {
        let subset = self.row_subset(row)?;
        self.array
            .retrieve_array_subset_elements::<f32>(&subset)
            .map_err(|err| ConvertError::Store(format!("{}[{row}]: {err}", self.path)))
    }
}
