//! Registered reference fingerprints, stored as PNG data URIs in insertion order.

use crate::backend::KvBackend;
use crate::{read_sequence, write_sequence, StoreError};
use facemark_core::{normalize, ImageSource, NormalizedImage, Reference};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Backend key holding the reference collection.
pub const REFERENCES_KEY: &str = "face_attendance_refs_v1";

/// A reference as persisted: the label plus an encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReference {
    pub name: String,
    #[serde(rename = "dataURL")]
    pub data_url: String,
}

pub struct FingerprintStore {
    backend: Arc<dyn KvBackend>,
    target_size: u32,
}

impl FingerprintStore {
    pub fn new(backend: Arc<dyn KvBackend>, target_size: u32) -> Self {
        Self {
            backend,
            target_size,
        }
    }

    /// Append a reference. Names are not unique; a second `add` with the same
    /// name keeps both.
    pub fn add(&self, name: &str, image: &NormalizedImage) -> Result<(), StoreError> {
        let mut records = self.records()?;
        records.push(StoredReference {
            name: name.to_string(),
            data_url: image.to_data_uri()?,
        });
        write_sequence(self.backend.as_ref(), REFERENCES_KEY, &records)?;
        tracing::info!(name, total = records.len(), "reference stored");
        Ok(())
    }

    /// Drop every reference whose name equals `name` exactly. Returns how many
    /// were removed; an unknown name removes nothing and is not an error.
    pub fn remove(&self, name: &str) -> Result<usize, StoreError> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| r.name != name);
        let removed = before - records.len();

        write_sequence(self.backend.as_ref(), REFERENCES_KEY, &records)?;
        tracing::info!(name, removed, "references removed");
        Ok(removed)
    }

    /// Stored records as persisted, in insertion order.
    pub fn records(&self) -> Result<Vec<StoredReference>, StoreError> {
        read_sequence(self.backend.as_ref(), REFERENCES_KEY)
    }

    /// Decode and normalize every stored reference, in insertion order.
    ///
    /// A record whose image cannot be decoded fails the whole read with
    /// [`StoreError::Decode`].
    pub fn list(&self) -> Result<Vec<Reference>, StoreError> {
        self.records()?
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let image = ImageSource::DataUri(record.data_url)
                    .decode()
                    .and_then(|img| normalize(&img, self.target_size))
                    .map_err(|source| {
                        tracing::warn!(name = %record.name, index, error = %source, "stored reference is undecodable");
                        StoreError::Decode {
                            index,
                            name: record.name.clone(),
                            source,
                        }
                    })?;
                Ok(Reference {
                    name: record.name,
                    image,
                })
            })
            .collect()
    }

    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records()?.into_iter().map(|r| r.name).collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }
}
