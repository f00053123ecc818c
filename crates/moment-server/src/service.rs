use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use thiserror::Error;
use tracing::{info, warn};

use moment_store::{Blob, BlobStore, Cell, TabularStore};
use moment_types::api::{
    Envelope, ImageStored, MomentCreated, MomentList, ReadParams, WriteParams, WritePayload,
};
use moment_types::models::{Moment, MomentSummary};

/// Fixed header row of the moments table.
const HEADER: [&str; 6] = ["ID", "Name", "Message", "Image URL", "Rotation", "Timestamp"];

/// Every upload is treated as a JPEG; the submitting client only sends photos.
const IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Decode(#[from] base64::DecodeError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct ServiceConfig {
    pub table_name: String,
    pub public_base_url: String,
}

/// Stateless request handler over the two collaborator stores. One instance
/// serves every request; all durable state lives behind the store ports.
pub struct MomentService {
    tabular: Arc<dyn TabularStore>,
    blobs: Arc<dyn BlobStore>,
    config: ServiceConfig,
}

impl MomentService {
    pub fn new(
        tabular: Arc<dyn TabularStore>,
        blobs: Arc<dyn BlobStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            tabular,
            blobs,
            config,
        }
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    /// Write-verb entry: `action` selects the handler.
    pub fn handle_write(&self, params: &WriteParams) -> Envelope<WritePayload> {
        match params.action.as_deref() {
            Some("addMoment") => self.add_moment(params).map_payload(WritePayload::Moment),
            Some("uploadImage") => self.upload_image(params).map_payload(WritePayload::Image),
            _ => Envelope::fail("Invalid action"),
        }
    }

    /// Read-verb entry.
    pub fn handle_read(&self, params: &ReadParams) -> Envelope<MomentList> {
        match params.action.as_deref() {
            Some("getMoments") => self.list_moments(),
            _ => Envelope::fail("Invalid action"),
        }
    }

    // ── Handlers ────────────────────────────────────────────────────────

    pub fn add_moment(&self, params: &WriteParams) -> Envelope<MomentCreated> {
        match self.try_add_moment(params) {
            Ok(moment) => {
                info!("Moment {} added by {}", moment.id, moment.name);
                Envelope::ok("Moment added successfully", MomentCreated { moment })
            }
            Err(ServiceError::Validation(msg)) => Envelope::fail(msg),
            Err(e) => {
                warn!("Failed to add moment: {}", e);
                Envelope::fail(format!("Error adding moment: {e}"))
            }
        }
    }

    fn try_add_moment(&self, params: &WriteParams) -> Result<Moment, ServiceError> {
        let (Some(name), Some(message), Some(image)) = (
            required(&params.name),
            required(&params.message),
            required(&params.image_url),
        ) else {
            return Err(ServiceError::Validation("Missing required fields"));
        };

        self.ensure_table()?;

        // id and timestamp are two independent clock reads; nothing orders
        // them relative to each other
        let id = chrono::Utc::now().timestamp_millis();
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        // rotation is stored as submitted; it is only parsed on the way out
        let rotation_cell = match &params.rotation {
            Some(r) => Cell::text(r.clone()),
            None => Cell::Int(0),
        };

        let row = [
            Cell::Int(id),
            Cell::text(name),
            Cell::text(message),
            Cell::text(image),
            rotation_cell,
            Cell::text(timestamp.clone()),
        ];
        self.tabular.append_row(&self.config.table_name, &row)?;

        Ok(Moment {
            id,
            name: name.to_string(),
            message: message.to_string(),
            image: image.to_string(),
            rotation: parse_rotation(params.rotation.as_deref()),
            timestamp,
        })
    }

    pub fn upload_image(&self, params: &WriteParams) -> Envelope<ImageStored> {
        match self.try_upload_image(params) {
            Ok(stored) => {
                info!("Image stored as {}", stored.file_id);
                Envelope::ok("Image uploaded successfully", stored)
            }
            Err(ServiceError::Validation(msg)) => Envelope::fail(msg),
            Err(e) => {
                warn!("Failed to upload image: {}", e);
                Envelope::fail(format!("Error uploading image: {e}"))
            }
        }
    }

    fn try_upload_image(&self, params: &WriteParams) -> Result<ImageStored, ServiceError> {
        let Some(data) = required(&params.image_data) else {
            return Err(ServiceError::Validation("No image data provided"));
        };

        // Strip any data-URL header: everything up to and including the
        // first comma
        let encoded = match data.find(',') {
            Some(i) => &data[i + 1..],
            None => data,
        };
        let bytes = B64.decode(encoded)?;

        let file_name = match required(&params.file_name) {
            Some(n) => n.to_string(),
            None => format!("moment_{}.jpg", chrono::Utc::now().timestamp_millis()),
        };

        let file_id = self.blobs.store(&file_name, IMAGE_MIME, &bytes)?;
        self.blobs.set_public(&file_id)?;

        Ok(ImageStored {
            image_url: self.thumbnail_url(&file_id),
            file_id,
        })
    }

    pub fn list_moments(&self) -> Envelope<MomentList> {
        match self.try_list_moments() {
            Ok(moments) => Envelope::ok("Moments fetched successfully", MomentList { moments }),
            Err(e) => {
                warn!("Failed to fetch moments: {}", e);
                Envelope::fail(format!("Error fetching moments: {e}"))
            }
        }
    }

    fn try_list_moments(&self) -> Result<Vec<MomentSummary>, ServiceError> {
        if !self.tabular.table_exists(&self.config.table_name)? {
            return Ok(vec![]);
        }

        let rows = self.tabular.scan(&self.config.table_name)?;

        // Row 0 is the header. Newest rows sit at the end, so reverse.
        // Storage order is the only ordering; rows are never re-sorted by
        // id or timestamp.
        let mut moments: Vec<MomentSummary> = rows
            .into_iter()
            .skip(1)
            .map(|row| MomentSummary {
                id: row.first().and_then(Cell::as_i64).unwrap_or(0),
                name: cell_string(row.get(1)),
                message: cell_string(row.get(2)),
                image: cell_string(row.get(3)),
                rotation: row.get(4).and_then(Cell::as_f64).unwrap_or(0.0),
            })
            .collect();
        moments.reverse();
        Ok(moments)
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    /// Blob lookup for the public thumbnail route. Unshared objects stay
    /// invisible, the same way an unshared platform file would.
    pub fn shared_blob(&self, id: &str) -> anyhow::Result<Option<Blob>> {
        Ok(self.blobs.fetch(id)?.filter(|blob| blob.shared))
    }

    fn ensure_table(&self) -> Result<(), ServiceError> {
        if !self.tabular.table_exists(&self.config.table_name)? {
            let header: Vec<Cell> = HEADER.iter().map(|h| Cell::text(*h)).collect();
            self.tabular.create_table(&self.config.table_name, &header)?;
        }
        Ok(())
    }

    fn thumbnail_url(&self, file_id: &str) -> String {
        format!(
            "{}/thumbnail?id={}&sz=w1000",
            self.config.public_base_url, file_id
        )
    }
}

/// Required params must be present and non-empty.
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// `rotation` is free text; anything that does not parse as a float counts
/// as 0 degrees.
fn parse_rotation(raw: Option<&str>) -> f64 {
    raw.and_then(|r| r.trim().parse().ok()).unwrap_or(0.0)
}

fn cell_string(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Text(s)) => s.clone(),
        Some(Cell::Int(v)) => v.to_string(),
        Some(Cell::Float(v)) => v.to_string(),
        None => String::new(),
    }
}
