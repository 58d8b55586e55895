//! Per-event storage configuration

use std::fmt::{Debug, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::storage_types::StorageKind;

const REDACTED: &str = "<redacted>";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemConfig {
    pub directory: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreConfig {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Allow plain HTTP to the endpoint
    #[serde(default)]
    pub insecure: bool,
}

impl Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ObjectStoreConfig")
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &REDACTED)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("insecure", &self.insecure)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpConfig {
    /// `host:port`
    pub address: String,
    pub directory: String,
    pub username: String,
    pub password: String,
}

impl Debug for FtpConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FtpConfig")
            .field("address", &self.address)
            .field("directory", &self.directory)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDriveConfig {
    pub oauth_token: String,
    pub folder_id: String,
    /// Metadata/download endpoint for Drive-compatible services
    #[serde(default)]
    pub api_base: Option<String>,
    /// Upload endpoint for Drive-compatible services
    #[serde(default)]
    pub upload_base: Option<String>,
}

impl Debug for CloudDriveConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CloudDriveConfig")
            .field("oauth_token", &REDACTED)
            .field("folder_id", &self.folder_id)
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .finish()
    }
}

/// Where an event's blobs live. Exactly one backend per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageDescriptor {
    Filesystem(FilesystemConfig),
    ObjectStore(ObjectStoreConfig),
    Ftp(FtpConfig),
    CloudDrive(CloudDriveConfig),
}

impl StorageDescriptor {
    pub fn kind(&self) -> StorageKind {
        match self {
            StorageDescriptor::Filesystem(_) => StorageKind::Filesystem,
            StorageDescriptor::ObjectStore(_) => StorageKind::ObjectStore,
            StorageDescriptor::Ftp(_) => StorageKind::Ftp,
            StorageDescriptor::CloudDrive(_) => StorageKind::CloudDrive,
        }
    }
}

/// Persisted shape of an event's storage settings: one nullable slot per backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSlots {
    #[serde(default)]
    pub filesystem: Option<FilesystemConfig>,
    #[serde(default)]
    pub object_store: Option<ObjectStoreConfig>,
    #[serde(default)]
    pub ftp: Option<FtpConfig>,
    #[serde(default)]
    pub cloud_drive: Option<CloudDriveConfig>,
}

impl StorageSlots {
    /// Collapse the slots into a descriptor. Zero or several populated slots is a
    /// configuration error.
    pub fn resolve(self) -> Result<StorageDescriptor, PipelineError> {
        let mut found: Vec<StorageDescriptor> = Vec::with_capacity(1);
        if let Some(cfg) = self.filesystem {
            found.push(StorageDescriptor::Filesystem(cfg));
        }
        if let Some(cfg) = self.object_store {
            found.push(StorageDescriptor::ObjectStore(cfg));
        }
        if let Some(cfg) = self.ftp {
            found.push(StorageDescriptor::Ftp(cfg));
        }
        if let Some(cfg) = self.cloud_drive {
            found.push(StorageDescriptor::CloudDrive(cfg));
        }

        match found.len() {
            0 => Err(PipelineError::configuration(
                "no storage backend configured for event",
            )),
            1 => Ok(found.remove(0)),
            n => {
                let kinds: Vec<String> = found.iter().map(|d| d.kind().to_string()).collect();
                Err(PipelineError::configuration(format!(
                    "{} storage backends configured for event ({})",
                    n,
                    kinds.join(", ")
                )))
            }
        }
    }
}

impl From<StorageDescriptor> for StorageSlots {
    fn from(descriptor: StorageDescriptor) -> Self {
        let mut slots = StorageSlots::default();
        match descriptor {
            StorageDescriptor::Filesystem(cfg) => slots.filesystem = Some(cfg),
            StorageDescriptor::ObjectStore(cfg) => slots.object_store = Some(cfg),
            StorageDescriptor::Ftp(cfg) => slots.ftp = Some(cfg),
            StorageDescriptor::CloudDrive(cfg) => slots.cloud_drive = Some(cfg),
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ftp() -> FtpConfig {
        FtpConfig {
            address: "ftp.example.com:21".to_string(),
            directory: "/uploads".to_string(),
            username: "host".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn single_slot_resolves() {
        let slots = StorageSlots::from(StorageDescriptor::Ftp(ftp()));
        assert_eq!(slots.resolve().unwrap(), StorageDescriptor::Ftp(ftp()));
    }

    #[test]
    fn empty_or_multiple_slots_are_configuration_errors() {
        let err = StorageSlots::default().resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let mut slots = StorageSlots::from(StorageDescriptor::Ftp(ftp()));
        slots.filesystem = Some(FilesystemConfig {
            directory: "/srv".to_string(),
        });
        let err = slots.resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message().contains("filesystem"));
    }

    #[test]
    fn secrets_are_redacted_from_debug() {
        let rendered = format!("{:?}", StorageDescriptor::Ftp(ftp()));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("ftp.example.com"));

        let drive = CloudDriveConfig {
            oauth_token: "ya29.secret".to_string(),
            folder_id: "folder".to_string(),
            api_base: None,
            upload_base: None,
        };
        assert!(!format!("{:?}", drive).contains("ya29"));
    }

    #[test]
    fn drive_endpoints_are_optional() {
        let drive: CloudDriveConfig = serde_json::from_value(serde_json::json!({
            "oauthToken": "t",
            "folderId": "f"
        }))
        .unwrap();
        assert_eq!(drive.api_base, None);
        assert_eq!(drive.upload_base, None);

        let drive: CloudDriveConfig = serde_json::from_value(serde_json::json!({
            "oauthToken": "t",
            "folderId": "f",
            "apiBase": "http://drive.local/v3",
            "uploadBase": "http://drive.local/upload/v3"
        }))
        .unwrap();
        assert_eq!(drive.api_base.as_deref(), Some("http://drive.local/v3"));
        assert_eq!(drive.upload_base.as_deref(), Some("http://drive.local/upload/v3"));
    }

    #[test]
    fn descriptor_wire_format() {
        let json = serde_json::json!({
            "objectStore": {
                "region": "eu-west-1",
                "accessKey": "AK",
                "secretKey": "SK",
                "bucket": "photos"
            }
        });
        let descriptor: StorageDescriptor = serde_json::from_value(json).unwrap();
        match descriptor {
            StorageDescriptor::ObjectStore(cfg) => {
                assert_eq!(cfg.bucket, "photos");
                assert_eq!(cfg.endpoint, None);
                assert!(!cfg.insecure);
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }
}
