use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// One entry per variant of [`crate::StorageDescriptor`]. Used for logging and for
/// asking a resolved backend what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageKind {
    Filesystem,
    ObjectStore,
    Ftp,
    CloudDrive,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "filesystem" => Ok(StorageKind::Filesystem),
            "objectstore" | "object_store" | "s3" => Ok(StorageKind::ObjectStore),
            "ftp" => Ok(StorageKind::Ftp),
            "clouddrive" | "cloud_drive" | "google_drive" => Ok(StorageKind::CloudDrive),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageKind::Filesystem => write!(f, "filesystem"),
            StorageKind::ObjectStore => write!(f, "object_store"),
            StorageKind::Ftp => write!(f, "ftp"),
            StorageKind::CloudDrive => write!(f, "cloud_drive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("S3".parse::<StorageKind>().unwrap(), StorageKind::ObjectStore);
        assert_eq!(
            "google_drive".parse::<StorageKind>().unwrap(),
            StorageKind::CloudDrive
        );
        assert!("nfs".parse::<StorageKind>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for kind in [
            StorageKind::Filesystem,
            StorageKind::ObjectStore,
            StorageKind::Ftp,
            StorageKind::CloudDrive,
        ] {
            assert_eq!(kind.to_string().parse::<StorageKind>().unwrap(), kind);
        }
    }
}
