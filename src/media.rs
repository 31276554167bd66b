use anyhow::Context;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::storage::StorageClient;

/// One file part received with a request.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Folder an uploaded asset is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Avatar,
    CoverImage,
}

impl AssetKind {
    fn prefix(self) -> &'static str {
        match self {
            AssetKind::Avatar => "users/avatars",
            AssetKind::CoverImage => "users/covers",
        }
    }
}

/// A stored asset: its object key (for cleanup) and its public URL.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub key: String,
    pub url: String,
}

pub async fn upload_asset(
    storage: &dyn StorageClient,
    kind: AssetKind,
    item: UploadItem,
) -> anyhow::Result<StoredAsset> {
    anyhow::ensure!(!item.body.is_empty(), "empty upload");

    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", kind.prefix(), Uuid::new_v4(), ext);
    storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let url = storage.public_url(&key);
    debug!(%key, ?kind, "asset uploaded");
    Ok(StoredAsset { key, url })
}

/// Deletes assets left behind by a request that failed after uploading.
pub async fn discard_assets(storage: &dyn StorageClient, assets: &[StoredAsset]) {
    for asset in assets {
        if let Err(e) = storage.delete_object(&asset.key).await {
            tracing::warn!(error = %e, key = %asset.key, "orphaned asset not deleted");
        }
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
