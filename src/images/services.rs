use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use rand::Rng;
use tracing::{info, instrument};

use crate::{
    error::{AppError, AppResult},
    gateway::{Gateway, GatewayError},
};

pub const RECIPE_IMAGE_PREFIX: &str = "recipe-images";
const NAME_LEN: usize = 13;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub struct UploadItem {
    pub file_name: Option<String>,
    pub body: Bytes,
    pub content_type: String,
}

/// Stores a recipe image under a random name and returns its public URL.
#[instrument(skip(gw, img), fields(size = img.body.len(), content_type = %img.content_type), err)]
pub async fn upload_recipe_image(gw: &Gateway, img: UploadItem) -> AppResult<String> {
    if img.body.is_empty() {
        return Err(AppError::BadRequest("No image provided".into()));
    }

    let ext = img
        .file_name
        .as_deref()
        .and_then(ext_from_file_name)
        .or_else(|| ext_from_mime(&img.content_type).map(str::to_string))
        .unwrap_or_else(|| "bin".to_string());
    let key = format!("{}/{}.{}", RECIPE_IMAGE_PREFIX, random_name(), ext);

    gw.storage()
        .put_object(&key, img.body, &img.content_type)
        .await
        .with_context(|| format!("put_object {}", key))
        .map_err(GatewayError::Storage)?;

    let url = gw.storage().public_url(&key);
    info!(%key, "recipe image uploaded");
    Ok(url)
}

fn random_name() -> String {
    let mut rng = rand::thread_rng();
    (0..NAME_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

fn ext_from_file_name(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
