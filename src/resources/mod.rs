//! Loading of external files and their conversion into GPU resources.
//!
//! Paths are relative to the asset root: `./assets` natively and
//! `<origin>/assets` on the web. A file that cannot be fetched or decoded never
//! aborts the scene: [`SceneAssets::load`] logs it and substitutes a neutral
//! default, so the affected texture slot simply renders white or flat.

pub mod texture;

use crate::{config::AssetPaths, context::InitContext, data_structures::texture::Texture};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page has no origin"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        response.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(path).await?
    };

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(device, queue, &data, file_name, None, is_normal_map)
}

pub async fn load_hdr_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_hdr_bytes(device, queue, &data, file_name)
}

/// Whether a texture slot holds the requested file or its default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetStatus {
    Loaded,
    Fallback,
}

/// Unwrap a load result, or log the failure and build the default instead.
pub fn or_fallback<T>(
    file_name: &str,
    result: anyhow::Result<T>,
    fallback: impl FnOnce() -> T,
) -> (T, AssetStatus) {
    match result {
        Ok(value) => (value, AssetStatus::Loaded),
        Err(e) => {
            log::warn!("Could not load {file_name}, using a default instead: {e:#}");
            (fallback(), AssetStatus::Fallback)
        }
    }
}

/// The textures the scene's materials reference.
#[derive(Debug)]
pub struct SceneAssets {
    pub normal_map: Texture,
    pub background: Texture,
    pub environment: Texture,
    pub status: [(String, AssetStatus); 3],
}

impl SceneAssets {
    /// Fetch and decode all three files concurrently. Never fails; see the
    /// module docs.
    pub async fn load(ctx: &InitContext, paths: &AssetPaths) -> Self {
        let device = &ctx.device;
        let queue = &ctx.queue;
        let (normal_map, background, environment) = futures::join!(
            load_texture(&paths.normal_map, true, device, queue),
            load_texture(&paths.background, false, device, queue),
            load_hdr_texture(&paths.environment, device, queue),
        );

        let (normal_map, normal_status) = or_fallback(&paths.normal_map, normal_map, || {
            Texture::create_default_normal_map(device, queue)
        });
        let (background, background_status) = or_fallback(&paths.background, background, || {
            Texture::create_default_colour_map(device, queue)
        });
        let (environment, environment_status) =
            or_fallback(&paths.environment, environment, || {
                Texture::create_default_environment(device, queue)
            });
        log::info!(
            "Scene assets ready (normal map: {normal_status:?}, background: {background_status:?}, environment: {environment_status:?})"
        );

        Self {
            normal_map,
            background,
            environment,
            status: [
                (paths.normal_map.clone(), normal_status),
                (paths.background.clone(), background_status),
                (paths.environment.clone(), environment_status),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_values_pass_through() {
        let (value, status) = or_fallback("a.jpg", Ok(7), || 0);
        assert_eq!(value, 7);
        assert_eq!(status, AssetStatus::Loaded);
    }

    #[test]
    fn failures_are_replaced_by_the_default() {
        let (value, status) = or_fallback("missing.jpg", Err(anyhow::anyhow!("404")), || 42);
        assert_eq!(value, 42);
        assert_eq!(status, AssetStatus::Fallback);
    }

    #[test]
    fn fallback_is_not_built_on_success() {
        let mut built = false;
        let _ = or_fallback("a.hdr", Ok(()), || built = true);
        assert!(!built);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn missing_files_surface_as_errors() {
        let result = load_binary("textures/does-not-exist.jpg").await;
        assert!(result.is_err());
    }
}
