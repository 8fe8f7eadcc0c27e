//! Handlers for single-asset operations: URL resolution, signing, and the
//! management actions (visibility, cache, delete/restore).

use super::AppState;
use crate::{
    models::{ImageFormat, SignedUrlRequest, TransformParams},
    services::{
        access_resolver::{AccessResolver, Resolution, UrlSource},
        asset_service::{AssetBackend, Visibility},
    },
};
use anyhow::{Context, Result};
use std::sync::Arc;

/// `url <id>`: print the URL to fetch the asset from.
///
/// Falls back to the distribution URL when a private asset cannot be signed
/// and says so on stderr.
pub async fn resolve_url(state: &AppState, id: &str, expires_in: Option<u64>) -> Result<()> {
    let asset = state
        .service
        .get_asset(id)
        .await
        .with_context(|| format!("loading asset {}", id))?;

    let resolver = AccessResolver::new(state.service.clone());
    let expires_in = expires_in.unwrap_or(state.config.expires_in);
    let Resolution::Resolved(resolved) = resolver.resolve(Some(Arc::new(asset)), expires_in).await
    else {
        anyhow::bail!("resolution for {} was superseded", id);
    };

    let url = resolved.url.context("asset resolved to no url")?;
    println!("{}", url);
    match resolved.source {
        UrlSource::Fallback => {
            if let Some(error) = resolved.error {
                eprintln!("warning: {} (showing distribution url instead)", error);
            }
        }
        UrlSource::Signed => {
            if let Some(grant) = resolved.grant {
                eprintln!("expires at {}", grant.expires_at.to_rfc3339());
            }
        }
        UrlSource::Distribution | UrlSource::None => {}
    }
    Ok(())
}

/// `sign <id>`: generate a signed URL with optional transformations.
pub async fn sign_url(
    state: &AppState,
    id: &str,
    expires_in: Option<u64>,
    transform: TransformParams,
) -> Result<()> {
    let request =
        SignedUrlRequest::new(expires_in.unwrap_or(state.config.expires_in)).with_transform(transform);
    let grant = state
        .service
        .signed_url(id, request)
        .await
        .with_context(|| format!("signing url for asset {}", id))?;

    println!("{}", grant.signed_url);
    eprintln!(
        "valid for {} minutes (until {})",
        grant.expires_in_seconds / 60,
        grant.expires_at.to_rfc3339()
    );
    if let Some(applied) = grant.transformations.filter(|t| !t.is_empty()) {
        let applied: Vec<String> = applied
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        eprintln!("transformations: {}", applied.join(", "));
    }
    Ok(())
}

pub fn transform_params(
    format: Option<ImageFormat>,
    width: Option<u32>,
    height: Option<u32>,
    quality: Option<u8>,
) -> TransformParams {
    TransformParams {
        format,
        width,
        height,
        quality,
    }
}

/// `show <id>`
pub async fn show_asset(state: &AppState, id: &str) -> Result<()> {
    let asset = state
        .service
        .get_asset(id)
        .await
        .with_context(|| format!("loading asset {}", id))?;
    println!("{}", serde_json::to_string_pretty(&asset)?);
    Ok(())
}

/// `stats <id>`
pub async fn show_stats(state: &AppState, id: &str) -> Result<()> {
    let stats = state
        .service
        .asset_stats(id)
        .await
        .with_context(|| format!("loading stats for asset {}", id))?;
    println!("requests\t{}", stats.total_requests);
    println!("bandwidth\t{:.2} GB", stats.total_gb);
    println!(
        "cache hit ratio\t{}",
        stats.cache_hit_ratio.as_deref().unwrap_or("0%")
    );
    println!("estimated cost\t${:.4}", stats.estimated_cost_usd);
    Ok(())
}

/// `list`: one page, one line per asset.
pub async fn list_assets(state: &AppState, page: u32, limit: u32) -> Result<()> {
    let listing = state
        .service
        .list_assets(page, limit)
        .await
        .context("listing assets")?;

    for asset in &listing.assets {
        let mut flags = Vec::new();
        if asset.is_private {
            flags.push("private");
        }
        if asset.is_deleted {
            flags.push("deleted");
        }
        println!(
            "{}\t{}\t{}\t{}\t{}",
            asset.id,
            asset.name,
            asset.size_bytes,
            asset.folder().unwrap_or("-"),
            flags.join(",")
        );
    }
    if let Some(total) = listing.total {
        eprintln!(
            "page {} ({} of {} assets)",
            listing.page.unwrap_or(page),
            listing.assets.len(),
            total
        );
    }
    Ok(())
}

/// `make-private` / `make-public`
pub async fn set_visibility(
    state: &AppState,
    id: &str,
    visibility: Visibility,
    folder: Option<&str>,
) -> Result<()> {
    let update = state
        .service
        .set_visibility(id, visibility, folder)
        .await
        .with_context(|| format!("changing visibility of asset {}", id))?;

    if let Some(message) = &update.message {
        eprintln!("{}", message);
    }
    println!("{}\t{}", update.asset.new_s3_key, update.asset.cloudfront_url);
    Ok(())
}

/// `invalidate <id>`
pub async fn invalidate_cache(state: &AppState, id: &str) -> Result<()> {
    let result = state
        .service
        .invalidate_cache(id)
        .await
        .with_context(|| format!("invalidating cache for asset {}", id))?;

    println!(
        "{}\t{}\t{}",
        result.invalidation.id,
        result.invalidation.status,
        result.invalidation.paths.join(",")
    );
    eprintln!("invalidation may take a few minutes to propagate");
    Ok(())
}

/// `delete <id>`
pub async fn delete_asset(state: &AppState, id: &str) -> Result<()> {
    let status = state
        .service
        .delete_asset(id)
        .await
        .with_context(|| format!("deleting asset {}", id))?;
    println!("{}", status.message.as_deref().unwrap_or("deleted"));
    Ok(())
}

/// `restore <id>`
pub async fn restore_asset(state: &AppState, id: &str) -> Result<()> {
    let status = state
        .service
        .restore_asset(id)
        .await
        .with_context(|| format!("restoring asset {}", id))?;
    println!("{}", status.message.as_deref().unwrap_or("restored"));
    Ok(())
}
