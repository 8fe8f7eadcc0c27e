//! Maps each CLI subcommand onto its handler.
//!
//! ## Commands
//! - **Uploads**
//!   - `upload <files...> [--folder] [--name]`: grant, transfer, register per file
//!
//! - **Access**
//!   - `url <id>`: distribution URL for public assets, signed URL for private ones
//!   - `sign <id> [--format --width --height --quality]`: signed URL with transformations
//!
//! - **Management**
//!   - `show <id>`, `stats <id>`, `list [--page --limit]`
//!   - `make-private <id>`, `make-public <id>` (optional `--folder`)
//!   - `invalidate <id>`, `delete <id>`, `restore <id>`

use crate::{
    config::Command,
    handlers::{
        AppState,
        asset_handlers::{
            delete_asset, invalidate_cache, list_assets, resolve_url, restore_asset,
            set_visibility, show_asset, show_stats, sign_url, transform_params,
        },
        upload_handlers::upload_files,
    },
    services::asset_service::Visibility,
};
use anyhow::Result;

/// Run `command` against the shared state.
pub async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Upload {
            files,
            folder,
            name,
        } => upload_files(state, files, folder, name).await,
        Command::Url { id, expires_in } => resolve_url(state, &id, expires_in).await,
        Command::Sign {
            id,
            expires_in,
            format,
            width,
            height,
            quality,
        } => {
            let transform = transform_params(format, width, height, quality);
            sign_url(state, &id, expires_in, transform).await
        }
        Command::Show { id } => show_asset(state, &id).await,
        Command::Stats { id } => show_stats(state, &id).await,
        Command::List { page, limit } => list_assets(state, page, limit).await,
        Command::MakePrivate { id, folder } => {
            set_visibility(state, &id, Visibility::Private, folder.as_deref()).await
        }
        Command::MakePublic { id, folder } => {
            set_visibility(state, &id, Visibility::Public, folder.as_deref()).await
        }
        Command::Invalidate { id } => invalidate_cache(state, &id).await,
        Command::Delete { id } => delete_asset(state, &id).await,
        Command::Restore { id } => restore_asset(state, &id).await,
    }
}
