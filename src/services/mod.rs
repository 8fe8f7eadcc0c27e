pub mod access_resolver;
pub mod asset_service;
pub mod gateway;
pub mod upload_orchestrator;

#[cfg(test)]
pub(crate) mod testing;
