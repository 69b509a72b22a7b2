//! services/api/src/bin/openapi.rs
//!
//! This binary generates the OpenAPI 3.0 specification for the relay API
//! and writes it to disk, for clients that consume the contract offline.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // An optional first argument overrides the output path.
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec_json)?;
    println!("OpenAPI specification generated at {}", path);
    Ok(())
}
