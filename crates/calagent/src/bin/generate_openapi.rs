//! Writes the OpenAPI document to the given path, or to stdout.
//!
//! Usage: `cargo run --bin generate_openapi [-- <path>]`

use calagent::server::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let spec = ApiDoc::openapi()
        .to_pretty_json()
        .expect("failed to serialize OpenAPI spec");

    match std::env::args().nth(1) {
        Some(path) => {
            let path = std::path::Path::new(&path);
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).expect("failed to create output directory");
            }
            std::fs::write(path, &spec).expect("failed to write OpenAPI spec");
            eprintln!("Wrote OpenAPI spec to {}", path.display());
        }
        None => println!("{spec}"),
    }
}
