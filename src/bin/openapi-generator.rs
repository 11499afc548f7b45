//! Print the OpenAPI document of the game API to stdout.

use utoipa::OpenApi;
use words_weave_back::services::documentation::ApiDoc;

fn main() -> Result<(), serde_json::Error> {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json()?);
    Ok(())
}
