use anyhow::Result;

/// Print the OpenAPI document as pretty JSON on stdout.
fn main() -> Result<()> {
    let doc = ensaluti::api::openapi();
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
