use std::io::Write;

use fusion_gateway_config::{compose::ComposeConfig, FusionGatewayConfig};
use schemars::{generate::SchemaSettings, Schema};

fn generate<T: schemars::JsonSchema>() -> Schema {
    SchemaSettings::draft2020_12()
        .with(|s| {
            s.inline_subschemas = true;
        })
        .into_generator()
        .into_root_schema_for::<T>()
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<String>>();
    let schema = match args.get(2).map(String::as_str) {
        Some("compose") => generate::<ComposeConfig>(),
        _ => generate::<FusionGatewayConfig>(),
    };
    let schema_str = serde_json::to_string_pretty(&schema)?;

    match args.get(1) {
        Some(output_file) if output_file != "-" => {
            let mut file = std::fs::File::create(output_file)?;
            file.write_all(schema_str.as_bytes())?;

            println!("JSON Schema written to {}", output_file);
        }
        _ => {
            println!("{}", schema_str);
        }
    }

    Ok(())
}
