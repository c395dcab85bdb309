use std::{error::Error, io::Write};

use hive_gateway_executor_config::GatewayExecutorConfig;
use schemars::generate::SchemaSettings;

/// Prints the JSON schema of the executor configuration,
/// or writes it to the path given as the first argument.
fn main() -> Result<(), Box<dyn Error>> {
    let schema = SchemaSettings::draft2020_12()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<GatewayExecutorConfig>();
    let rendered = serde_json::to_string_pretty(&schema)?;

    match std::env::args().nth(1) {
        Some(output_path) => {
            std::fs::File::create(&output_path)?.write_all(rendered.as_bytes())?;
            println!("JSON Schema written to {}", output_path);
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
