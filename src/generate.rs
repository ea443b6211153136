//! The compile -> resolve -> synthesize -> encode -> write pipeline.

use crate::config::Settings;
use crate::Cli;
use anyhow::Context;
use proto_schema::{resolve_message, schema_from_descriptor_set_file};
use proto_types::{decode_message, encode_message, ProtoSchema};
use sample_generator::MessageSynthesizer;
use std::io::Write;

/// Run the command described by `cli`.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_cli(&cli)?;
    if settings.list {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        run_list(&settings, &mut out)
    } else {
        run_generate(&settings)
    }
}

/// Build the schema catalog from a descriptor set or by compiling `.proto`
/// inputs.
pub fn load_schema(settings: &Settings) -> anyhow::Result<ProtoSchema> {
    if let Some(path) = &settings.descriptor_set {
        if !settings.inputs.is_empty() {
            tracing::warn!(
                "Ignoring {} schema file(s): --descriptor-set was given",
                settings.inputs.len()
            );
        }
        return schema_from_descriptor_set_file(path)
            .with_context(|| format!("Failed to load descriptor set from {path:?}"));
    }

    if settings.inputs.is_empty() {
        anyhow::bail!("No schema files given (pass .proto files or --descriptor-set)");
    }

    settings
        .compiler()
        .compile_schema(&settings.inputs)
        .context("Failed to build schema")
}

/// Print every message type in the schema, one per line.
pub fn run_list(settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
    let schema = load_schema(settings)?;
    for name in schema.list_messages() {
        writeln!(out, "{name}")?;
    }
    out.flush()?;
    Ok(())
}

/// Synthesize the requested message and return its wire encoding.
pub fn generate_payload(settings: &Settings, schema: &ProtoSchema) -> anyhow::Result<Vec<u8>> {
    let requested = settings
        .message_type
        .as_deref()
        .context("No message type given")?;

    let descriptor = resolve_message(schema, requested)
        .with_context(|| format!("Failed to find message type '{requested}'"))?;
    tracing::info!("Resolved '{}' to {}", requested, descriptor.name);

    let message = MessageSynthesizer::new(schema)
        .with_recursion_policy(settings.recursion_policy()?)
        .with_clock(settings.clock())
        .synthesize(descriptor)
        .with_context(|| format!("Failed to synthesize {}", descriptor.name))?;

    let bytes = encode_message(&message)
        .with_context(|| format!("Failed to encode {}", descriptor.name))?;

    if settings.verify {
        let decoded = decode_message(schema, &message.message_type, &bytes)
            .with_context(|| format!("Failed to decode the encoded {}", descriptor.name))?;
        // Defaults with implicit presence decode as unset, so compare bytes
        let reencoded = encode_message(&decoded)
            .with_context(|| format!("Failed to re-encode the decoded {}", descriptor.name))?;
        if reencoded != bytes {
            anyhow::bail!(
                "Verification failed: decoded {} does not re-encode to the same bytes",
                descriptor.name
            );
        }
        tracing::info!("Verified {} byte payload", bytes.len());
    }

    Ok(bytes)
}

/// Synthesize the requested message and write it to the configured output.
pub fn run_generate(settings: &Settings) -> anyhow::Result<()> {
    let schema = load_schema(settings)?;
    let bytes = generate_payload(settings, &schema)?;

    match &settings.output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write payload to {path:?}"))?;
            tracing::info!("Wrote {} bytes to {:?}", bytes.len(), path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(&bytes)
                .and_then(|()| out.flush())
                .context("Failed to write payload to stdout")?;
            tracing::info!("Wrote {} bytes to stdout", bytes.len());
        }
    }

    Ok(())
}
