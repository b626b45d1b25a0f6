use anyhow::{Context, Result, bail};
use clap::Parser;
use dlms_dissector::{ConversationId, CosemRegistry, Dissector, DissectorConfig, ObisCode};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dlms-decode")]
#[command(about = "Decode captured DLMS/COSEM frames")]
struct Cli {
    /// Frames as hex strings, decoded in order
    frames: Vec<String>,

    /// File with one hex frame per line; `#` starts a comment
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Conversation the frames belong to
    #[arg(short, long, default_value = "1")]
    conversation: u64,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra instance name, as A.B.C.D.E.F=Name
    #[arg(long = "obis-name", value_name = "OBIS=NAME")]
    obis_names: Vec<String>,

    /// Print each dissection as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DissectorConfig::from_file(path)?,
        None => DissectorConfig::default(),
    };
    let mut registry = CosemRegistry::standard();
    for entry in &cli.obis_names {
        let (obis, name) = entry
            .split_once('=')
            .with_context(|| format!("expected OBIS=NAME, got {:?}", entry))?;
        let obis: ObisCode = obis.parse()?;
        registry.register_instance(obis, name.trim());
    }
    let dissector = Dissector::builder()
        .config(config)
        .registry(Arc::new(registry))
        .build()?;

    let mut frames = cli.frames.clone();
    if let Some(path) = &cli.input {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        frames.extend(frame_lines(&content));
    }
    if frames.is_empty() {
        bail!("no frames given");
    }

    let conversation = ConversationId(cli.conversation);
    for (index, text) in frames.iter().enumerate() {
        let bytes = parse_hex(text).with_context(|| format!("frame {}", index + 1))?;
        let dissection = dissector.dissect(conversation, index as u64 + 1, &bytes);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&dissection)?);
        } else {
            println!("{}", dissection.render());
        }
    }
    if dissector.pending_reassemblies() > 0 {
        log::info!("{} reassembly stream(s) still incomplete", dissector.pending_reassemblies());
    }
    Ok(())
}

/// Non-empty lines with comments removed
fn frame_lines(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

/// Hex digits, ignoring whitespace, `:` and `-` separators
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    Ok(hex::decode(&digits)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("7E A0 07").unwrap(), vec![0x7E, 0xA0, 0x07]);
        assert_eq!(parse_hex("c0:01-c1").unwrap(), vec![0xC0, 0x01, 0xC1]);
        assert!(parse_hex("7E A").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_frame_lines() {
        let content = "# capture\nC0 01 C1\n\n  7E A0 # partial\n#\n";
        let lines: Vec<String> = frame_lines(content).collect();
        assert_eq!(lines, vec!["C0 01 C1", "7E A0"]);
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::parse_from([
            "dlms-decode",
            "--obis-name",
            "1.0.1.8.0.255=Energy",
            "--obis-name",
            "1.0.2.8.0.255=Export",
            "--json",
            "C00101",
        ]);
        assert_eq!(cli.frames, vec!["C00101"]);
        assert_eq!(cli.obis_names.len(), 2);
        assert_eq!(cli.conversation, 1);
        assert!(cli.json);
    }
}
