//! Ports input file.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One harbor entry from the ports file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port code as used in listing URLs.
    pub code: String,
    /// Human-readable name.
    pub name: String,
}

/// Read the ports file: CSV with a header row and at least two columns,
/// port code first, display name second. Rows with an empty code are skipped.
pub fn load_ports(path: &Path) -> anyhow::Result<Vec<Port>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to read ports file {}", path.display()))?;

    let mut ports = Vec::new();
    for record in reader.records() {
        let record = record?;
        let code = record.get(0).unwrap_or("").trim().to_string();
        if code.is_empty() {
            continue;
        }
        let name = record.get(1).unwrap_or("").trim().to_string();
        ports.push(Port { code, name });
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_code_and_name_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ports.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "code,name").unwrap();
        writeln!(file, "IDSUB, Tanjung Perak").unwrap();
        writeln!(file, ",missing code").unwrap();
        writeln!(file, "IDJKT,Tanjung Priok").unwrap();

        let ports = load_ports(&path).unwrap();
        assert_eq!(
            ports,
            vec![
                Port {
                    code: "IDSUB".into(),
                    name: "Tanjung Perak".into()
                },
                Port {
                    code: "IDJKT".into(),
                    name: "Tanjung Priok".into()
                },
            ]
        );
    }
}
