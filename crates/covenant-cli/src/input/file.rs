use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON or YAML file and deserialise into a typed struct.
///
/// `.yaml` / `.yml` files are parsed as YAML, everything else as JSON.
pub fn read_file<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = if is_yaml(&canonical) {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

/// Read a JSON or YAML file as a generic serde_json::Value.
pub fn read_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    read_file(path)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::LoanTerms;
    use rust_decimal::Decimal;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cov-cli-{}-{}", std::process::id(), name));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_reads_yaml_terms() {
        let path = temp_file(
            "terms.yaml",
            "base_rate: 5.0\nbase_margin: 1.5\ncovenants:\n  max_leverage_ratio: 3.5\n  esg_target: 150\n  sustainability_discount: 0.10\n  sustainability_penalty: 0.05\n",
        );
        let terms: LoanTerms = read_file(path.to_str().unwrap()).unwrap();
        assert_eq!(terms.base_rate, Decimal::new(5, 0));
        assert_eq!(terms.covenants.esg_target, Decimal::new(150, 0));
        assert_eq!(terms.covenants.default_risk_premium, Decimal::new(2, 0));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_reads_json_value() {
        let path = temp_file("value.json", r#"{"ebitda_values": [1, 2, 3]}"#);
        let value = read_value(path.to_str().unwrap()).unwrap();
        assert_eq!(value["ebitda_values"].as_array().unwrap().len(), 3);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(read_value("/definitely/not/here.json").is_err());
    }
}
