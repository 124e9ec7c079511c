// src/output.rs

use crate::error::{Result, TvlError};
use crate::types::conversions::rational_to_decimal;
use log::info;
use num_rational::BigRational;
use rust_decimal::prelude::ToPrimitive;
use std::path::{Path, PathBuf};

/// Fractional digits kept in the JSON artifact.
const ARTIFACT_SCALE: u32 = 6;

/// `1234567.891` -> `"1,234,567.89"`.
pub fn format_usd(value: &BigRational) -> Result<String> {
    let rounded = rational_to_decimal(value, 2)?;
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    Ok(format!("{}{}.{}", sign, grouped, frac_part))
}

/// The TVL as a plain JSON number.
pub fn tvl_json_value(value: &BigRational) -> Result<serde_json::Value> {
    let decimal = rational_to_decimal(value, ARTIFACT_SCALE)?;
    let float = decimal
        .to_f64()
        .ok_or_else(|| TvlError::Conversion(format!("{} is not representable as f64", decimal)))?;

    serde_json::Number::from_f64(float)
        .map(serde_json::Value::Number)
        .ok_or_else(|| TvlError::Conversion(format!("{} is not a finite JSON number", float)))
}

/// Sibling of `path` the artifact is staged in before the rename.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tvl".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Replaces `path` with the TVL, creating parent directories as needed.
///
/// The body goes to a sibling file first and is renamed over `path`, so readers only ever
/// see the previous artifact or the complete new one.
pub async fn write_tvl(path: &Path, tvl: &BigRational) -> Result<()> {
    let body = serde_json::to_string_pretty(&tvl_json_value(tvl)?)
        .map_err(|e| TvlError::Conversion(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let staging = staging_path(path);
    let staged = match tokio::fs::write(&staging, body).await {
        Ok(()) => tokio::fs::rename(&staging, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = staged {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }

    info!("Wrote TVL to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_format_usd_groups_thousands() {
        assert_eq!(format_usd(&ratio(200, 1)).unwrap(), "200.00");
        assert_eq!(format_usd(&ratio(1_234_567_891, 1000)).unwrap(), "1,234,567.89");
        assert_eq!(format_usd(&ratio(1_000, 1)).unwrap(), "1,000.00");
        assert_eq!(format_usd(&ratio(0, 1)).unwrap(), "0.00");
        // Half rounds away from zero
        assert_eq!(format_usd(&ratio(1, 200)).unwrap(), "0.01");
    }

    #[test]
    fn test_json_value_is_number() {
        assert_eq!(tvl_json_value(&ratio(200, 1)).unwrap(), serde_json::json!(200.0));
        assert_eq!(tvl_json_value(&ratio(1, 3)).unwrap(), serde_json::json!(0.333333));
    }

    #[tokio::test]
    async fn test_write_creates_parent_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("pools.json");

        write_tvl(&path, &ratio(1, 1)).await.unwrap();
        write_tvl(&path, &ratio(401, 2)).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: f64 = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, 200.5);

        let names: Vec<String> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["pools.json".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = dir.path().join("pools.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = write_tvl(&path, &ratio(1, 1)).await.unwrap_err();
        assert!(matches!(err, TvlError::Output(_)));
        assert!(!staging_path(&path).exists());
        assert!(path.join("keep").exists());
    }
}
