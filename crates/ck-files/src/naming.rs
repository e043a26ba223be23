//! File name rules

use crate::storage::{StorageError, StorageResult};

/// Reduce a client-supplied upload name to a bare file name.
///
/// Directory components are dropped, so `../../etc/passwd` becomes `passwd`.
pub fn upload_name(raw: &str) -> StorageResult<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return Err(StorageError::InvalidName(raw.to_string()));
    }

    Ok(name.to_string())
}

/// Reject names that would leave the storage directory.
///
/// Accepts every name `upload_name` can produce, so every stored file
/// can be read and deleted again.
pub fn stored_name(name: &str) -> StorageResult<&str> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::Forbidden(name.to_string()));
    }
    Ok(name)
}

/// Name to try on the `attempt`th collision: `report.pdf`, `report_1.pdf`,
/// `report_2.pdf`, ...
pub fn candidate(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &name[..dot], attempt, &name[dot..]),
        _ => format!("{}_{}", name, attempt),
    }
}
