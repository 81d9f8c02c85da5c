//! Loading `{"headers": [...], "rows": [[...], ...]}` input files.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use flowrelay_core::{MappedRows, Mapper};

/// Sheet contents as exported by the upload front end.
#[derive(Debug, Deserialize)]
pub struct RowsFile {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl RowsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read rows file '{}'", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parse rows file '{}'", path.display()))
    }

    pub fn map(&self, mapper: &Mapper, mapping: &str) -> Result<MappedRows> {
        mapper
            .map(mapping, &self.headers, &self.rows)
            .with_context(|| format!("map rows with '{mapping}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowrelay_core::{MappingRegistry, MaterialsPolicy};
    use std::sync::Arc;

    #[test]
    fn parses_and_maps() {
        let file: RowsFile = serde_json::from_str(
            r#"{"headers": ["产品编码", "采购价", "税点", "不含税采购价"],
                "rows": [["A1", 10, 13, 8.85], ["", 10, 13, 8.85]]}"#,
        )
        .unwrap();
        let mapper = Mapper::new(Arc::new(MappingRegistry::with_builtin(MaterialsPolicy::default())));
        let mapped = file.map(&mapper, "materials").unwrap();
        assert_eq!(mapped.valid.len(), 1);
        assert_eq!(mapped.invalid.len(), 1);
        assert!(file.map(&mapper, "orders").is_err());
    }
}
