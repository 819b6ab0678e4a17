use crate::domain::model::{DataSet, Mapping, Row, SubstitutionRecord};
use std::collections::BTreeMap;

/// 文件名前綴欄位；同時可作為模板中的 `{{文件名前缀}}`
pub const FILE_PREFIX_KEY: &str = "文件名前缀";
pub const DEFAULT_FILE_PREFIX: &str = "律师函";

/// 由一行數據與映射生成替換記錄；未映射或空值一律為空字串
pub fn project(row: &Row, mapping: &Mapping, extras: &BTreeMap<String, String>) -> SubstitutionRecord {
    let mut record = SubstitutionRecord::new();

    for (placeholder, column) in mapping.iter() {
        let value = column
            .and_then(|col| row.get(col))
            .filter(|value| !value.is_blank())
            .map(|value| value.to_display_string())
            .unwrap_or_default();
        record.insert(placeholder.clone(), value);
    }

    for (key, value) in extras {
        record.insert(key.clone(), value.clone());
    }

    record
}

pub fn project_all(dataset: &DataSet, mapping: &Mapping, extras: &BTreeMap<String, String>) -> Vec<SubstitutionRecord> {
    dataset
        .rows
        .iter()
        .map(|row| project(row, mapping, extras))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Value;

    fn row(cells: &[(&str, Value)]) -> Row {
        Row {
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_project_stringifies_and_blanks() {
        let mut mapping = Mapping::new();
        mapping.insert("姓名", Some("姓名".to_string()));
        mapping.insert("金额", Some("金额".to_string()));
        mapping.insert("备注", Some("备注".to_string()));
        mapping.insert("电话", None);
        mapping.insert("地址", Some("不存在的列".to_string()));

        let data = row(&[
            ("姓名", Value::String("张三".to_string())),
            ("金额", Value::Number(12000.0)),
            ("备注", Value::Blank),
        ]);

        let record = project(&data, &mapping, &BTreeMap::new());
        assert_eq!(record["姓名"], "张三");
        assert_eq!(record["金额"], "12000");
        assert_eq!(record["备注"], "");
        assert_eq!(record["电话"], "");
        assert_eq!(record["地址"], "");
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn test_extras_pass_through_unchanged() {
        let mapping = Mapping::new();
        let mut extras = BTreeMap::new();
        extras.insert(FILE_PREFIX_KEY.to_string(), "催款函".to_string());

        let record = project(&Row::default(), &mapping, &extras);
        assert_eq!(record[FILE_PREFIX_KEY], "催款函");
    }

    #[test]
    fn test_project_all_keeps_row_order_and_dataset_intact() {
        let mut mapping = Mapping::new();
        mapping.insert("姓名", Some("姓名".to_string()));

        let dataset = DataSet {
            columns: vec!["姓名".to_string()],
            rows: vec![
                row(&[("姓名", Value::String("甲".to_string()))]),
                row(&[("姓名", Value::String("乙".to_string()))]),
            ],
        };
        let before = dataset.clone();

        let records = project_all(&dataset, &mapping, &BTreeMap::new());
        assert_eq!(records[0]["姓名"], "甲");
        assert_eq!(records[1]["姓名"], "乙");
        assert_eq!(dataset.rows, before.rows);
    }
}
