use crate::domain::model::{DataSet, PlaceholderSet, Row, Value};
use crate::utils::error::{MergeError, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::collections::HashMap;
use std::path::Path;

/// 讀取時視為空值的文字（與 pandas 的預設缺失值一致）
pub const NULL_MARKERS: &[&str] = &[
    "NaN", "nan", "-NaN", "-nan", "NULL", "null", "N/A", "n/a", "NA", "#N/A", "#N/A N/A", "#NA",
    "None", "<NA>", "1.#IND", "1.#QNAN", "-1.#IND", "-1.#QNAN",
];

/// 載入數據文件（xlsx / xlsm / csv），第一行為表頭
pub fn load_dataset(path: &Path, sheet: Option<&str>) -> Result<DataSet> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let dataset = match extension.as_str() {
        "xlsx" | "xlsm" => load_workbook(path, sheet)?,
        "csv" => load_csv(path)?,
        other => {
            return Err(MergeError::data_format(format!(
                "unsupported data file type '.{}' ({})",
                other,
                path.display()
            )))
        }
    };

    tracing::info!(
        "📊 Loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

/// xlsx 中數值型儲存格的類型標記
const NUMERIC_TYPE: &str = "n";

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<DataSet> {
    let book = umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|e| MergeError::data_format(format!("cannot read workbook {}: {}", path.display(), e)))?;

    let worksheet = match sheet {
        Some(name) => book
            .get_sheet_by_name(name)
            .ok_or_else(|| MergeError::data_format(format!("sheet '{}' not found", name)))?,
        None => book
            .get_sheet_collection()
            .first()
            .ok_or_else(|| MergeError::data_format("workbook has no sheets"))?,
    };

    let (max_col, max_row) = worksheet.get_highest_column_and_row();
    if max_row == 0 || max_col == 0 {
        return Ok(DataSet::default());
    }

    let headers = (1..=max_col).map(|col| {
        worksheet
            .get_cell((col, 1u32))
            .map(|cell| cell.get_value().trim().to_string())
            .unwrap_or_default()
    });
    let columns = unique_columns(headers);

    let mut rows = Vec::new();
    for row_idx in 2..=max_row {
        let values: Vec<Value> = (1..=max_col)
            .map(|col| {
                worksheet
                    .get_cell((col, row_idx))
                    .map(classify_cell)
                    .unwrap_or(Value::Blank)
            })
            .collect();

        if let Some(row) = build_row(&columns, values) {
            rows.push(row);
        }
    }

    Ok(DataSet { columns, rows })
}

fn load_csv(path: &Path) -> Result<DataSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();
    let columns = unique_columns(headers.into_iter());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let values: Vec<Value> = (0..columns.len())
            .map(|i| match record.get(i) {
                Some(text) if !is_null_text(text) => Value::String(text.to_string()),
                _ => Value::Blank,
            })
            .collect();

        if let Some(row) = build_row(&columns, values) {
            rows.push(row);
        }
    }

    Ok(DataSet { columns, rows })
}

// 全空的行直接跳過
fn build_row(columns: &[String], values: Vec<Value>) -> Option<Row> {
    if values.iter().all(Value::is_blank) {
        return None;
    }
    Some(Row {
        cells: columns.iter().cloned().zip(values).collect(),
    })
}

fn is_null_text(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || NULL_MARKERS.contains(&text)
}

/// 表頭去重：空表頭為 `Unnamed: <列號>`，重複名稱依序加 `.1`、`.2`
pub fn unique_columns(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut counters: HashMap<String, usize> = HashMap::new();

    for (i, name) in raw.enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };

        let mut candidate = base.clone();
        while columns.contains(&candidate) {
            let counter = counters.entry(base.clone()).or_insert(0);
            *counter += 1;
            candidate = format!("{}.{}", base, counter);
        }
        columns.push(candidate);
    }

    columns
}

/// 只有數值型儲存格轉為數字或日期；文字儲存格原樣保留
fn classify_cell(cell: &umya_spreadsheet::Cell) -> Value {
    let raw = cell.get_value();
    let text = raw.as_ref();
    if is_null_text(text) {
        return Value::Blank;
    }

    if cell.get_data_type() == NUMERIC_TYPE {
        if let Ok(number) = text.parse::<f64>() {
            let date_formatted = cell
                .get_style()
                .get_number_format()
                .map(|format| is_date_format(format.get_format_code()))
                .unwrap_or(false);

            if date_formatted {
                if let Some(datetime) = excel_serial_to_datetime(number) {
                    return Value::Date(datetime);
                }
            }
            if number.is_finite() {
                return Value::Number(number);
            }
        }
    }

    Value::String(text.to_string())
}

/// 數字格式是否為日期/時間格式（忽略引號與方括號內的內容）
pub fn is_date_format(code: &str) -> bool {
    let mut cleaned = String::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    for c in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            _ if in_quotes || in_brackets => {}
            c => cleaned.push(c.to_ascii_lowercase()),
        }
    }

    if cleaned == "general" {
        return false;
    }
    cleaned.contains('y') || cleaned.contains('d') || cleaned.contains('h')
}

/// Excel 序列日期（1900 日期系統）轉換為日期時間
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// 生成只含表頭的數據模板，表頭為排序後的變量名
pub fn write_worksheet_template(placeholders: &PlaceholderSet, path: &Path) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_by_name_mut("Sheet1")
        .ok_or_else(|| MergeError::Processing {
            message: "new workbook has no default sheet".to_string(),
        })?;

    for (i, name) in placeholders.iter().enumerate() {
        let coordinate = format!("{}1", column_letter(i + 1));
        sheet.get_cell_mut(coordinate.as_str()).set_value_string(name.as_str());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    umya_spreadsheet::writer::xlsx::write(&book, path)
        .map_err(|e| MergeError::data_format(format!("cannot write workbook {}: {}", path.display(), e)))?;

    tracing::info!("📝 Wrote data worksheet with {} columns to {}", placeholders.len(), path.display());
    Ok(())
}

fn column_letter(n: usize) -> String {
    let mut result = String::new();
    let mut n = n;
    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unique_columns() {
        let columns = unique_columns(names(&["姓名", "", "姓名", "金额", "姓名"]).into_iter());
        assert_eq!(columns, names(&["姓名", "Unnamed: 1", "姓名.1", "金额", "姓名.2"]));
    }

    #[test]
    fn test_date_format_detection() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("m/d/yy h:mm"));
        assert!(is_date_format("[$-804]yyyy\"年\"m\"月\"d\"日\""));
        assert!(!is_date_format("General"));
        assert!(!is_date_format("#,##0.00"));
        assert!(!is_date_format("0.00\"d\""));
    }

    #[test]
    fn test_excel_serial_conversion() {
        let date = excel_serial_to_datetime(45352.0).unwrap();
        assert_eq!(date.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let with_time = excel_serial_to_datetime(45352.5).unwrap();
        assert_eq!(with_time.format("%H:%M").to_string(), "12:00");
        assert!(excel_serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn test_null_markers_are_trimmed() {
        for marker in ["NULL", " N/A ", "#N/A N/A", "-1.#QNAN", "-nan", "  "] {
            assert!(is_null_text(marker), "{:?}", marker);
        }
        assert!(!is_null_text("NULLS"));
        assert!(!is_null_text("0"));
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
    }

    #[test]
    fn test_load_csv_keeps_text_and_skips_blank_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "\u{feff}姓名,金额,备注\n张三,0012000,N/A\n,,\n李四,8000,\n").unwrap();

        let dataset = load_dataset(&path, None).unwrap();
        assert_eq!(dataset.columns, names(&["姓名", "金额", "备注"]));
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0].get("金额"), Some(&Value::String("0012000".to_string())));
        assert_eq!(dataset.rows[0].get("备注"), Some(&Value::Blank));
        assert_eq!(dataset.rows[1].get("姓名"), Some(&Value::String("李四".to_string())));
    }

    #[test]
    fn test_worksheet_template_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("模板").join("律师函数据模板.xlsx");
        let placeholders: PlaceholderSet = ["金额", "姓名", "日期"].iter().map(|s| s.to_string()).collect();

        write_worksheet_template(&placeholders, &path).unwrap();

        let dataset = load_dataset(&path, None).unwrap();
        let expected: Vec<String> = placeholders.iter().cloned().collect();
        assert_eq!(dataset.columns, expected);
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_load_workbook_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");

        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut("A1").set_value("姓名");
        sheet.get_cell_mut("B1").set_value("金额");
        sheet.get_cell_mut("C1").set_value("工号");
        sheet.get_cell_mut("A2").set_value("张三");
        sheet.get_cell_mut("B2").set_value_number(12000.0);
        sheet.get_cell_mut("C2").set_value_string("007");
        sheet.get_cell_mut("D1").set_value("案号");
        sheet.get_cell_mut("D2").set_value_string("1.50");
        sheet.get_cell_mut("D4").set_value_string("1e3");
        sheet.get_cell_mut("A4").set_value("李四");
        umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

        let dataset = load_dataset(&path, None).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0].get("金额").unwrap().to_display_string(), "12000");
        assert_eq!(dataset.rows[0].get("工号").unwrap().to_display_string(), "007");
        assert_eq!(dataset.rows[1].get("金额"), Some(&Value::Blank));

        // 文字儲存格即使看起來像數字也保持原樣
        assert_eq!(dataset.rows[0].get("案号"), Some(&Value::String("1.50".to_string())));
        assert_eq!(dataset.rows[1].get("案号"), Some(&Value::String("1e3".to_string())));
        assert_eq!(dataset.rows[0].get("金额"), Some(&Value::Number(12000.0)));

        assert!(load_dataset(&path, Some("不存在")).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_dataset(Path::new("data.json"), None).unwrap_err();
        assert!(matches!(err, MergeError::DataFormat { .. }));
    }
}
