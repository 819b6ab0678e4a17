use crate::domain::model::Mapping;
use crate::utils::error::{MergeError, Result};

/// 小寫並移除所有空白，用於模糊匹配
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn match_column<'a>(placeholder: &str, columns: &'a [String]) -> Option<&'a String> {
    if let Some(exact) = columns.iter().find(|c| c.as_str() == placeholder) {
        return Some(exact);
    }

    let wanted = normalize(placeholder);
    columns.iter().find(|c| normalize(c) == wanted)
}

/// 自動映射：先精確匹配，再忽略大小寫與空白匹配，找不到則留空
pub fn resolve<'a, I>(placeholders: I, columns: &[String]) -> Mapping
where
    I: IntoIterator<Item = &'a String>,
{
    let mut mapping = Mapping::new();

    for placeholder in placeholders {
        let column = match_column(placeholder, columns).cloned();
        match &column {
            Some(col) if col != placeholder => {
                tracing::debug!("🔗 {} -> {} (normalized match)", placeholder, col)
            }
            Some(_) => tracing::debug!("🔗 {} -> {}", placeholder, placeholder),
            None => tracing::debug!("🔗 {} left unmapped", placeholder),
        }
        mapping.insert(placeholder.clone(), column);
    }

    mapping
}

impl Mapping {
    /// 手動修改單個變量的映射；空字串或 `None` 表示取消映射
    pub fn assign(&mut self, placeholder: &str, column: Option<&str>, available: &[String]) -> Result<()> {
        if !self.contains(placeholder) {
            return Err(MergeError::Mapping {
                message: format!("unknown placeholder '{}'", placeholder),
            });
        }

        let column = match column.map(str::trim) {
            None | Some("") => None,
            Some(name) => {
                if !available.iter().any(|c| c == name) {
                    return Err(MergeError::Mapping {
                        message: format!(
                            "column '{}' for placeholder '{}' is not in the data file (available: {})",
                            name,
                            placeholder,
                            available.join(", ")
                        ),
                    });
                }
                Some(name.to_string())
            }
        };

        self.insert(placeholder, column);
        Ok(())
    }
}
