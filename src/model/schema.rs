//! 数据集列定义与行投影
//!
//! 宿主框架决定包含哪些列以及每列映射到哪个目标名称，
//! 扫描器只认识固定的几个语义列，其余列保持为空。

use crate::core::path;
use crate::error::{Result, SyncError};
use crate::model::NormalizedRow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 语义列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    FullFileName,
    Path,
    FileName,
    DateCreated,
    DateModified,
    Length,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::FullFileName,
        Column::Path,
        Column::FileName,
        Column::DateCreated,
        Column::DateModified,
        Column::Length,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::FullFileName => "FullFileName",
            Column::Path => "Path",
            Column::FileName => "FileName",
            Column::DateCreated => "DateCreated",
            Column::DateModified => "DateModified",
            Column::Length => "Length",
        }
    }

    /// 按名称解析，区分大小写
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// 列声明的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    DateTime,
    Int64,
}

/// 单元格取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    String(String),
    DateTime(DateTime<Utc>),
    Int64(i64),
}

impl CellValue {
    /// 转换为列声明的类型
    pub fn convert_to(self, data_type: DataType) -> Result<CellValue> {
        let converted = match (self, data_type) {
            (CellValue::Null, _) => Some(CellValue::Null),
            (v @ CellValue::String(_), DataType::String)
            | (v @ CellValue::DateTime(_), DataType::DateTime)
            | (v @ CellValue::Int64(_), DataType::Int64) => Some(v),
            (CellValue::String(s), DataType::DateTime) => parse_utc(&s).map(CellValue::DateTime),
            (CellValue::String(s), DataType::Int64) => s.trim().parse().ok().map(CellValue::Int64),
            (CellValue::DateTime(dt), DataType::String) => {
                Some(CellValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            }
            (CellValue::DateTime(dt), DataType::Int64) => Some(CellValue::Int64(dt.timestamp())),
            (CellValue::Int64(n), DataType::String) => Some(CellValue::String(n.to_string())),
            (CellValue::Int64(n), DataType::DateTime) => {
                Utc.timestamp_opt(n, 0).single().map(CellValue::DateTime)
            }
        };

        converted.ok_or_else(|| SyncError::Config(format!("无法转换为 {:?} 类型", data_type)))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// 解析 UTC 时间，没有时区的时间按 UTC 处理
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 一列的定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaColumn {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub allow_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// 映射到的目标列名，为空时使用自身名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default = "default_included")]
    pub included: bool,
}

fn default_included() -> bool {
    true
}

impl SchemaColumn {
    pub fn string(name: &str, max_length: usize, unique: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::String,
            unique,
            allow_null: false,
            max_length: Some(max_length),
            destination: None,
            included: true,
        }
    }

    pub fn typed(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            unique: false,
            allow_null: false,
            max_length: None,
            destination: None,
            included: true,
        }
    }

    /// 映射后的目标列名
    pub fn destination_name(&self) -> &str {
        self.destination.as_deref().unwrap_or(&self.name)
    }
}

/// 列映射
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMap {
    pub columns: Vec<SchemaColumn>,
}

impl SchemaMap {
    pub fn new(columns: Vec<SchemaColumn>) -> Self {
        Self { columns }
    }

    /// 默认列集合，`FullFileName` 为唯一键列
    pub fn default_schema() -> Self {
        Self::new(vec![
            SchemaColumn::string("FullFileName", 260, true),
            SchemaColumn::string("Path", 260, false),
            SchemaColumn::string("FileName", 260, false),
            SchemaColumn::typed("DateCreated", DataType::DateTime),
            SchemaColumn::typed("DateModified", DataType::DateTime),
            SchemaColumn::typed("Length", DataType::Int64),
        ])
    }

    pub fn included_columns(&self) -> impl Iterator<Item = &SchemaColumn> {
        self.columns.iter().filter(|c| c.included)
    }

    /// 把一行写入 sink，未知的目标列保持为空
    pub fn project(
        &self,
        row: &NormalizedRow,
        web_friendly: bool,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        for column in self.included_columns() {
            let Some(semantic) = Column::from_name(column.destination_name()) else {
                continue;
            };

            let value = match semantic {
                Column::FullFileName => {
                    path_cell(row.full_file_name(), web_friendly, column.data_type)?
                }
                Column::Path => path_cell(row.relative_path(), web_friendly, column.data_type)?,
                Column::FileName => {
                    CellValue::String(row.file_name().to_string()).convert_to(column.data_type)?
                }
                Column::DateCreated => {
                    CellValue::DateTime(row.date_created()).convert_to(column.data_type)?
                }
                Column::DateModified => {
                    CellValue::DateTime(row.date_modified()).convert_to(column.data_type)?
                }
                Column::Length => {
                    let length = i64::try_from(row.length).map_err(|_| SyncError::Oversize {
                        path: row.identifier.clone(),
                        size: row.length,
                        limit: i64::MAX as u64,
                    })?;
                    CellValue::Int64(length).convert_to(column.data_type)?
                }
            };

            sink.set_column(semantic, &column.name, value);
        }
        Ok(())
    }
}

/// web-friendly 模式下路径总是字符串
fn path_cell(value: String, web_friendly: bool, data_type: DataType) -> Result<CellValue> {
    if web_friendly {
        Ok(CellValue::String(path::to_display_path(&value, true)))
    } else {
        CellValue::String(value).convert_to(data_type)
    }
}

/// 接收一行单元格的目标
///
/// 每个语义列有单独的入口，默认都按列名写入 `set_cell`。
/// `column` 是宿主声明的列名，可能与语义列名不同。
pub trait RowSink {
    fn set_cell(&mut self, column: &str, value: CellValue);

    fn set_full_file_name(&mut self, column: &str, value: CellValue) {
        self.set_cell(column, value);
    }

    fn set_path(&mut self, column: &str, value: CellValue) {
        self.set_cell(column, value);
    }

    fn set_file_name(&mut self, column: &str, value: CellValue) {
        self.set_cell(column, value);
    }

    fn set_date_created(&mut self, column: &str, value: CellValue) {
        self.set_cell(column, value);
    }

    fn set_date_modified(&mut self, column: &str, value: CellValue) {
        self.set_cell(column, value);
    }

    fn set_length(&mut self, column: &str, value: CellValue) {
        self.set_cell(column, value);
    }

    /// 按语义列分发
    fn set_column(&mut self, semantic: Column, column: &str, value: CellValue) {
        match semantic {
            Column::FullFileName => self.set_full_file_name(column, value),
            Column::Path => self.set_path(column, value),
            Column::FileName => self.set_file_name(column, value),
            Column::DateCreated => self.set_date_created(column, value),
            Column::DateModified => self.set_date_modified(column, value),
            Column::Length => self.set_length(column, value),
        }
    }
}

/// 数据集中的一行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataRow {
    pub identifier: String,
    pub cells: BTreeMap<String, CellValue>,
}

impl DataRow {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

impl RowSink for DataRow {
    fn set_cell(&mut self, column: &str, value: CellValue) {
        self.cells.insert(column.to_string(), value);
    }
}

/// 以 identifier 为主键的数据集
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    rows: Vec<DataRow>,
    index: HashMap<String, usize>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一行，identifier 重复时返回 false
    pub fn add_with_identifier(&mut self, row: DataRow) -> bool {
        if self.index.contains_key(&row.identifier) {
            return false;
        }
        self.index.insert(row.identifier.clone(), self.rows.len());
        self.rows.push(row);
        true
    }

    pub fn get(&self, identifier: &str) -> Option<&DataRow> {
        self.index.get(identifier).map(|&i| &self.rows[i])
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
