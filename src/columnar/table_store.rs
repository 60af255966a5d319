//! Little-endian store of named, typed 2D tables.
//!
//! # Layout
//! ```text
//! magic        8 bytes   "NMCOLUMN"
//! major        u32
//! minor        u32
//! table count  u32
//! per table:
//!   name       u32 length + utf8 bytes
//!   dtype      u8        0 = f64, 1 = i32
//!   rows       u64
//!   columns    u32
//!   data       rows * columns values, row-major
//! ```

use crate::diagnostics::Location;
use crate::error::MorphError;
use crate::parser::ParsingError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

pub(crate) const MAGIC: &[u8; 8] = b"NMCOLUMN";

const DTYPE_F64: u8 = 0;
const DTYPE_I32: u8 = 1;

// =#========================================================================#=
// TABLE
// =#========================================================================#=
/// Values of a table, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    F64(Vec<f64>),
    I32(Vec<i32>),
}

impl TableData {
    fn len(&self) -> usize {
        match self {
            TableData::F64(values) => values.len(),
            TableData::I32(values) => values.len(),
        }
    }
}

/// A 2D table of a single value type.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: usize,
    data: TableData,
}

impl Table {
    /// Convenience constructor for an f64 table from its rows
    pub fn from_f64_rows<const N: usize>(rows: &[[f64; N]]) -> Self {
        Self { columns: N, data: TableData::F64(rows.iter().flatten().copied().collect()) }
    }

    /// Convenience constructor for an i32 table from its rows
    pub fn from_i32_rows<const N: usize>(rows: &[[i32; N]]) -> Self {
        Self { columns: N, data: TableData::I32(rows.iter().flatten().copied().collect()) }
    }

    /// Convenience constructor for a single f64 column
    pub fn f64_column(values: Vec<f64>) -> Self {
        Self { columns: 1, data: TableData::F64(values) }
    }

    /// Convenience constructor for a single i32 column
    pub fn i32_column(values: Vec<i32>) -> Self {
        Self { columns: 1, data: TableData::I32(values) }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        if self.columns == 0 { 0 } else { self.data.len() / self.columns }
    }

    pub fn data(&self) -> &TableData {
        &self.data
    }

    /// Values of an f64 table, `None` for another type.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            TableData::F64(values) => Some(values),
            TableData::I32(_) => None,
        }
    }

    /// Values of an i32 table, `None` for another type.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            TableData::I32(values) => Some(values),
            TableData::F64(_) => None,
        }
    }
}

// =#========================================================================#=
// TABLE STORE
// =#========================================================================#=
/// Named tables in insertion order, with the schema version of the file.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStore {
    version: (u32, u32),
    tables: Vec<(String, Table)>,
    index: HashMap<String, usize>,
    /// Byte offset of every table header, known once read or written
    offsets: HashMap<String, u64>,
}

impl TableStore {
    pub fn new(version: (u32, u32)) -> Self {
        Self { version, tables: Vec::new(), index: HashMap::new(), offsets: HashMap::new() }
    }

    pub fn version(&self) -> (u32, u32) {
        self.version
    }

    /// Adds a table, replacing any table of the same name.
    pub fn insert<S: Into<String>>(&mut self, name: S, table: Table) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.tables[i].1 = table,
            None => {
                self.index.insert(name.clone(), self.tables.len());
                self.tables.push((name, table));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.index.get(name).map(|&i| &self.tables[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Table names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Byte offset of the header of table `name` in the serialized store.
    pub fn offset(&self, name: &str) -> Option<u64> {
        self.offsets.get(name).copied()
    }

    // ============================================================================
    // Reading (pub)
    // ============================================================================
    /// Decodes a store, reporting errors against `uri`.
    ///
    /// # Errors
    /// [InvalidContainer](crate::parser::ParsingErrorType::InvalidContainer)
    /// for a wrong magic, a truncated input or an unknown value type.
    pub fn read_from(bytes: &[u8], uri: &str) -> Result<Self, MorphError> {
        let invalid = |msg: String| -> MorphError { ParsingError::invalid_container(Location::file(uri), msg).into() };
        let truncated = |_| invalid(format!("Truncated container: {uri}"));

        let mut cursor = Cursor::new(bytes);
        let mut magic = [0u8; 8];
        cursor.read_exact(&mut magic).map_err(truncated)?;
        if &magic != MAGIC {
            return Err(invalid(format!("Not a columnar morphology container: {uri}")));
        }
        let major = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
        let minor = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
        let count = cursor.read_u32::<LittleEndian>().map_err(truncated)?;

        let mut store = Self::new((major, minor));
        for _ in 0..count {
            let offset = cursor.position();
            let name_len = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            if name_len > bytes.len() - cursor.position() as usize {
                return Err(invalid(format!("Truncated container: {uri}")));
            }
            let mut name = vec![0u8; name_len];
            cursor.read_exact(&mut name).map_err(truncated)?;
            let name = String::from_utf8(name).map_err(|_| invalid(format!("Table name is not utf8 in: {uri}")))?;
            let dtype = cursor.read_u8().map_err(truncated)?;
            let rows = cursor.read_u64::<LittleEndian>().map_err(truncated)? as usize;
            let columns = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            let len = rows.checked_mul(columns).ok_or_else(|| invalid(format!("Table '{name}' is too large")))?;
            let remaining = bytes.len() - cursor.position() as usize;
            if len.saturating_mul(if dtype == DTYPE_F64 { 8 } else { 4 }) > remaining {
                return Err(invalid(format!("Truncated container: {uri}")));
            }
            let data = match dtype {
                DTYPE_F64 => {
                    let mut values = vec![0f64; len];
                    cursor.read_f64_into::<LittleEndian>(&mut values).map_err(truncated)?;
                    TableData::F64(values)
                }
                DTYPE_I32 => {
                    let mut values = vec![0i32; len];
                    cursor.read_i32_into::<LittleEndian>(&mut values).map_err(truncated)?;
                    TableData::I32(values)
                }
                other => return Err(invalid(format!("Unknown value type {other} of table '{name}'"))),
            };
            store.offsets.insert(name.clone(), offset);
            store.insert(name, Table { columns, data });
        }
        Ok(store)
    }

    // ============================================================================
    // Writing (pub)
    // ============================================================================
    /// Encodes the store into `writer`, recording the table offsets.
    pub fn write_to<W: Write>(&mut self, writer: &mut W) -> Result<(), MorphError> {
        let mut offset = MAGIC.len() as u64 + 12;
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version.0)?;
        writer.write_u32::<LittleEndian>(self.version.1)?;
        writer.write_u32::<LittleEndian>(self.tables.len() as u32)?;

        for (name, table) in &self.tables {
            self.offsets.insert(name.clone(), offset);
            writer.write_u32::<LittleEndian>(name.len() as u32)?;
            writer.write_all(name.as_bytes())?;
            writer.write_u8(match table.data {
                TableData::F64(_) => DTYPE_F64,
                TableData::I32(_) => DTYPE_I32,
            })?;
            writer.write_u64::<LittleEndian>(table.rows() as u64)?;
            writer.write_u32::<LittleEndian>(table.columns as u32)?;
            let data_len = match &table.data {
                TableData::F64(values) => {
                    for &v in values {
                        writer.write_f64::<LittleEndian>(v)?;
                    }
                    values.len() * 8
                }
                TableData::I32(values) => {
                    for &v in values {
                        writer.write_i32::<LittleEndian>(v)?;
                    }
                    values.len() * 4
                }
            };
            offset += 4 + name.len() as u64 + 1 + 8 + 4 + data_len as u64;
        }
        Ok(())
    }

    /// Encodes the store into a byte vector.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, MorphError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsingErrorType;

    #[test]
    fn test_tables_survive_encoding() {
        let mut store = TableStore::new((1, 3));
        store.insert("points", Table::from_f64_rows(&[[0., 1., 2., 3.], [4., 5., 6., 7.]]));
        store.insert("structure", Table::from_i32_rows(&[[0, 1, -1]]));
        let bytes = store.to_bytes().unwrap();

        let read = TableStore::read_from(&bytes, "cell.h5").unwrap();
        assert_eq!(read.version(), (1, 3));
        assert_eq!(read.names().collect::<Vec<_>>(), vec!["points", "structure"]);
        let points = read.get("points").unwrap();
        assert_eq!((points.rows(), points.columns()), (2, 4));
        assert_eq!(read.get("structure").unwrap().as_i32(), Some(&[0, 1, -1][..]));
        assert_eq!(read.offset("points"), Some(20));
        assert_eq!(read.offset("structure"), store.offset("structure"));
    }

    #[test]
    fn test_rejects_foreign_and_truncated_bytes() {
        let err = TableStore::read_from(b"PK\x03\x04 not a store", "x.h5").unwrap_err();
        assert!(err.to_string().contains("Not a columnar morphology container"));

        let mut store = TableStore::new((1, 3));
        store.insert("points", Table::f64_column(vec![1., 2., 3.]));
        let bytes = store.to_bytes().unwrap();
        let err = TableStore::read_from(&bytes[..bytes.len() - 4], "x.h5").unwrap_err();
        assert!(matches!(err.as_parsing().unwrap().kind(), ParsingErrorType::InvalidContainer(_)));
    }
}
