//! TOC record framing: `magic:u16, version:u8, kind:u8, length:u32` followed
//! by `length` bytes of bincode-encoded payload. The TOC is an append-only
//! sequence of these records; replaying it from the start reconstructs the
//! database's current set of live indexes.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use fdb_core::Key;

use crate::error::CatalogueError;

pub const MAGIC: u16 = 0xFDB5;
pub const VERSION: u8 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Init = 0,
    Index = 1,
    Clear = 2,
    SubToc = 3,
    Wipe = 4,
}

impl RecordKind {
    fn from_u8(v: u8) -> Result<Self, CatalogueError> {
        match v {
            0 => Ok(RecordKind::Init),
            1 => Ok(RecordKind::Index),
            2 => Ok(RecordKind::Clear),
            3 => Ok(RecordKind::SubToc),
            4 => Ok(RecordKind::Wipe),
            other => Err(CatalogueError::Corrupt(format!("unknown record kind {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitPayload {
    pub db_key: Key,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPayload {
    pub index_key: Key,
    pub index_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearPayload {
    pub index_key: Key,
    /// Name of the specific index-file generation being retired. Needed
    /// because more than one generation of the same `index_key` can be
    /// live at once (successive flushes never auto-clear); only `purge`
    /// emits `Clear`, and it always names the exact file it is retiring.
    pub index_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTocPayload {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WipePayload {
    pub wiped_at: i64,
}

#[derive(Debug, Clone)]
pub enum Record {
    Init(InitPayload),
    Index(IndexPayload),
    Clear(ClearPayload),
    SubToc(SubTocPayload),
    Wipe(WipePayload),
}

impl Record {
    fn kind(&self) -> RecordKind {
        match self {
            Record::Init(_) => RecordKind::Init,
            Record::Index(_) => RecordKind::Index,
            Record::Clear(_) => RecordKind::Clear,
            Record::SubToc(_) => RecordKind::SubToc,
            Record::Wipe(_) => RecordKind::Wipe,
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>, CatalogueError> {
        Ok(match self {
            Record::Init(p) => bincode::serialize(p)?,
            Record::Index(p) => bincode::serialize(p)?,
            Record::Clear(p) => bincode::serialize(p)?,
            Record::SubToc(p) => bincode::serialize(p)?,
            Record::Wipe(p) => bincode::serialize(p)?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CatalogueError> {
        let payload = self.encode_payload()?;
        let mut header = [0u8; HEADER_LEN];
        header[0..2].copy_from_slice(&MAGIC.to_le_bytes());
        header[2] = VERSION;
        header[3] = self.kind() as u8;
        header[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
        writer.write_all(&header)?;
        writer.write_all(&payload)?;
        Ok(())
    }

    fn decode_payload(kind: RecordKind, bytes: &[u8]) -> Result<Record, CatalogueError> {
        Ok(match kind {
            RecordKind::Init => Record::Init(bincode::deserialize(bytes)?),
            RecordKind::Index => Record::Index(bincode::deserialize(bytes)?),
            RecordKind::Clear => Record::Clear(bincode::deserialize(bytes)?),
            RecordKind::SubToc => Record::SubToc(bincode::deserialize(bytes)?),
            RecordKind::Wipe => Record::Wipe(bincode::deserialize(bytes)?),
        })
    }
}

/// Reads every well-formed record from `reader` in order. Stops cleanly at
/// end of file; a header or payload that is present but truncated is an
/// error, since that means a writer died mid-append.
pub fn read_all<R: Read>(reader: &mut R) -> Result<Vec<Record>, CatalogueError> {
    let mut out = Vec::new();
    let mut offset: u64 = 0;
    loop {
        let mut header = [0u8; HEADER_LEN];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let magic = u16::from_le_bytes([header[0], header[1]]);
        if magic != MAGIC {
            return Err(CatalogueError::BadMagic { offset, magic });
        }
        let version = header[2];
        if version != VERSION {
            return Err(CatalogueError::UnsupportedVersion(offset, version));
        }
        let kind = RecordKind::from_u8(header[3])?;
        let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let mut payload = vec![0u8; length];
        reader.read_exact(&mut payload)?;

        out.push(Record::decode_payload(kind, &payload)?);
        offset += HEADER_LEN as u64 + length as u64;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_sequence_of_records() {
        let mut db_key = Key::new();
        db_key.set_raw("class", "od");

        let records = vec![
            Record::Init(InitPayload { db_key: db_key.clone(), created_at: 1000 }),
            Record::Index(IndexPayload { index_key: Key::new(), index_file: "0000.index".into() }),
            Record::Clear(ClearPayload { index_key: Key::new(), index_file: "index.0.data".into() }),
        ];

        let mut buf = Vec::new();
        for r in &records {
            r.write_to(&mut buf).unwrap();
        }

        let decoded = read_all(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(matches!(decoded[0], Record::Init(_)));
        assert!(matches!(decoded[1], Record::Index(_)));
        assert!(matches!(decoded[2], Record::Clear(_)));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&0x1234u16.to_be_bytes());
        let err = read_all(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CatalogueError::BadMagic { .. }));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let record = Record::Wipe(WipePayload { wiped_at: 1 });
        let mut buf = Vec::new();
        record.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        assert!(read_all(&mut Cursor::new(buf)).is_err());
    }
}
