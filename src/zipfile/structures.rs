use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Datelike, Timelike, Utc};

use anyhow::{Result, bail};

/// STORED: entries are copied as-is, never recompressed
pub const METHOD_STORED: u16 = 0;

/// General purpose flag bit 11: file name is UTF-8
pub const FLAG_UTF8: u16 = 0x0800;

/// Version needed to extract a plain entry (2.0)
pub const VERSION_DEFAULT: u16 = 20;

/// Version needed to extract an entry using ZIP64 fields (4.5)
pub const VERSION_ZIP64: u16 = 45;

/// Extra field header ID for ZIP64 extended information
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Value stored in 32-bit fields that overflow into the ZIP64 extra field
pub const ZIP64_MARKER_32: u32 = 0xFFFFFFFF;

/// Value stored in 16-bit fields that overflow into the ZIP64 end record
pub const ZIP64_MARKER_16: u16 = 0xFFFF;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Offset of the CRC-32 field inside a Local File Header
pub const LFH_CRC_OFFSET: u64 = 14;

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// MS-DOS date and time, as stored in ZIP headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Convert a timestamp, clamping anything before 1980 to the DOS epoch
    pub fn from_utc(at: DateTime<Utc>) -> Self {
        if at.year() < 1980 {
            return Self {
                time: 0,
                date: (1 << 5) | 1,
            };
        }

        let date = (((at.year() - 1980) as u16) << 9) | ((at.month() as u16) << 5) | at.day() as u16;
        let time =
            ((at.hour() as u16) << 11) | ((at.minute() as u16) << 5) | (at.second() as u16 / 2);

        Self { time, date }
    }
}

/// Local File Header written in front of each entry's data
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub file_name: String,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub size: u64,
}

impl LocalFileHeader {
    /// Entries this large need ZIP64 sizes
    pub fn needs_zip64(&self) -> bool {
        self.size >= ZIP64_MARKER_32 as u64
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = self.file_name.as_bytes();
        if name.len() > u16::MAX as usize {
            bail!("File name too long: {}", self.file_name);
        }

        let zip64 = self.needs_zip64();
        let extra_len: u16 = if zip64 { 4 + 16 } else { 0 };
        let mut buf = Vec::with_capacity(LFH_SIZE + name.len() + extra_len as usize);

        buf.extend_from_slice(LFH_SIGNATURE);
        buf.write_u16::<LittleEndian>(if zip64 { VERSION_ZIP64 } else { VERSION_DEFAULT })?;
        buf.write_u16::<LittleEndian>(FLAG_UTF8)?;
        buf.write_u16::<LittleEndian>(METHOD_STORED)?;
        buf.write_u16::<LittleEndian>(self.modified.time)?;
        buf.write_u16::<LittleEndian>(self.modified.date)?;
        buf.write_u32::<LittleEndian>(self.crc32)?;

        if zip64 {
            buf.write_u32::<LittleEndian>(ZIP64_MARKER_32)?;
            buf.write_u32::<LittleEndian>(ZIP64_MARKER_32)?;
        } else {
            // Stored: compressed size == uncompressed size
            buf.write_u32::<LittleEndian>(self.size as u32)?;
            buf.write_u32::<LittleEndian>(self.size as u32)?;
        }

        buf.write_u16::<LittleEndian>(name.len() as u16)?;
        buf.write_u16::<LittleEndian>(extra_len)?;
        buf.extend_from_slice(name);

        if zip64 {
            buf.write_u16::<LittleEndian>(ZIP64_EXTRA_ID)?;
            buf.write_u16::<LittleEndian>(16)?;
            buf.write_u64::<LittleEndian>(self.size)?;
            buf.write_u64::<LittleEndian>(self.size)?;
        }

        Ok(buf)
    }
}

/// Central Directory File Header, one per entry, written at the end of the archive
#[derive(Debug, Clone)]
pub struct CentralDirectoryHeader {
    pub file_name: String,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub size: u64,
    pub lfh_offset: u64,
}

impl CentralDirectoryHeader {
    pub fn needs_zip64(&self) -> bool {
        self.size >= ZIP64_MARKER_32 as u64 || self.lfh_offset >= ZIP64_MARKER_32 as u64
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = self.file_name.as_bytes();
        if name.len() > u16::MAX as usize {
            bail!("File name too long: {}", self.file_name);
        }

        // ZIP64 extra carries only the fields whose 32-bit slot overflowed,
        // in the fixed order: uncompressed, compressed, local header offset
        let size_overflow = self.size >= ZIP64_MARKER_32 as u64;
        let offset_overflow = self.lfh_offset >= ZIP64_MARKER_32 as u64;

        let mut extra = Vec::new();
        if size_overflow || offset_overflow {
            let mut fields = Vec::new();
            if size_overflow {
                fields.write_u64::<LittleEndian>(self.size)?;
                fields.write_u64::<LittleEndian>(self.size)?;
            }
            if offset_overflow {
                fields.write_u64::<LittleEndian>(self.lfh_offset)?;
            }
            extra.write_u16::<LittleEndian>(ZIP64_EXTRA_ID)?;
            extra.write_u16::<LittleEndian>(fields.len() as u16)?;
            extra.extend_from_slice(&fields);
        }

        let version = if self.needs_zip64() {
            VERSION_ZIP64
        } else {
            VERSION_DEFAULT
        };
        let size_field = if size_overflow {
            ZIP64_MARKER_32
        } else {
            self.size as u32
        };

        let mut buf = Vec::with_capacity(CDFH_MIN_SIZE + name.len() + extra.len());
        buf.extend_from_slice(CDFH_SIGNATURE);
        buf.write_u16::<LittleEndian>(version)?; // version made by
        buf.write_u16::<LittleEndian>(version)?; // version needed
        buf.write_u16::<LittleEndian>(FLAG_UTF8)?;
        buf.write_u16::<LittleEndian>(METHOD_STORED)?;
        buf.write_u16::<LittleEndian>(self.modified.time)?;
        buf.write_u16::<LittleEndian>(self.modified.date)?;
        buf.write_u32::<LittleEndian>(self.crc32)?;
        buf.write_u32::<LittleEndian>(size_field)?;
        buf.write_u32::<LittleEndian>(size_field)?;
        buf.write_u16::<LittleEndian>(name.len() as u16)?;
        buf.write_u16::<LittleEndian>(extra.len() as u16)?;
        buf.write_u16::<LittleEndian>(0)?; // comment length
        buf.write_u16::<LittleEndian>(0)?; // disk number start
        buf.write_u16::<LittleEndian>(0)?; // internal attributes
        buf.write_u32::<LittleEndian>(0)?; // external attributes
        buf.write_u32::<LittleEndian>(if offset_overflow {
            ZIP64_MARKER_32
        } else {
            self.lfh_offset as u32
        })?;
        buf.extend_from_slice(name);
        buf.extend_from_slice(&extra);

        Ok(buf)
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn is_zip64(&self) -> bool {
        self.total_entries >= ZIP64_MARKER_16 as u64
            || self.cd_size >= ZIP64_MARKER_32 as u64
            || self.cd_offset >= ZIP64_MARKER_32 as u64
    }

    /// Classic record; overflowing fields hold their marker value
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let entries = self.total_entries.min(ZIP64_MARKER_16 as u64) as u16;
        let cd_size = self.cd_size.min(ZIP64_MARKER_32 as u64) as u32;
        let cd_offset = self.cd_offset.min(ZIP64_MARKER_32 as u64) as u32;

        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(Self::SIGNATURE);
        buf.write_u16::<LittleEndian>(0)?; // disk number
        buf.write_u16::<LittleEndian>(0)?; // disk with central directory
        buf.write_u16::<LittleEndian>(entries)?;
        buf.write_u16::<LittleEndian>(entries)?;
        buf.write_u32::<LittleEndian>(cd_size)?;
        buf.write_u32::<LittleEndian>(cd_offset)?;
        buf.write_u16::<LittleEndian>(0)?; // comment length

        Ok(buf)
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(Self::SIGNATURE);
        buf.write_u32::<LittleEndian>(0)?; // disk with ZIP64 EOCD
        buf.write_u64::<LittleEndian>(self.eocd64_offset)?;
        buf.write_u32::<LittleEndian>(1)?; // total disks
        Ok(buf)
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::MIN_SIZE);
        buf.extend_from_slice(Self::SIGNATURE);
        // Size of the remaining record, excluding signature and this field
        buf.write_u64::<LittleEndian>((Self::MIN_SIZE - 12) as u64)?;
        buf.write_u16::<LittleEndian>(VERSION_ZIP64)?;
        buf.write_u16::<LittleEndian>(VERSION_ZIP64)?;
        buf.write_u32::<LittleEndian>(0)?; // disk number
        buf.write_u32::<LittleEndian>(0)?; // disk with central directory
        buf.write_u64::<LittleEndian>(self.total_entries)?;
        buf.write_u64::<LittleEndian>(self.total_entries)?;
        buf.write_u64::<LittleEndian>(self.cd_size)?;
        buf.write_u64::<LittleEndian>(self.cd_offset)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn read_u16(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn read_u32(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn dos_date_time_packs_fields() {
        let at = Utc.with_ymd_and_hms(2023, 2, 22, 16, 19, 54).unwrap();
        let dos = DosDateTime::from_utc(at);
        assert_eq!(dos.date >> 9, 43);
        assert_eq!((dos.date >> 5) & 0x0F, 2);
        assert_eq!(dos.date & 0x1F, 22);
        assert_eq!(dos.time >> 11, 16);
        assert_eq!((dos.time >> 5) & 0x3F, 19);
        assert_eq!((dos.time & 0x1F) * 2, 54);
    }

    #[test]
    fn local_header_layout() {
        let header = LocalFileHeader {
            file_name: "datapackage.json".to_string(),
            modified: DosDateTime { time: 1, date: 2 },
            crc32: 0xDEADBEEF,
            size: 1234,
        };
        let bytes = header.to_bytes().unwrap();

        assert_eq!(bytes.len(), LFH_SIZE + "datapackage.json".len());
        assert_eq!(&bytes[0..4], LFH_SIGNATURE);
        assert_eq!(read_u16(&bytes, 8), METHOD_STORED);
        assert_eq!(read_u32(&bytes, LFH_CRC_OFFSET as usize), 0xDEADBEEF);
        assert_eq!(read_u32(&bytes, 18), 1234);
        assert_eq!(read_u32(&bytes, 22), 1234);
        assert_eq!(read_u16(&bytes, 28), 0);
    }

    #[test]
    fn large_local_header_uses_zip64_extra() {
        let header = LocalFileHeader {
            file_name: "archive/big.warc.gz".to_string(),
            modified: DosDateTime::now(),
            crc32: 0,
            size: 5 * 1024 * 1024 * 1024,
        };
        let bytes = header.to_bytes().unwrap();

        assert_eq!(read_u16(&bytes, 4), VERSION_ZIP64);
        assert_eq!(read_u32(&bytes, 18), ZIP64_MARKER_32);
        assert_eq!(read_u16(&bytes, 28), 20);
        let extra = LFH_SIZE + "archive/big.warc.gz".len();
        assert_eq!(read_u16(&bytes, extra), ZIP64_EXTRA_ID);
    }

    #[test]
    fn central_header_only_spills_overflowing_fields() {
        let header = CentralDirectoryHeader {
            file_name: "a".to_string(),
            modified: DosDateTime::now(),
            crc32: 7,
            size: 10,
            lfh_offset: 6 * 1024 * 1024 * 1024,
        };
        let bytes = header.to_bytes().unwrap();

        assert_eq!(read_u32(&bytes, 20), 10);
        assert_eq!(read_u32(&bytes, 42), ZIP64_MARKER_32);
        // header id + size + one u64
        assert_eq!(read_u16(&bytes, 30), 12);
        assert_eq!(read_u16(&bytes, CDFH_MIN_SIZE + 1 + 2), 8);
    }

    #[test]
    fn eocd_switches_to_zip64_on_entry_count() {
        let eocd = EndOfCentralDirectory {
            total_entries: 70_000,
            cd_size: 100,
            cd_offset: 100,
        };
        assert!(eocd.is_zip64());
        let bytes = eocd.to_bytes().unwrap();
        assert_eq!(bytes.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(read_u16(&bytes, 10), ZIP64_MARKER_16);
    }
}
