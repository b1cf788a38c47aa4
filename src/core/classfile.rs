//! Layout constants of the module-info binary container and the byte-level
//! reader/writer shared by the encoder and decoder.
//!
//! ```text
//! magic u4 | minor u2 | major u2
//! constant_pool_count u2 | cp_info[count - 1]
//! access_flags u2 (ACC_MODULE) | this_class u2 | super_class u2 (0)
//! interfaces_count u2 (0) | fields_count u2 (0) | methods_count u2 (0)
//! attributes_count u2 | Module, [ModulePackages], [ModuleMainClass]
//! ```

use crate::utils::error::{ModuleError, Result};

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const MINOR_VERSION: u16 = 0;
/// First format version that knows the `Module` attribute.
pub const MAJOR_VERSION: u16 = 53;

pub const THIS_CLASS: &str = "module-info";

pub const ATTR_MODULE: &str = "Module";
pub const ATTR_MODULE_PACKAGES: &str = "ModulePackages";
pub const ATTR_MODULE_MAIN_CLASS: &str = "ModuleMainClass";

pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELDREF: u8 = 9;
pub const CONSTANT_METHODREF: u8 = 10;
pub const CONSTANT_INTERFACE_METHODREF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
pub const CONSTANT_MODULE: u8 = 19;
pub const CONSTANT_PACKAGE: u8 = 20;

pub const ACC_MODULE: u16 = 0x8000;

pub const ACC_OPEN: u16 = 0x0020;
pub const ACC_TRANSITIVE: u16 = 0x0020;
pub const ACC_STATIC_PHASE: u16 = 0x0040;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_MANDATED: u16 = 0x8000;

pub const MODULE_FLAGS_MASK: u16 = ACC_OPEN | ACC_SYNTHETIC | ACC_MANDATED;
pub const REQUIRES_FLAGS_MASK: u16 =
    ACC_TRANSITIVE | ACC_STATIC_PHASE | ACC_SYNTHETIC | ACC_MANDATED;
pub const PACKAGE_FLAGS_MASK: u16 = ACC_SYNTHETIC | ACC_MANDATED;

/// `app.api` -> `app/api`
pub fn internal_name(name: &str) -> String {
    name.replace('.', "/")
}

/// `app/api` -> `app.api`
pub fn binary_name(name: &str) -> String {
    name.replace('/', ".")
}

#[derive(Debug, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    #[inline]
    pub fn write_u8(&mut self, b: u8) {
        self.buffer.push(b);
    }

    #[inline]
    pub fn write_u16_be(&mut self, n: u16) {
        self.buffer.extend_from_slice(&n.to_be_bytes());
    }

    #[inline]
    pub fn write_u32_be(&mut self, n: u32) {
        self.buffer.extend_from_slice(&n.to_be_bytes());
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a `u2` count, failing when `len` does not fit.
    pub fn write_count(&mut self, what: &str, len: usize) -> Result<()> {
        let n = u16::try_from(len).map_err(|_| ModuleError::DescriptorTooLarge {
            what: format!("{} {} exceeds {}", len, what, u16::MAX),
        })?;
        self.write_u16_be(n);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor over a byte slice; every read reports truncation as a malformed
/// binary.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ModuleError::malformed_binary(format!(
                "truncated input: needed {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }
}
