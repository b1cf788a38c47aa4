use crate::core::classfile::{
    internal_name, ByteWriter, CONSTANT_CLASS, CONSTANT_MODULE, CONSTANT_PACKAGE, CONSTANT_UTF8,
};
use crate::core::mutf8;
use crate::utils::error::{ModuleError, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Class(u16),
    Module(u16),
    Package(u16),
}

/// Insertion-ordered constant table. Equal constants always resolve to the
/// same index within one pool; index 0 is reserved by the format.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    index: HashMap<Constant, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, constant: Constant) -> Result<u16> {
        if let Some(&idx) = self.index.get(&constant) {
            return Ok(idx);
        }
        // count is written as entries + 1 and must fit in a u2
        if self.entries.len() + 1 >= u16::MAX as usize {
            return Err(ModuleError::DescriptorTooLarge {
                what: "constant pool exceeds 65534 entries".to_string(),
            });
        }
        let idx = (self.entries.len() + 1) as u16;
        self.entries.push(constant.clone());
        self.index.insert(constant, idx);
        Ok(idx)
    }

    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        self.intern(Constant::Utf8(value.to_string()))
    }

    /// Class constant for a dotted or internal class name.
    pub fn class(&mut self, name: &str) -> Result<u16> {
        let name_idx = self.utf8(&internal_name(name))?;
        self.intern(Constant::Class(name_idx))
    }

    pub fn module(&mut self, name: &str) -> Result<u16> {
        let name_idx = self.utf8(name)?;
        self.intern(Constant::Module(name_idx))
    }

    pub fn package(&mut self, name: &str) -> Result<u16> {
        let name_idx = self.utf8(&internal_name(name))?;
        self.intern(Constant::Package(name_idx))
    }

    /// Optional Utf8 reference; `None` is the null index 0.
    pub fn optional_utf8(&mut self, value: Option<&str>) -> Result<u16> {
        value.map_or(Ok(0), |v| self.utf8(v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: u16) -> Option<&Constant> {
        (idx as usize).checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn write_to(&self, out: &mut ByteWriter) -> Result<()> {
        out.write_count("constant pool entries", self.entries.len() + 1)?;
        for constant in &self.entries {
            match constant {
                Constant::Utf8(value) => {
                    let bytes = mutf8::encode(value);
                    out.write_u8(CONSTANT_UTF8);
                    out.write_count(&format!("bytes in string `{}`", value), bytes.len())?;
                    out.write_bytes(&bytes);
                }
                Constant::Class(idx) => {
                    out.write_u8(CONSTANT_CLASS);
                    out.write_u16_be(*idx);
                }
                Constant::Module(idx) => {
                    out.write_u8(CONSTANT_MODULE);
                    out.write_u16_be(*idx);
                }
                Constant::Package(idx) => {
                    out.write_u8(CONSTANT_PACKAGE);
                    out.write_u16_be(*idx);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_literal_same_index() {
        let mut pool = ConstantPool::new();
        let a = pool.module("java.base").unwrap();
        let b = pool.module("test.framework").unwrap();
        let c = pool.module("java.base").unwrap();
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_kinds_share_utf8_but_not_entry() {
        let mut pool = ConstantPool::new();
        // module `app` and package `app` share the name string only
        let module = pool.module("app").unwrap();
        let package = pool.package("app").unwrap();
        assert_ne!(module, package);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(1), Some(&Constant::Utf8("app".to_string())));
    }

    #[test]
    fn test_class_and_package_use_internal_form() {
        let mut pool = ConstantPool::new();
        let idx = pool.class("app.spi.Service").unwrap();
        assert_eq!(pool.get(idx), Some(&Constant::Class(1)));
        assert_eq!(pool.get(1), Some(&Constant::Utf8("app/spi/Service".to_string())));
        pool.package("app.spi").unwrap();
        assert_eq!(pool.get(3), Some(&Constant::Utf8("app/spi".to_string())));
    }

    #[test]
    fn test_null_and_out_of_range_lookups() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.optional_utf8(None).unwrap(), 0);
        assert_eq!(pool.optional_utf8(Some("1.0")).unwrap(), 1);
        assert_eq!(pool.get(0), None);
        assert_eq!(pool.get(2), None);
    }

    #[test]
    fn test_write_layout() {
        let mut pool = ConstantPool::new();
        pool.module("m").unwrap();
        let mut out = ByteWriter::new();
        pool.write_to(&mut out).unwrap();
        assert_eq!(
            out.into_bytes(),
            vec![0x00, 0x03, 0x01, 0x00, 0x01, b'm', 0x13, 0x00, 0x01]
        );
    }
}
